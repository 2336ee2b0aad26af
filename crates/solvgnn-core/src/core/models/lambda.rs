use super::system::InputError;

/// Alchemical interpolation weights of one molecule.
///
/// `sterics` scales the nonpolar (surface-area) term and `electrostatics` the GB
/// polarization term. Both lie in `[0, 1]`; `1` is the fully interacting end state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LambdaFactors {
    pub sterics: f64,
    pub electrostatics: f64,
}

impl LambdaFactors {
    pub fn new(sterics: f64, electrostatics: f64) -> Self {
        Self {
            sterics,
            electrostatics,
        }
    }

    pub fn fully_interacting() -> Self {
        Self::new(1.0, 1.0)
    }

    pub fn decoupled() -> Self {
        Self::new(0.0, 0.0)
    }
}

impl Default for LambdaFactors {
    fn default() -> Self {
        Self::fully_interacting()
    }
}

/// Checks that there is exactly one lambda pair per molecule and that every value is a
/// finite number in `[0, 1]`.
pub fn validate(lambdas: &[LambdaFactors], molecule_count: usize) -> Result<(), InputError> {
    if lambdas.len() != molecule_count {
        return Err(InputError::LambdaCountMismatch {
            expected: molecule_count,
            found: lambdas.len(),
        });
    }

    for (molecule, factors) in lambdas.iter().enumerate() {
        for (kind, value) in [
            ("sterics", factors.sterics),
            ("electrostatics", factors.electrostatics),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(InputError::LambdaOutOfRange {
                    molecule,
                    kind,
                    value,
                });
            }
        }
    }
    Ok(())
}
