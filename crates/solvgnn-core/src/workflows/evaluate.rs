use crate::core::models::lambda::{self, LambdaFactors};
use crate::core::models::system::AtomSet;
use crate::engine::error::ModelError;
use crate::engine::model::{BornRadii, EnergyModel, ForwardInputs};
use candle_core::backprop::GradStore;
use candle_core::{Tensor, Var};
use nalgebra::Vector3;
use tracing::{debug, instrument};

/// Which derivatives [`evaluate`] returns. Energies are always returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationOptions {
    pub forces: bool,
    pub lambda_gradients: bool,
}

impl EvaluationOptions {
    pub fn energies_only() -> Self {
        Self {
            forces: false,
            lambda_gradients: false,
        }
    }

    pub fn all() -> Self {
        Self {
            forces: true,
            lambda_gradients: true,
        }
    }

    fn needs_backward(&self) -> bool {
        self.forces || self.lambda_gradients
    }
}

impl Default for EvaluationOptions {
    fn default() -> Self {
        Self {
            forces: true,
            lambda_gradients: false,
        }
    }
}

/// Derivatives of the total energy with respect to each molecule's lambdas, in kJ/mol.
#[derive(Debug, Clone, PartialEq)]
pub struct LambdaGradients {
    pub sterics: Vec<f64>,
    pub electrostatics: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnergyResult {
    /// Energy of each molecule in kJ/mol, indexed by batch id.
    pub energies: Vec<f64>,
    /// Energy contribution of each atom in kJ/mol.
    pub atom_energies: Vec<f64>,
    /// Force on each atom in kJ/(mol·nm).
    pub forces: Option<Vec<Vector3<f64>>>,
    pub lambda_gradients: Option<LambdaGradients>,
}

struct Variables {
    positions: Var,
    sterics: Var,
    electrostatics: Var,
}

impl Variables {
    fn new<M: EnergyModel + ?Sized>(
        model: &M,
        atoms: &AtomSet,
        lambdas: &[LambdaFactors],
    ) -> Result<Self, ModelError> {
        lambda::validate(lambdas, atoms.molecule_count())?;
        let device = model.device();
        let flat: Vec<f64> = atoms
            .atoms()
            .iter()
            .flat_map(|a| [a.position.x, a.position.y, a.position.z])
            .collect();
        let sterics: Vec<f64> = lambdas.iter().map(|l| l.sterics).collect();
        let electrostatics: Vec<f64> = lambdas.iter().map(|l| l.electrostatics).collect();

        Ok(Self {
            positions: Var::from_tensor(&Tensor::from_vec(flat, (atoms.len(), 3), device)?)?,
            sterics: Var::from_tensor(&Tensor::from_vec(sterics, lambdas.len(), device)?)?,
            electrostatics: Var::from_tensor(&Tensor::from_vec(
                electrostatics,
                lambdas.len(),
                device,
            )?)?,
        })
    }

    fn inputs<'a, M: EnergyModel + ?Sized>(
        &'a self,
        model: &M,
        atoms: &AtomSet,
    ) -> Result<ForwardInputs<'a>, ModelError> {
        ForwardInputs::new(
            atoms,
            model.config().feature_selector,
            self.positions.as_tensor(),
            self.sterics.as_tensor(),
            self.electrostatics.as_tensor(),
        )
    }
}

/// Gradient of `var`, or zeros when the energy does not depend on it (for example the
/// positions of a batch of isolated atoms, or the lambdas of a physics-only model).
fn gradient(grads: &GradStore, var: &Var) -> Result<Tensor, ModelError> {
    match grads.get(var.as_tensor()) {
        Some(grad) => Ok(grad.clone()),
        None => Ok(var.as_tensor().zeros_like()?),
    }
}

/// Evaluates solvation energies of a batch and, optionally, their derivatives.
///
/// # Arguments
///
/// * `model` - The energy model.
/// * `atoms` - The batch of molecules.
/// * `lambdas` - One lambda pair per molecule, in batch id order.
/// * `options` - Which derivatives to compute.
///
/// # Errors
///
/// Returns [`ModelError::Input`] for lambdas that do not match the batch or lie outside
/// `[0, 1]` and for atoms whose parameter rows cannot be resolved.
#[instrument(skip_all, name = "evaluate_workflow")]
pub fn evaluate<M: EnergyModel + ?Sized>(
    model: &M,
    atoms: &AtomSet,
    lambdas: &[LambdaFactors],
    options: &EvaluationOptions,
) -> Result<EnergyResult, ModelError> {
    let variables = Variables::new(model, atoms, lambdas)?;
    let inputs = variables.inputs(model, atoms)?;

    let atom_energies = model.atom_energies(&inputs)?;
    let molecule_energies = inputs.per_molecule(&atom_energies)?;
    let energies = molecule_energies.to_vec1::<f64>()?;
    debug!(
        atoms = atoms.len(),
        molecules = atoms.molecule_count(),
        "Evaluated solvation energies."
    );

    let mut result = EnergyResult {
        energies,
        atom_energies: atom_energies.to_vec1::<f64>()?,
        forces: None,
        lambda_gradients: None,
    };
    if !options.needs_backward() {
        return Ok(result);
    }

    let grads = molecule_energies.sum_all()?.backward()?;
    if options.forces {
        let grad = gradient(&grads, &variables.positions)?.to_vec2::<f64>()?;
        result.forces = Some(
            grad.iter()
                .map(|g| Vector3::new(-g[0], -g[1], -g[2]))
                .collect(),
        );
    }
    if options.lambda_gradients {
        result.lambda_gradients = Some(LambdaGradients {
            sterics: gradient(&grads, &variables.sterics)?.to_vec1::<f64>()?,
            electrostatics: gradient(&grads, &variables.electrostatics)?.to_vec1::<f64>()?,
        });
    }
    Ok(result)
}

/// Born radii of every atom before and after the model's correction.
#[instrument(skip_all, name = "born_radii_workflow")]
pub fn born_radii<M: EnergyModel + ?Sized>(
    model: &M,
    atoms: &AtomSet,
    lambdas: &[LambdaFactors],
) -> Result<BornRadii, ModelError> {
    let variables = Variables::new(model, atoms, lambdas)?;
    let inputs = variables.inputs(model, atoms)?;
    model.born_radii(&inputs)
}
