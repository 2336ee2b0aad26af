use crate::core::forcefield::potentials::DIELECTRIC_OFFSET;
use nalgebra::Point3;

/// Number of columns in a GBn2 parameter row.
pub const GB_PARAMETER_WIDTH: usize = 7;

/// Per-atom parameters of the GBn2 generalized-Born model.
///
/// The column layout matches the particle parameters of the GBn2 force:
/// `[charge, offset_radius, scaled_radius, alpha, beta, gamma, radius_index]`.
/// All lengths are in nanometers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GbParameters {
    /// Partial charge in elementary charge units.
    pub charge: f64,
    /// Intrinsic radius minus the dielectric offset (`or`).
    pub offset_radius: f64,
    /// Screening scale multiplied by the offset radius (`sr`).
    pub scaled_radius: f64,
    /// Linear coefficient of the Born radius rescaling.
    pub alpha: f64,
    /// Quadratic coefficient of the Born radius rescaling.
    pub beta: f64,
    /// Cubic coefficient of the Born radius rescaling.
    pub gamma: f64,
    /// Row/column of this atom's radius in the neck integral tables.
    pub radius_index: usize,
}

impl GbParameters {
    /// The unshifted intrinsic radius, `offset_radius + DIELECTRIC_OFFSET`.
    #[inline]
    pub fn intrinsic_radius(&self) -> f64 {
        self.offset_radius + DIELECTRIC_OFFSET
    }

    pub fn to_row(&self) -> [f64; GB_PARAMETER_WIDTH] {
        [
            self.charge,
            self.offset_radius,
            self.scaled_radius,
            self.alpha,
            self.beta,
            self.gamma,
            self.radius_index as f64,
        ]
    }

    /// Reads the first [`GB_PARAMETER_WIDTH`] columns of a feature row.
    ///
    /// Trailing columns are ignored so that rows carrying extra per-frame data (for example
    /// the lambda values appended by some data pipelines) can be used directly.
    ///
    /// # Return
    ///
    /// Returns `None` if the row is shorter than [`GB_PARAMETER_WIDTH`].
    pub fn from_row(row: &[f64]) -> Option<Self> {
        if row.len() < GB_PARAMETER_WIDTH {
            return None;
        }
        Some(Self {
            charge: row[0],
            offset_radius: row[1],
            scaled_radius: row[2],
            alpha: row[3],
            beta: row[4],
            gamma: row[5],
            radius_index: row[6].round().max(0.0) as usize,
        })
    }
}

/// A single atom as supplied by a data pipeline.
///
/// At least one of `gb_parameters` or `raw_features` must be present for the atom to be
/// evaluated. The model reads the charge from the selected parameter row; `charge` here is
/// the source value used when deriving parameters with
/// [`gbn2_parameters`](crate::core::forcefield::parameterization::gbn2_parameters).
#[derive(Debug, Clone, PartialEq)]
pub struct AtomRecord {
    /// Position in nanometers.
    pub position: Point3<f64>,
    pub atomic_number: u8,
    /// Partial charge in elementary charge units.
    pub charge: f64,
    pub gb_parameters: Option<GbParameters>,
    /// Raw per-atom feature row; its first seven columns follow the [`GbParameters`] layout.
    pub raw_features: Option<Vec<f64>>,
    /// Index of the molecule this atom belongs to within a batch.
    pub batch_id: usize,
}

impl AtomRecord {
    /// Creates an atom in molecule 0 with no parameters attached.
    pub fn new(position: Point3<f64>, atomic_number: u8, charge: f64) -> Self {
        Self {
            position,
            atomic_number,
            charge,
            gb_parameters: None,
            raw_features: None,
            batch_id: 0,
        }
    }

    pub fn with_gb_parameters(mut self, parameters: GbParameters) -> Self {
        self.gb_parameters = Some(parameters);
        self
    }

    pub fn with_raw_features(mut self, features: Vec<f64>) -> Self {
        self.raw_features = Some(features);
        self
    }

    pub fn with_batch_id(mut self, batch_id: usize) -> Self {
        self.batch_id = batch_id;
        self
    }
}
