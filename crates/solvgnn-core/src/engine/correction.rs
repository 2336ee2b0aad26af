use super::geometry::EdgeGeometry;
use super::interaction::InteractionLayer;
use crate::core::graph::rbf::RadialBasis;
use candle_core::{Result, Tensor};
use candle_nn::{VarBuilder, ops::sigmoid};

/// Width of the correction network input: Born radius, charge, offset radius and the two
/// scaled lambdas.
pub const INPUT_WIDTH: usize = 5;

/// Per-atom outputs of the correction network.
#[derive(Debug, Clone)]
pub struct Correction {
    /// `[N]` Born radii after the bounded correction.
    pub born_radius: Tensor,
    /// `[N]` surface-area scale in `(0, 1)`.
    pub sa_scale: Tensor,
}

/// Second message-passing stage: two interaction layers on the short-range graph that
/// predict a bounded Born radius correction and a surface-area scale per atom.
#[derive(Debug, Clone)]
pub struct CorrectionNetwork {
    first: InteractionLayer,
    second: InteractionLayer,
    rbf: RadialBasis,
    fraction: f64,
}

impl CorrectionNetwork {
    /// Weights are read from `interaction1` and `interaction2` under `vb`.
    pub fn new(hidden: usize, rbf: RadialBasis, fraction: f64, vb: VarBuilder) -> Result<Self> {
        let kernels = rbf.num_kernels();
        let first =
            InteractionLayer::new(INPUT_WIDTH, hidden, hidden, kernels, vb.pp("interaction1"))?;
        let second = InteractionLayer::new(hidden, hidden, 2, kernels, vb.pp("interaction2"))?;
        Ok(Self {
            first,
            second,
            rbf,
            fraction,
        })
    }

    /// # Arguments
    ///
    /// * `gb` - `[N, 2]` output of the GB aggregation (Born radius, charge).
    /// * `offset_radius` - `[N]` offset radii.
    /// * `lambda_sterics` - `[N]` scaled sterics lambda of each atom's molecule.
    /// * `lambda_electrostatics` - `[N]` scaled electrostatics lambda of each atom's molecule.
    /// * `edges` - Edges of the short-range graph.
    pub fn forward(
        &self,
        gb: &Tensor,
        offset_radius: &Tensor,
        lambda_sterics: &Tensor,
        lambda_electrostatics: &Tensor,
        edges: &EdgeGeometry,
    ) -> Result<Correction> {
        let born = gb.narrow(1, 0, 1)?.squeeze(1)?;
        let state = Tensor::cat(
            &[
                gb,
                &offset_radius.unsqueeze(1)?,
                &lambda_sterics.unsqueeze(1)?,
                &lambda_electrostatics.unsqueeze(1)?,
            ],
            1,
        )?;

        let rbf = if edges.is_empty() {
            Tensor::zeros((0, self.rbf.num_kernels()), gb.dtype(), gb.device())?
        } else {
            self.rbf.encode_tensor(edges.distances())?
        };

        let hidden = self.first.forward(&state, edges, &rbf)?.silu()?;
        let output = self.second.forward(&hidden, edges, &rbf)?;
        let correction = output.narrow(1, 0, 1)?.squeeze(1)?;
        let sa = output.narrow(1, 1, 1)?.squeeze(1)?;

        Ok(Correction {
            born_radius: bounded_correction(&born, &correction, self.fraction)?,
            sa_scale: sigmoid(&sa)?,
        })
    }
}

/// `B' = B · (f + σ(c) · (1 - f) · 2)`, which keeps `B'` within `[f·B, (2 - f)·B]`.
pub fn bounded_correction(born: &Tensor, correction: &Tensor, fraction: f64) -> Result<Tensor> {
    let factor = sigmoid(correction)?.affine(2.0 * (1.0 - fraction), fraction)?;
    born.mul(&factor)
}
