use super::geometry::EdgeGeometry;
use crate::core::forcefield::potentials::{
    DIELECTRIC_OFFSET, PROBE_RADIUS, SURFACE_TENSION, gb_prefactor,
};
use candle_core::{Result, Tensor};

const SA_PREFACTOR: f64 = 4.184 * SURFACE_TENSION * 100.0;

/// Per-atom GB polarization and surface-area energies, in kJ/mol.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyEvaluator {
    prefactor: f64,
}

impl EnergyEvaluator {
    pub fn new(solute_dielectric: f64, solvent_dielectric: f64) -> Self {
        Self {
            prefactor: gb_prefactor(solute_dielectric, solvent_dielectric),
        }
    }

    pub fn prefactor(&self) -> f64 {
        self.prefactor
    }

    /// GB energy of each atom: its self term plus every pair term over incoming edges.
    ///
    /// # Arguments
    ///
    /// * `charge` - `[N]` charges.
    /// * `born_radius` - `[N]` Born radii.
    /// * `edges` - Edges of the long-range graph.
    pub fn gb_energies(
        &self,
        charge: &Tensor,
        born_radius: &Tensor,
        edges: &EdgeGeometry,
    ) -> Result<Tensor> {
        let self_terms = charge.sqr()?.div(born_radius)?;
        let atom_count = charge.dim(0)?;
        let total = if edges.is_empty() {
            self_terms
        } else {
            let q_i = edges.gather_targets(charge)?;
            let q_j = edges.gather_sources(charge)?;
            let bb = edges
                .gather_targets(born_radius)?
                .mul(&edges.gather_sources(born_radius)?)?;
            let r2 = edges.distances().sqr()?;
            let screening = r2.div(&bb.affine(4.0, 0.0)?)?.neg()?.exp()?;
            let f_gb = r2.add(&bb.mul(&screening)?)?.sqrt()?;
            let pair_terms = q_i.mul(&q_j)?.div(&f_gb)?;
            self_terms.add(&edges.scatter_to_targets(&pair_terms, atom_count)?)?
        };
        total.affine(self.prefactor, 0.0)
    }

    /// Surface-area energy of each atom, `4.184 γ s (or + offset + probe)² · 100`.
    pub fn sa_energies(&self, sa_scale: &Tensor, offset_radius: &Tensor) -> Result<Tensor> {
        let radius = offset_radius.affine(1.0, DIELECTRIC_OFFSET + PROBE_RADIUS)?;
        sa_scale.mul(&radius.sqr()?)?.affine(SA_PREFACTOR, 0.0)
    }
}

/// Sums `[N]` atom energies into `[molecule_count]` molecule energies.
pub fn molecule_energies(
    atom_energies: &Tensor,
    batch: &Tensor,
    molecule_count: usize,
) -> Result<Tensor> {
    Tensor::zeros(molecule_count, atom_energies.dtype(), atom_energies.device())?.index_add(
        batch,
        atom_energies,
        0,
    )
}
