use super::config::ModelConfig;
use super::correction::{Correction, CorrectionNetwork};
use super::energy::{EnergyEvaluator, molecule_energies};
use super::error::ModelError;
use super::gb::{GbAggregation, column, feature_column};
use super::geometry::EdgeGeometry;
use super::lambda_scale::LambdaScale;
use crate::core::forcefield::params::NeckTable;
use crate::core::graph::neighbor::NeighborGraph;
use crate::core::graph::rbf::RadialBasis;
use crate::core::models::atom::{GB_PARAMETER_WIDTH, GbParameters};
use crate::core::models::system::{AtomSet, FeatureSelector};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use nalgebra::Point3;
use std::path::Path;
use tracing::{debug, info, warn};

/// Everything a model needs for one forward evaluation of a batch.
///
/// Positions and lambdas are borrowed tensors so that the caller can own them as
/// differentiable variables.
#[derive(Debug)]
pub struct ForwardInputs<'a> {
    positions: &'a Tensor,
    lambda_sterics: &'a Tensor,
    lambda_electrostatics: &'a Tensor,
    host_positions: Vec<Point3<f64>>,
    parameters: Vec<GbParameters>,
    features: Tensor,
    batch_ids: Vec<usize>,
    batch: Tensor,
    molecule_count: usize,
}

impl<'a> ForwardInputs<'a> {
    /// # Arguments
    ///
    /// * `atoms` - The batch; its coordinates must equal the values of `positions`.
    /// * `selector` - Which per-atom field provides the GB parameter rows.
    /// * `positions` - `[N, 3]` position tensor.
    /// * `lambda_sterics` - `[M]` sterics lambda per molecule.
    /// * `lambda_electrostatics` - `[M]` electrostatics lambda per molecule.
    pub fn new(
        atoms: &AtomSet,
        selector: FeatureSelector,
        positions: &'a Tensor,
        lambda_sterics: &'a Tensor,
        lambda_electrostatics: &'a Tensor,
    ) -> Result<Self, ModelError> {
        let parameters = atoms.gb_parameters(selector)?;
        let device = positions.device();
        let rows: Vec<f64> = parameters.iter().flat_map(GbParameters::to_row).collect();
        let features = Tensor::from_vec(rows, (atoms.len(), GB_PARAMETER_WIDTH), device)?
            .to_dtype(positions.dtype())?;
        let batch_ids = atoms.batch_ids();
        let batch_u32: Vec<u32> = batch_ids.iter().map(|&b| b as u32).collect();
        let batch = Tensor::from_vec(batch_u32, atoms.len(), device)?;

        Ok(Self {
            positions,
            lambda_sterics,
            lambda_electrostatics,
            host_positions: atoms.positions(),
            parameters,
            features,
            batch_ids,
            batch,
            molecule_count: atoms.molecule_count(),
        })
    }

    #[inline]
    pub fn atom_count(&self) -> usize {
        self.parameters.len()
    }

    #[inline]
    pub fn molecule_count(&self) -> usize {
        self.molecule_count
    }

    pub fn parameters(&self) -> &[GbParameters] {
        &self.parameters
    }

    /// `[N, 7]` GB parameter rows.
    pub fn features(&self) -> &Tensor {
        &self.features
    }

    pub fn graph(&self, cutoff: f64, config: &ModelConfig) -> NeighborGraph {
        NeighborGraph::build(
            &self.host_positions,
            Some(&self.batch_ids),
            cutoff,
            config.max_neighbors,
            config.neighbor_search,
        )
    }

    pub fn edges(&self, graph: &NeighborGraph) -> Result<EdgeGeometry, ModelError> {
        Ok(EdgeGeometry::new(
            self.positions,
            &self.host_positions,
            graph,
        )?)
    }

    /// Broadcasts `[M]` molecule values to `[N]` atom values.
    pub fn per_atom(&self, molecule_values: &Tensor) -> Result<Tensor, ModelError> {
        Ok(molecule_values.index_select(&self.batch, 0)?)
    }

    /// Sums `[N]` atom values into `[M]` molecule values.
    pub fn per_molecule(&self, atom_values: &Tensor) -> Result<Tensor, ModelError> {
        Ok(molecule_energies(
            atom_values,
            &self.batch,
            self.molecule_count,
        )?)
    }

    fn molecule_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.molecule_count];
        for &b in &self.batch_ids {
            sizes[b] += 1;
        }
        sizes
    }
}

/// Born radii before and after the learned correction.
#[derive(Debug, Clone, PartialEq)]
pub struct BornRadii {
    /// Radii from the GBn2 integral alone.
    pub gb: Vec<f64>,
    /// Radii used in the energy; equal to `gb` for models without a correction.
    pub corrected: Vec<f64>,
}

/// A model that maps a batch of atoms to per-atom solvation energies.
pub trait EnergyModel {
    fn config(&self) -> &ModelConfig;

    fn device(&self) -> &Device;

    /// `[N]` per-atom energies in kJ/mol, differentiable with respect to the input tensors.
    fn atom_energies(&self, inputs: &ForwardInputs) -> Result<Tensor, ModelError>;

    fn born_radii(&self, inputs: &ForwardInputs) -> Result<BornRadii, ModelError>;
}

fn long_range_edges(
    config: &ModelConfig,
    inputs: &ForwardInputs,
) -> Result<EdgeGeometry, ModelError> {
    let graph = inputs.graph(config.long_cutoff, config);
    let sizes = inputs.molecule_sizes();
    let stranded = graph
        .isolated_atoms(inputs.atom_count())
        .into_iter()
        .filter(|&atom| sizes[inputs.batch_ids[atom]] > 1)
        .count();
    if stranded > 0 {
        warn!(
            atoms = stranded,
            cutoff = config.long_cutoff,
            "Atoms without long-range neighbors fall back to their offset radius."
        );
    }
    inputs.edges(&graph)
}

/// The learned GBn2 solvation model.
///
/// GB aggregation on the long-range graph, a two-layer correction network on the
/// short-range graph, and lambda-scaled GB and surface-area energies.
#[derive(Debug, Clone)]
pub struct SolvationModel {
    config: ModelConfig,
    gb: GbAggregation,
    correction: CorrectionNetwork,
    sterics: LambdaScale,
    electrostatics: LambdaScale,
    energy: EnergyEvaluator,
    device: Device,
}

struct Stages {
    long: EdgeGeometry,
    gb: Tensor,
    correction: Correction,
    scale_sterics: Tensor,
    scale_electrostatics: Tensor,
}

impl SolvationModel {
    /// Builds the model from weights under `vb`.
    ///
    /// Expected tensor groups are `interaction1`, `interaction2`, `sterics` and
    /// `electrostatics`.
    pub fn new(config: ModelConfig, vb: VarBuilder) -> Result<Self, ModelError> {
        config.validate()?;
        let rbf = RadialBasis::new(
            config.num_kernels,
            config.rbf_min_range,
            config.short_cutoff,
            config.rbf_alpha,
        );
        let correction = CorrectionNetwork::new(config.hidden, rbf, config.fraction, vb.clone())?;
        let sterics = LambdaScale::new(config.lambda_hidden, vb.pp("sterics"))?;
        let electrostatics = LambdaScale::new(config.lambda_hidden, vb.pp("electrostatics"))?;

        Ok(Self {
            gb: GbAggregation::default(),
            correction,
            sterics,
            electrostatics,
            energy: EnergyEvaluator::new(config.solute_dielectric, config.solvent_dielectric),
            device: vb.device().clone(),
            config,
        })
    }

    /// Loads weights from a safetensors file.
    pub fn load(config: ModelConfig, path: &Path, device: &Device) -> Result<Self, ModelError> {
        info!("Loading solvation model weights from {:?}", path);
        let bytes = std::fs::read(path).map_err(|e| ModelError::Weights {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        let vb = VarBuilder::from_buffered_safetensors(bytes, DType::F64, device)?;
        Self::new(config, vb)
    }

    /// Enables the neck term of the GB integral.
    pub fn with_neck_table(mut self, table: NeckTable) -> Self {
        self.gb = GbAggregation::new(Some(table));
        self
    }

    fn stages(&self, inputs: &ForwardInputs) -> Result<Stages, ModelError> {
        let long = long_range_edges(&self.config, inputs)?;
        let short_graph = inputs.graph(self.config.short_cutoff, &self.config);
        let short = inputs.edges(&short_graph)?;
        debug!(
            atoms = inputs.atom_count(),
            long_edges = long.len(),
            short_edges = short.len(),
            "Prepared solvation graphs."
        );

        let gb = self
            .gb
            .forward(inputs.features(), inputs.parameters(), &long)?;
        let scale_sterics = inputs.per_atom(&self.sterics.forward(inputs.lambda_sterics)?)?;
        let scale_electrostatics =
            inputs.per_atom(&self.electrostatics.forward(inputs.lambda_electrostatics)?)?;
        let offset_radius = feature_column(inputs.features(), column::OFFSET_RADIUS)?;
        let correction = self.correction.forward(
            &gb,
            &offset_radius,
            &scale_sterics,
            &scale_electrostatics,
            &short,
        )?;

        Ok(Stages {
            long,
            gb,
            correction,
            scale_sterics,
            scale_electrostatics,
        })
    }
}

impl EnergyModel for SolvationModel {
    fn config(&self) -> &ModelConfig {
        &self.config
    }

    fn device(&self) -> &Device {
        &self.device
    }

    fn atom_energies(&self, inputs: &ForwardInputs) -> Result<Tensor, ModelError> {
        let stages = self.stages(inputs)?;
        let charge = feature_column(inputs.features(), column::CHARGE)?;
        let offset_radius = feature_column(inputs.features(), column::OFFSET_RADIUS)?;

        let gb = self
            .energy
            .gb_energies(&charge, &stages.correction.born_radius, &stages.long)?;
        let sa = self
            .energy
            .sa_energies(&stages.correction.sa_scale, &offset_radius)?;
        Ok(gb
            .mul(&stages.scale_electrostatics)?
            .add(&sa.mul(&stages.scale_sterics)?)?)
    }

    fn born_radii(&self, inputs: &ForwardInputs) -> Result<BornRadii, ModelError> {
        let stages = self.stages(inputs)?;
        Ok(BornRadii {
            gb: feature_column(&stages.gb, 0)?.to_vec1::<f64>()?,
            corrected: stages.correction.born_radius.to_vec1::<f64>()?,
        })
    }
}

/// Plain GBn2 polarization energy without learned terms.
///
/// Uses only the long-range graph settings and dielectrics of its configuration; lambdas are
/// accepted but do not enter the energy.
#[derive(Debug, Clone)]
pub struct GbNeckModel {
    config: ModelConfig,
    gb: GbAggregation,
    energy: EnergyEvaluator,
    device: Device,
}

impl GbNeckModel {
    pub fn new(config: ModelConfig, device: &Device) -> Result<Self, ModelError> {
        config.validate()?;
        Ok(Self {
            gb: GbAggregation::default(),
            energy: EnergyEvaluator::new(config.solute_dielectric, config.solvent_dielectric),
            device: device.clone(),
            config,
        })
    }

    pub fn with_neck_table(mut self, table: NeckTable) -> Self {
        self.gb = GbAggregation::new(Some(table));
        self
    }

    fn radii(&self, inputs: &ForwardInputs) -> Result<(EdgeGeometry, Tensor), ModelError> {
        let long = long_range_edges(&self.config, inputs)?;
        let gb = self
            .gb
            .forward(inputs.features(), inputs.parameters(), &long)?;
        Ok((long, feature_column(&gb, 0)?))
    }
}

impl EnergyModel for GbNeckModel {
    fn config(&self) -> &ModelConfig {
        &self.config
    }

    fn device(&self) -> &Device {
        &self.device
    }

    fn atom_energies(&self, inputs: &ForwardInputs) -> Result<Tensor, ModelError> {
        let (long, born) = self.radii(inputs)?;
        let charge = feature_column(inputs.features(), column::CHARGE)?;
        Ok(self.energy.gb_energies(&charge, &born, &long)?)
    }

    fn born_radii(&self, inputs: &ForwardInputs) -> Result<BornRadii, ModelError> {
        let (_, born) = self.radii(inputs)?;
        let radii = born.to_vec1::<f64>()?;
        Ok(BornRadii {
            gb: radii.clone(),
            corrected: radii,
        })
    }
}
