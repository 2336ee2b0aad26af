use super::geometry::EdgeGeometry;
use crate::core::forcefield::params::NeckTable;
use crate::core::forcefield::potentials::{DIELECTRIC_OFFSET, NECK_CUTOFF, NECK_SCALE};
use crate::core::models::atom::GbParameters;
use candle_core::{Result, Tensor};

/// Column of a feature row, as laid out by [`GbParameters::to_row`].
pub(crate) mod column {
    pub const CHARGE: usize = 0;
    pub const OFFSET_RADIUS: usize = 1;
    pub const SCALED_RADIUS: usize = 2;
    pub const ALPHA: usize = 3;
    pub const BETA: usize = 4;
    pub const GAMMA: usize = 5;
}

/// Contiguous `[N]` copy of one column of a `[N, C]` tensor.
pub(crate) fn feature_column(features: &Tensor, index: usize) -> Result<Tensor> {
    features.narrow(1, index, 1)?.squeeze(1)?.contiguous()
}

/// First message-passing stage: accumulates the GBn2 descreening integral over incoming
/// edges and converts it to an effective Born radius.
///
/// Branches of the integral (the overlap step, the sign of `r - sr` and the lower
/// integration bound) are selected from plain distances; the smooth expressions are built
/// from the differentiable edge lengths, so the result carries gradients with respect to the
/// positions.
#[derive(Debug, Clone, Default)]
pub struct GbAggregation {
    neck: Option<NeckTable>,
}

impl GbAggregation {
    pub fn new(neck: Option<NeckTable>) -> Self {
        Self { neck }
    }

    pub fn neck_table(&self) -> Option<&NeckTable> {
        self.neck.as_ref()
    }

    /// # Arguments
    ///
    /// * `features` - `[N, 7]` GB parameter rows.
    /// * `parameters` - The same rows as structs.
    /// * `edges` - Edges of the long-range graph.
    ///
    /// # Return
    ///
    /// `[N, 2]` tensor with columns `(born_radius, charge)`.
    pub fn forward(
        &self,
        features: &Tensor,
        parameters: &[GbParameters],
        edges: &EdgeGeometry,
    ) -> Result<Tensor> {
        let atom_count = parameters.len();
        let offset_radius = feature_column(features, column::OFFSET_RADIUS)?;
        let charge = feature_column(features, column::CHARGE)?;

        let integral = if edges.is_empty() {
            offset_radius.zeros_like()?
        } else {
            let per_edge = self.edge_integrals(features, parameters, edges)?;
            edges.scatter_to_targets(&per_edge, atom_count)?
        };

        let born = born_radius(features, &offset_radius, &integral)?;
        Tensor::stack(&[&born, &charge], 1)
    }

    fn edge_integrals(
        &self,
        features: &Tensor,
        parameters: &[GbParameters],
        edges: &EdgeGeometry,
    ) -> Result<Tensor> {
        let dtype = features.dtype();
        let r = edges.distances();
        let or_i = edges.gather_targets(&feature_column(features, column::OFFSET_RADIUS)?)?;
        let sr_j = edges.gather_sources(&feature_column(features, column::SCALED_RADIUS)?)?;

        let count = edges.len();
        let mut overlap = Vec::with_capacity(count);
        let mut sign = Vec::with_capacity(count);
        let mut lower_is_radius = Vec::with_capacity(count);
        for ((&s, &t), &dist) in edges
            .sources()
            .iter()
            .zip(edges.targets())
            .zip(edges.host_distances())
        {
            let or = parameters[t as usize].offset_radius;
            let sr = parameters[s as usize].scaled_radius;
            overlap.push(indicator(dist + sr - or >= 0.0));
            sign.push(if dist >= sr { 1.0 } else { -1.0 });
            lower_is_radius.push(indicator(or >= (dist - sr).abs()));
        }
        let overlap = edges.edge_constant(overlap, dtype)?;
        let sign = edges.edge_constant(sign, dtype)?;
        let lower_is_radius = edges.edge_constant(lower_is_radius, dtype)?;

        let upper = r.add(&sr_j)?;
        let gap = r.sub(&sr_j)?.mul(&sign)?;
        let lower = gap.add(&lower_is_radius.mul(&or_i.sub(&gap)?)?)?;
        let inv_upper = upper.recip()?;
        let inv_lower = lower.recip()?;
        let shell = r.sub(&sr_j.sqr()?.div(r)?)?;
        let body = inv_lower
            .sub(&inv_upper)?
            .add(&shell.mul(&inv_upper.sqr()?.sub(&inv_lower.sqr()?)?)?.affine(0.25, 0.0)?)?
            .add(&lower.div(&upper)?.log()?.div(r)?.affine(0.5, 0.0)?)?;
        let vdw = overlap.mul(&body)?.affine(0.5, 0.0)?;

        match &self.neck {
            Some(table) => {
                let neck = neck_integrals(table, parameters, edges, dtype)?;
                vdw.add(&neck.affine(NECK_SCALE, 0.0)?)
            }
            None => Ok(vdw),
        }
    }
}

fn indicator(condition: bool) -> f64 {
    if condition { 1.0 } else { 0.0 }
}

fn neck_integrals(
    table: &NeckTable,
    parameters: &[GbParameters],
    edges: &EdgeGeometry,
    dtype: candle_core::DType,
) -> Result<Tensor> {
    let count = edges.len();
    let mut d0 = Vec::with_capacity(count);
    let mut m0 = Vec::with_capacity(count);
    for ((&s, &t), &dist) in edges
        .sources()
        .iter()
        .zip(edges.targets())
        .zip(edges.host_distances())
    {
        let (target, source) = (&parameters[t as usize], &parameters[s as usize]);
        let within = target.intrinsic_radius() + source.intrinsic_radius() + NECK_CUTOFF - dist;
        let (d, m) = table.lookup(target.radius_index, source.radius_index);
        d0.push(d);
        m0.push(if within >= 0.0 { m } else { 0.0 });
    }
    let d0 = edges.edge_constant(d0, dtype)?;
    let m0 = edges.edge_constant(m0, dtype)?;

    let x2 = edges.distances().sub(&d0)?.sqr()?;
    let x6 = x2.sqr()?.mul(&x2)?;
    let denominator = x2
        .affine(100.0, 1.0)?
        .add(&x6.affine(0.3e6, 0.0)?)?;
    m0.div(&denominator)
}

/// `B = 1 / (1/or - tanh(α ψ - β ψ² + γ ψ³) / (or + offset))` with `ψ = I · or`.
fn born_radius(features: &Tensor, offset_radius: &Tensor, integral: &Tensor) -> Result<Tensor> {
    let alpha = feature_column(features, column::ALPHA)?;
    let beta = feature_column(features, column::BETA)?;
    let gamma = feature_column(features, column::GAMMA)?;

    let psi = integral.mul(offset_radius)?;
    let psi2 = psi.sqr()?;
    let psi3 = psi2.mul(&psi)?;
    let polynomial = alpha
        .mul(&psi)?
        .sub(&beta.mul(&psi2)?)?
        .add(&gamma.mul(&psi3)?)?;
    let radius = offset_radius.affine(1.0, DIELECTRIC_OFFSET)?;
    offset_radius
        .recip()?
        .sub(&polynomial.tanh()?.div(&radius)?)?
        .recip()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::forcefield::potentials;
    use crate::core::graph::neighbor::{NeighborGraph, NeighborSearch};
    use candle_core::{DType, Device};
    use nalgebra::Point3;

    const TOLERANCE: f64 = 1e-10;

    fn parameters() -> Vec<GbParameters> {
        let row = |charge: f64, or: f64, sr: f64, index: usize| GbParameters {
            charge,
            offset_radius: or,
            scaled_radius: sr,
            alpha: 1.0,
            beta: 0.8,
            gamma: 4.85,
            radius_index: index,
        };
        vec![
            row(0.4, 0.15, 0.12, 10),
            row(-0.8, 0.1304859, 0.09, 6),
            row(0.4, 0.17, 0.18, 13),
        ]
    }

    fn positions() -> Vec<Point3<f64>> {
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.16, 0.0, 0.0),
            Point3::new(0.05, 0.21, 0.0),
        ]
    }

    fn run(neck: Option<NeckTable>, points: &[Point3<f64>]) -> Vec<Vec<f64>> {
        let params = parameters();
        let device = Device::Cpu;
        let rows: Vec<f64> = params.iter().flat_map(|p| p.to_row()).collect();
        let features = Tensor::from_vec(rows, (params.len(), 7), &device).unwrap();
        let flat: Vec<f64> = points.iter().flat_map(|p| [p.x, p.y, p.z]).collect();
        let position_tensor = Tensor::from_vec(flat, (points.len(), 3), &device)
            .unwrap()
            .to_dtype(DType::F64)
            .unwrap();
        let graph = NeighborGraph::build(points, None, 1.0, 32, NeighborSearch::AllPairs);
        let edges = EdgeGeometry::new(&position_tensor, points, &graph).unwrap();
        GbAggregation::new(neck)
            .forward(&features, &params, &edges)
            .unwrap()
            .to_vec2::<f64>()
            .unwrap()
    }

    fn reference(neck: Option<&NeckTable>, points: &[Point3<f64>]) -> Vec<f64> {
        let params = parameters();
        (0..params.len())
            .map(|i| {
                let pi = &params[i];
                let integral: f64 = (0..params.len())
                    .filter(|&j| j != i)
                    .map(|j| {
                        let pj = &params[j];
                        let r = (points[i] - points[j]).norm();
                        let mut value =
                            potentials::gbn2_integral(r, pi.offset_radius, pj.scaled_radius);
                        if let Some(table) = neck {
                            let (d0, m0) = table.lookup(pi.radius_index, pj.radius_index);
                            value += NECK_SCALE
                                * potentials::neck_integral(
                                    r,
                                    pi.intrinsic_radius(),
                                    pj.intrinsic_radius(),
                                    d0,
                                    m0,
                                );
                        }
                        value
                    })
                    .sum();
                potentials::born_radius(integral, pi.offset_radius, pi.alpha, pi.beta, pi.gamma)
            })
            .collect()
    }

    #[test]
    fn forward_matches_scalar_reference_without_neck() {
        let points = positions();
        let output = run(None, &points);
        for (row, expected) in output.iter().zip(reference(None, &points)) {
            assert!((row[0] - expected).abs() < TOLERANCE);
        }
    }

    #[test]
    fn forward_matches_scalar_reference_with_neck() {
        let table = NeckTable::from_fn(21, |i, j| (0.25 + 0.002 * (i + j) as f64, 0.004));
        let points = positions();
        let with_neck = run(Some(table.clone()), &points);
        let without_neck = run(None, &points);
        for ((row, expected), plain) in with_neck
            .iter()
            .zip(reference(Some(&table), &points))
            .zip(&without_neck)
        {
            assert!((row[0] - expected).abs() < TOLERANCE);
            assert!(row[0] > plain[0]);
        }
    }

    #[test]
    fn neck_table_is_only_present_when_configured() {
        assert!(GbAggregation::default().neck_table().is_none());
        let table = NeckTable::from_fn(21, |_, _| (0.3, 0.004));
        let aggregation = GbAggregation::new(Some(table.clone()));
        assert_eq!(aggregation.neck_table(), Some(&table));
    }

    #[test]
    fn feature_column_returns_contiguous_values() {
        let rows: Vec<f64> = parameters().iter().flat_map(GbParameters::to_row).collect();
        let features = Tensor::from_vec(rows, (3, 7), &Device::Cpu).unwrap();
        let radii = feature_column(&features, column::OFFSET_RADIUS).unwrap();
        assert!(radii.is_contiguous());
        assert_eq!(radii.to_vec1::<f64>().unwrap(), vec![0.15, 0.1304859, 0.17]);
    }

    #[test]
    fn forward_passes_charges_through() {
        let output = run(None, &positions());
        let charges: Vec<f64> = output.iter().map(|row| row[1]).collect();
        assert_eq!(charges, vec![0.4, -0.8, 0.4]);
    }

    #[test]
    fn isolated_atoms_keep_offset_radius() {
        let far_apart = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(3.0, 0.0, 0.0),
            Point3::new(0.0, 3.0, 0.0),
        ];
        let output = run(None, &far_apart);
        for (row, params) in output.iter().zip(parameters()) {
            assert!((row[0] - params.offset_radius).abs() < TOLERANCE);
        }
    }

    #[test]
    fn descreening_increases_born_radius() {
        let output = run(None, &positions());
        for (row, params) in output.iter().zip(parameters()) {
            assert!(row[0] > params.offset_radius);
        }
    }
}
