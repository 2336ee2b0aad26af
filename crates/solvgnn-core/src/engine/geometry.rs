use crate::core::graph::neighbor::NeighborGraph;
use candle_core::{DType, Result, Tensor};
use nalgebra::Point3;

/// Edges of a [`NeighborGraph`] prepared for tensor message passing.
///
/// Holds the index tensors used to gather endpoint rows and scatter edge values back to
/// targets, and the edge lengths both as a differentiable tensor (a function of the position
/// tensor) and as plain numbers for piecewise branch selection.
#[derive(Debug)]
pub struct EdgeGeometry {
    sources: Vec<u32>,
    targets: Vec<u32>,
    source_ids: Tensor,
    target_ids: Tensor,
    distances: Tensor,
    host_distances: Vec<f64>,
}

impl EdgeGeometry {
    /// # Arguments
    ///
    /// * `positions` - `[N, 3]` position tensor that gradients should flow to.
    /// * `host_positions` - The same coordinates as plain values.
    /// * `graph` - Graph over the `N` atoms.
    pub fn new(
        positions: &Tensor,
        host_positions: &[Point3<f64>],
        graph: &NeighborGraph,
    ) -> Result<Self> {
        let device = positions.device();
        let count = graph.len();
        let source_ids = Tensor::from_slice(graph.sources(), count, device)?;
        let target_ids = Tensor::from_slice(graph.targets(), count, device)?;

        let host_distances = graph
            .edges()
            .map(|(s, t)| (host_positions[s] - host_positions[t]).norm())
            .collect();

        let distances = if graph.is_empty() {
            Tensor::zeros(0, positions.dtype(), device)?
        } else {
            let delta = positions
                .index_select(&source_ids, 0)?
                .sub(&positions.index_select(&target_ids, 0)?)?;
            delta.sqr()?.sum(1)?.sqrt()?
        };

        Ok(Self {
            sources: graph.sources().to_vec(),
            targets: graph.targets().to_vec(),
            source_ids,
            target_ids,
            distances,
            host_distances,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn sources(&self) -> &[u32] {
        &self.sources
    }

    pub fn targets(&self) -> &[u32] {
        &self.targets
    }

    /// `[E]` differentiable edge lengths.
    pub fn distances(&self) -> &Tensor {
        &self.distances
    }

    pub fn host_distances(&self) -> &[f64] {
        &self.host_distances
    }

    /// Rows of `values` at the source of every edge. `values` may be a strided view.
    pub fn gather_sources(&self, values: &Tensor) -> Result<Tensor> {
        values.contiguous()?.index_select(&self.source_ids, 0)
    }

    /// Rows of `values` at the target of every edge. `values` may be a strided view.
    pub fn gather_targets(&self, values: &Tensor) -> Result<Tensor> {
        values.contiguous()?.index_select(&self.target_ids, 0)
    }

    /// Sums per-edge rows into their targets, producing `atom_count` rows.
    ///
    /// Atoms without incoming edges receive zeros.
    pub fn scatter_to_targets(&self, values: &Tensor, atom_count: usize) -> Result<Tensor> {
        let mut dims = values.dims().to_vec();
        dims[0] = atom_count;
        let zeros = Tensor::zeros(dims, values.dtype(), values.device())?;
        if self.is_empty() {
            return Ok(zeros);
        }
        zeros.index_add(&self.target_ids, &values.contiguous()?, 0)
    }

    /// A constant `[E]` tensor built from one host value per edge.
    pub fn edge_constant(&self, values: Vec<f64>, dtype: DType) -> Result<Tensor> {
        Tensor::from_vec(values, self.len(), self.distances.device())?.to_dtype(dtype)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::graph::neighbor::NeighborSearch;
    use candle_core::{Device, Var};

    fn positions() -> Vec<Point3<f64>> {
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.3, 0.0, 0.0),
            Point3::new(0.0, 0.4, 0.0),
        ]
    }

    fn position_tensor(points: &[Point3<f64>]) -> Tensor {
        let flat: Vec<f64> = points.iter().flat_map(|p| [p.x, p.y, p.z]).collect();
        Tensor::from_vec(flat, (points.len(), 3), &Device::Cpu).unwrap()
    }

    #[test]
    fn distances_match_host_distances() {
        let points = positions();
        let graph = NeighborGraph::build(&points, None, 1.0, 32, NeighborSearch::AllPairs);
        let edges = EdgeGeometry::new(&position_tensor(&points), &points, &graph).unwrap();
        let tensor = edges.distances().to_vec1::<f64>().unwrap();
        assert_eq!(tensor.len(), 6);
        for (a, b) in tensor.iter().zip(edges.host_distances()) {
            assert!((a - b).abs() < 1e-12);
        }
        assert!(edges.host_distances().iter().any(|&d| (d - 0.5).abs() < 1e-12));
    }

    #[test]
    fn scatter_to_targets_sums_incoming_values() {
        let points = positions();
        let graph = NeighborGraph::build(&points, None, 0.35, 32, NeighborSearch::AllPairs);
        let edges = EdgeGeometry::new(&position_tensor(&points), &points, &graph).unwrap();
        assert_eq!(edges.len(), 2);
        let ones = Tensor::ones((2, 2), DType::F64, &Device::Cpu).unwrap();
        let summed = edges.scatter_to_targets(&ones, 3).unwrap();
        assert_eq!(
            summed.to_vec2::<f64>().unwrap(),
            vec![vec![1.0, 1.0], vec![1.0, 1.0], vec![0.0, 0.0]]
        );
    }

    #[test]
    fn gather_accepts_strided_column_views() {
        let points = positions();
        let graph = NeighborGraph::build(&points, None, 0.35, 32, NeighborSearch::AllPairs);
        let edges = EdgeGeometry::new(&position_tensor(&points), &points, &graph).unwrap();
        let table = Tensor::from_vec(vec![1.0, 10.0, 2.0, 20.0, 3.0, 30.0], (3, 2), &Device::Cpu)
            .unwrap();
        let column = table.narrow(1, 1, 1).unwrap().squeeze(1).unwrap();
        assert!(!column.is_contiguous());

        let values = [10.0, 20.0, 30.0];
        let sources = edges.gather_sources(&column).unwrap().to_vec1::<f64>().unwrap();
        let targets = edges.gather_targets(&column).unwrap().to_vec1::<f64>().unwrap();
        let expected_sources: Vec<f64> = edges.sources().iter().map(|&s| values[s as usize]).collect();
        let expected_targets: Vec<f64> = edges.targets().iter().map(|&t| values[t as usize]).collect();
        assert_eq!(sources, expected_sources);
        assert_eq!(targets, expected_targets);
    }

    #[test]
    fn scatter_on_empty_graph_returns_zeros() {
        let points = vec![Point3::origin()];
        let graph = NeighborGraph::build(&points, None, 1.0, 32, NeighborSearch::AllPairs);
        let edges = EdgeGeometry::new(&position_tensor(&points), &points, &graph).unwrap();
        assert!(edges.is_empty());
        let values = Tensor::zeros(0, DType::F64, &Device::Cpu).unwrap();
        let summed = edges.scatter_to_targets(&values, 1).unwrap();
        assert_eq!(summed.to_vec1::<f64>().unwrap(), vec![0.0]);
    }

    #[test]
    fn distance_gradient_is_unit_direction() {
        let points = vec![Point3::origin(), Point3::new(0.3, 0.4, 0.0)];
        let graph = NeighborGraph::build(&points, None, 1.0, 32, NeighborSearch::AllPairs);
        let var = Var::from_tensor(&position_tensor(&points)).unwrap();
        let edges = EdgeGeometry::new(var.as_tensor(), &points, &graph).unwrap();
        let grads = edges.distances().sum_all().unwrap().backward().unwrap();
        let grad = grads.get(var.as_tensor()).unwrap().to_vec2::<f64>().unwrap();
        // Both directed edges contribute, so each endpoint sees twice the unit vector.
        assert!((grad[1][0] - 1.2).abs() < 1e-12);
        assert!((grad[1][1] - 1.6).abs() < 1e-12);
        assert!((grad[0][0] + 1.2).abs() < 1e-12);
    }
}
