use super::geometry::EdgeGeometry;
use candle_core::{Module, Result, Tensor};
use candle_nn::{Linear, VarBuilder, linear};

/// One message-passing layer of the correction network.
///
/// For every edge `j -> i` a message `swish(W2 swish(W1 [h_j, h_i, rbf_ij]))` is formed;
/// messages are summed at their target and the atom state is updated with
/// `U2 swish(U1 [h_i, a_i])`.
#[derive(Debug, Clone)]
pub struct InteractionLayer {
    message_in: Linear,
    message_out: Linear,
    update_in: Linear,
    update_out: Linear,
    hidden: usize,
}

impl InteractionLayer {
    /// Weights are read from `message.0`, `message.2`, `update.0` and `update.2` under `vb`.
    pub fn new(
        in_width: usize,
        hidden: usize,
        out_width: usize,
        num_kernels: usize,
        vb: VarBuilder,
    ) -> Result<Self> {
        Ok(Self {
            message_in: linear(2 * in_width + num_kernels, hidden, vb.pp("message.0"))?,
            message_out: linear(hidden, hidden, vb.pp("message.2"))?,
            update_in: linear(in_width + hidden, hidden, vb.pp("update.0"))?,
            update_out: linear(hidden, out_width, vb.pp("update.2"))?,
            hidden,
        })
    }

    /// # Arguments
    ///
    /// * `state` - `[N, in_width]` atom states.
    /// * `edges` - Edges of the short-range graph.
    /// * `rbf` - `[E, num_kernels]` edge features; ignored when there are no edges.
    pub fn forward(&self, state: &Tensor, edges: &EdgeGeometry, rbf: &Tensor) -> Result<Tensor> {
        let atom_count = state.dim(0)?;
        let aggregated = if edges.is_empty() {
            Tensor::zeros((atom_count, self.hidden), state.dtype(), state.device())?
        } else {
            let input = Tensor::cat(
                &[&edges.gather_sources(state)?, &edges.gather_targets(state)?, rbf],
                1,
            )?;
            let messages = self
                .message_out
                .forward(&self.message_in.forward(&input)?.silu()?)?
                .silu()?;
            edges.scatter_to_targets(&messages, atom_count)?
        };

        let update = Tensor::cat(&[state, &aggregated], 1)?;
        self.update_out
            .forward(&self.update_in.forward(&update)?.silu()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::graph::neighbor::{NeighborGraph, NeighborSearch};
    use candle_core::{DType, Device};
    use candle_nn::VarMap;
    use nalgebra::Point3;

    fn setup(points: &[Point3<f64>]) -> (InteractionLayer, EdgeGeometry, Tensor, Tensor) {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F64, &device);
        let layer = InteractionLayer::new(3, 8, 2, 4, vb).unwrap();

        let flat: Vec<f64> = points.iter().flat_map(|p| [p.x, p.y, p.z]).collect();
        let positions = Tensor::from_vec(flat, (points.len(), 3), &device).unwrap();
        let graph = NeighborGraph::build(points, None, 0.5, 32, NeighborSearch::AllPairs);
        let edges = EdgeGeometry::new(&positions, points, &graph).unwrap();
        let rbf = Tensor::ones((edges.len(), 4), DType::F64, &device).unwrap();
        let state = Tensor::from_vec(
            (0..points.len() * 3).map(|v| v as f64 * 0.1).collect::<Vec<_>>(),
            (points.len(), 3),
            &device,
        )
        .unwrap();
        (layer, edges, rbf, state)
    }

    #[test]
    fn forward_produces_output_width_per_atom() {
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.2, 0.0, 0.0),
            Point3::new(0.0, 0.2, 0.0),
        ];
        let (layer, edges, rbf, state) = setup(&points);
        let output = layer.forward(&state, &edges, &rbf).unwrap();
        assert_eq!(output.dims(), &[3, 2]);
    }

    #[test]
    fn forward_handles_graph_without_edges() {
        let points = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 0.0, 0.0)];
        let (layer, edges, rbf, state) = setup(&points);
        assert!(edges.is_empty());
        let output = layer.forward(&state, &edges, &rbf).unwrap();
        assert_eq!(output.dims(), &[2, 2]);
    }

    #[test]
    fn atoms_with_identical_states_and_neighborhoods_agree() {
        // Two mirror-image atoms around a center share the same neighborhood.
        let points = vec![
            Point3::new(-0.2, 0.0, 0.0),
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.2, 0.0, 0.0),
        ];
        let device = Device::Cpu;
        let (layer, edges, rbf, _) = setup(&points);
        let state = Tensor::from_vec(
            vec![0.1, 0.2, 0.3, 0.5, 0.5, 0.5, 0.1, 0.2, 0.3],
            (3, 3),
            &device,
        )
        .unwrap();
        let output = layer.forward(&state, &edges, &rbf).unwrap().to_vec2::<f64>().unwrap();
        for k in 0..2 {
            assert!((output[0][k] - output[2][k]).abs() < 1e-12);
        }
    }
}
