use candle_core::{Device, Tensor};

/// Compact-support radial basis used to featurize edge distances.
///
/// Kernel `k` is the bump `max(0, 1 - ((d - c_k) / m)^2)^3`, where the centers `c_k` are
/// evenly spaced from `min_range + m` to `max_range - m` and the half-width is
/// `m = alpha * (max_range - min_range) / (num_kernels + 1)`. Each bump is exactly zero
/// outside `c_k ± m` and has a continuous first derivative everywhere.
#[derive(Debug, Clone, PartialEq)]
pub struct RadialBasis {
    centers: Vec<f64>,
    margin: f64,
}

impl RadialBasis {
    pub fn new(num_kernels: usize, min_range: f64, max_range: f64, alpha: f64) -> Self {
        let margin = alpha * (max_range - min_range) / (num_kernels as f64 + 1.0);
        let lower = min_range + margin;
        let upper = max_range - margin;
        let centers = match num_kernels {
            0 => Vec::new(),
            1 => vec![lower],
            _ => {
                let step = (upper - lower) / (num_kernels as f64 - 1.0);
                (0..num_kernels).map(|k| lower + step * k as f64).collect()
            }
        };
        Self { centers, margin }
    }

    #[inline]
    pub fn num_kernels(&self) -> usize {
        self.centers.len()
    }

    pub fn centers(&self) -> &[f64] {
        &self.centers
    }

    pub fn margin(&self) -> f64 {
        self.margin
    }

    /// Encodes one distance.
    pub fn encode(&self, distance: f64) -> Vec<f64> {
        self.centers
            .iter()
            .map(|&center| {
                let u = (distance - center) / self.margin;
                (1.0 - u * u).max(0.0).powi(3)
            })
            .collect()
    }

    /// Encodes a `[E]` tensor of distances into a `[E, num_kernels]` feature tensor.
    ///
    /// Built from differentiable tensor operations, so gradients flow back to the distances.
    pub fn encode_tensor(&self, distances: &Tensor) -> candle_core::Result<Tensor> {
        let centers = Tensor::from_vec(
            self.centers.clone(),
            (1, self.centers.len()),
            distances.device(),
        )?
        .to_dtype(distances.dtype())?;
        let u = distances
            .unsqueeze(1)?
            .broadcast_sub(&centers)?
            .affine(1.0 / self.margin, 0.0)?;
        let bump = u.sqr()?.affine(-1.0, 1.0)?.relu()?;
        bump.sqr()?.mul(&bump)
    }

    /// Same as [`encode_tensor`](Self::encode_tensor) for host-side distances.
    pub fn encode_all(&self, distances: &[f64], device: &Device) -> candle_core::Result<Tensor> {
        let distances = Tensor::from_slice(distances, distances.len(), device)?;
        self.encode_tensor(&distances)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Var;

    const TOLERANCE: f64 = 1e-12;

    fn basis() -> RadialBasis {
        RadialBasis::new(32, 0.1, 0.4, 2.0)
    }

    #[test]
    fn new_places_centers_inside_margins() {
        let rbf = basis();
        let margin = 2.0 * 0.3 / 33.0;
        assert!((rbf.margin() - margin).abs() < TOLERANCE);
        assert_eq!(rbf.num_kernels(), 32);
        assert!((rbf.centers()[0] - (0.1 + margin)).abs() < TOLERANCE);
        assert!((rbf.centers()[31] - (0.4 - margin)).abs() < TOLERANCE);
    }

    #[test]
    fn encode_returns_one_value_per_kernel() {
        assert_eq!(basis().encode(0.25).len(), 32);
    }

    #[test]
    fn encode_peaks_at_one_on_a_center() {
        let rbf = basis();
        let center = rbf.centers()[7];
        let features = rbf.encode(center);
        assert!((features[7] - 1.0).abs() < TOLERANCE);
        assert!(features.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn encode_is_zero_outside_support() {
        let rbf = basis();
        assert!(rbf.encode(0.0).iter().all(|&v| v == 0.0));
        assert!(rbf.encode(0.5).iter().all(|&v| v == 0.0));
        let center = rbf.centers()[0];
        assert_eq!(rbf.encode(center + rbf.margin() * 1.0001)[0], 0.0);
    }

    #[test]
    fn encode_is_continuous_at_support_boundary() {
        let rbf = basis();
        let edge = rbf.centers()[3] + rbf.margin();
        let delta = 1e-6;
        let inside = rbf.encode(edge - delta)[3];
        // (1 - u^2)^3 < (2 delta / margin)^3 for u = 1 - delta / margin.
        assert!(inside > 0.0 && inside < (2.0 * delta / rbf.margin()).powi(3));
        assert_eq!(rbf.encode(edge + delta)[3], 0.0);
    }

    #[test]
    fn encode_tensor_slope_vanishes_at_support_boundary() {
        let rbf = basis();
        let edge = rbf.centers()[3] + rbf.margin();
        for d in [edge - 1e-6, edge + 1e-6] {
            let distance = Var::from_tensor(&Tensor::from_vec(vec![d], 1, &Device::Cpu).unwrap())
                .unwrap();
            let kernel = rbf
                .encode_tensor(distance.as_tensor())
                .unwrap()
                .narrow(1, 3, 1)
                .unwrap()
                .sum_all()
                .unwrap();
            let grads = kernel.backward().unwrap();
            let slope = grads.get(distance.as_tensor()).unwrap().to_vec1::<f64>().unwrap()[0];
            assert!(slope.abs() < 1e-4, "slope {slope} at {d}");
        }
    }

    #[test]
    fn encode_tensor_matches_scalar_encoding() {
        let rbf = basis();
        let distances = [0.05, 0.12, 0.2537, 0.399];
        let tensor = rbf.encode_all(&distances, &Device::Cpu).unwrap();
        let rows = tensor.to_vec2::<f64>().unwrap();
        for (row, &d) in rows.iter().zip(&distances) {
            for (a, b) in row.iter().zip(rbf.encode(d)) {
                assert!((a - b).abs() < TOLERANCE);
            }
        }
    }
}
