use candle_core::{Module, Result, Tensor};
use candle_nn::{Linear, VarBuilder, linear, ops::sigmoid};

/// Learned gating of an alchemical lambda.
///
/// `scale(λ) = λ · σ(W2 swish(W1 λ))`, so `scale(0) = 0` exactly and `scale(λ) ≤ λ`.
#[derive(Debug, Clone)]
pub struct LambdaScale {
    hidden: Linear,
    output: Linear,
}

impl LambdaScale {
    /// Weights are read from `0` and `2` under `vb`.
    pub fn new(width: usize, vb: VarBuilder) -> Result<Self> {
        Ok(Self {
            hidden: linear(1, width, vb.pp("0"))?,
            output: linear(width, 1, vb.pp("2"))?,
        })
    }

    /// Scales a `[M]` tensor of lambdas.
    pub fn forward(&self, lambdas: &Tensor) -> Result<Tensor> {
        let column = lambdas.unsqueeze(1)?;
        let gate = sigmoid(&self.output.forward(&self.hidden.forward(&column)?.silu()?)?)?;
        lambdas.mul(&gate.squeeze(1)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::VarMap;

    fn scale() -> LambdaScale {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F64, &Device::Cpu);
        LambdaScale::new(16, vb).unwrap()
    }

    #[test]
    fn zero_lambda_scales_to_exactly_zero() {
        let lambdas = Tensor::from_vec(vec![0.0, 0.0], 2, &Device::Cpu).unwrap();
        let scaled = scale().forward(&lambdas).unwrap().to_vec1::<f64>().unwrap();
        assert_eq!(scaled, vec![0.0, 0.0]);
    }

    #[test]
    fn scaled_lambda_lies_between_zero_and_lambda() {
        let values = vec![0.1, 0.5, 1.0];
        let lambdas = Tensor::from_vec(values.clone(), 3, &Device::Cpu).unwrap();
        let scaled = scale().forward(&lambdas).unwrap().to_vec1::<f64>().unwrap();
        for (s, l) in scaled.iter().zip(values) {
            assert!(*s > 0.0 && *s < l);
        }
    }
}
