use candle_core::safetensors::MmapedSafetensors;
use candle_core::{Device, Result as CandleResult, Tensor};

use crate::layers::layer::Layer;

pub struct LayerNormLayer {
    weights: Tensor,
    bias: Tensor,
    eps: f64,
    device: Device,
}

impl LayerNormLayer {
    pub fn new(
        weights_map: &MmapedSafetensors,
        prefix: &str,
        device: &Device,
        eps: f64,
    ) -> CandleResult<Self> {
        let weights = weights_map
            .load(&format!("{}.weight", prefix), device)?
            .to_dtype(candle_core::DType::F32)?;
        let bias = weights_map
            .load(&format!("{}.bias", prefix), device)?
            .to_dtype(candle_core::DType::F32)?;

        Ok(Self {
            weights,
            bias,
            eps,
            device: device.clone(),
        })
    }
}

impl Layer for LayerNormLayer {
    fn forward(&self, input: &Tensor) -> CandleResult<Tensor> {
        let input = input.to_device(&self.device)?;

        let mean = input.mean_keepdim(candle_core::D::Minus1)?;
        let centered = input.broadcast_sub(&mean)?;
        let variance = centered.sqr()?.mean_keepdim(candle_core::D::Minus1)?;
        let std = variance.affine(1.0, self.eps)?.sqrt()?;

        let normed = centered.broadcast_div(&std)?;

        let out = normed
            .broadcast_mul(&self.weights)?
            .broadcast_add(&self.bias)?;

        Ok(out)
    }
}
