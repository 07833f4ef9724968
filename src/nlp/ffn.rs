use candle_core::safetensors::MmapedSafetensors;
use candle_core::{Device, Result as CandleResult, Tensor};

use crate::layers::activation::Activation;
use crate::layers::layer::Layer;
use crate::layers::linear::LinearLayer;

pub struct FfnLayer {
    lin1: LinearLayer,
    lin2: LinearLayer,
    activation: Activation,
    device: Device,
}

impl FfnLayer {
    pub fn new(
        weights: &MmapedSafetensors,
        prefix: &str,
        device: Device,
        activation: Activation,
    ) -> CandleResult<Self> {
        let lin1 = LinearLayer::new(weights, &format!("{}.lin1", prefix), device.clone())?;
        let lin2 = LinearLayer::new(weights, &format!("{}.lin2", prefix), device.clone())?;

        Ok(Self {
            lin1,
            lin2,
            activation,
            device,
        })
    }
}

impl Layer for FfnLayer {
    fn forward(&self, input: &Tensor) -> CandleResult<Tensor> {
        let input = input.to_device(&self.device)?;
        let hidden = self.lin1.forward(&input)?;
        let activated = self.activation.apply(&hidden)?;
        self.lin2.forward(&activated)
    }
}
