use candle_core::safetensors::MmapedSafetensors;
use candle_core::{Device, Result as CandleResult, Tensor};

use crate::layers::embedding::EmbeddingLayer;
use crate::layers::layer::Layer;
use crate::layers::layer_norm::LayerNormLayer;

/// DistilBERT has no configurable layer norm epsilon, 1e-12 is fixed.
pub const LAYER_NORM_EPS: f64 = 1e-12;

pub struct EmbeddingsLayer {
    word_embeddings: EmbeddingLayer,
    position_embeddings: EmbeddingLayer,
    layer_norm: LayerNormLayer,
    device: Device,
}

impl EmbeddingsLayer {
    pub fn new(
        weights: &MmapedSafetensors,
        prefix: &str,
        device: &Device,
    ) -> CandleResult<Self> {
        let word_embeddings =
            EmbeddingLayer::new(weights, device, &format!("{}.word_embeddings", prefix))?;
        let position_embeddings =
            EmbeddingLayer::new(weights, device, &format!("{}.position_embeddings", prefix))?;
        let layer_norm = LayerNormLayer::new(
            weights,
            &format!("{}.LayerNorm", prefix),
            device,
            LAYER_NORM_EPS,
        )?;

        Ok(Self {
            word_embeddings,
            position_embeddings,
            layer_norm,
            device: device.clone(),
        })
    }

    pub fn forward(&self, input_ids: &Tensor) -> CandleResult<Tensor> {
        let input_ids = input_ids.to_device(&self.device)?;
        let (_batch_size, seq_length) = input_ids.dims2()?;

        let position_ids =
            Tensor::arange(0u32, seq_length as u32, &self.device)?.unsqueeze(0)?;

        let word = self.word_embeddings.forward(&input_ids)?;
        let position = self.position_embeddings.forward(&position_ids)?;

        let embeddings = word.broadcast_add(&position)?;
        self.layer_norm.forward(&embeddings)
    }
}
