use candle_core::safetensors::MmapedSafetensors;
use candle_core::{Device, Result as CandleResult, Tensor};

use crate::config::ModelConfig;
use crate::layers::activation::Activation;
use crate::layers::layer::Layer;
use crate::layers::layer_norm::LayerNormLayer;
use crate::nlp::attention::SelfAttentionLayer;
use crate::nlp::embeddings::LAYER_NORM_EPS;
use crate::nlp::ffn::FfnLayer;

pub struct TransformerLayer {
    pub attention: SelfAttentionLayer,
    pub ffn: FfnLayer,
    pub sa_norm: LayerNormLayer,
    pub output_norm: LayerNormLayer,
    pub device: Device,
}

impl TransformerLayer {
    pub fn new(
        weights: &MmapedSafetensors,
        prefix: &str,
        config: &ModelConfig,
        activation: Activation,
        device: &Device,
    ) -> CandleResult<Self> {
        let attention = SelfAttentionLayer::new(
            weights,
            &format!("{}.attention", prefix),
            config.n_heads,
            config.dim,
            device.clone(),
        )?;

        let ffn = FfnLayer::new(
            weights,
            &format!("{}.ffn", prefix),
            device.clone(),
            activation,
        )?;

        let sa_norm = LayerNormLayer::new(
            weights,
            &format!("{}.sa_layer_norm", prefix),
            device,
            LAYER_NORM_EPS,
        )?;

        let output_norm = LayerNormLayer::new(
            weights,
            &format!("{}.output_layer_norm", prefix),
            device,
            LAYER_NORM_EPS,
        )?;

        Ok(Self {
            attention,
            ffn,
            sa_norm,
            output_norm,
            device: device.clone(),
        })
    }

    // Post-norm residual blocks, as in the original DistilBERT layout.
    pub fn forward(&self, input: &Tensor, additive_mask: &Tensor) -> CandleResult<Tensor> {
        let input = input.to_device(&self.device)?;
        let attn_output = self.attention.forward(&input, additive_mask)?;
        let attn_residual = self.sa_norm.forward(&input.add(&attn_output)?)?;

        let ffn_output = self.ffn.forward(&attn_residual)?;
        self.output_norm.forward(&attn_residual.add(&ffn_output)?)
    }
}
