use candle_core::safetensors::MmapedSafetensors;
use candle_core::{Device, IndexOp, Result as CandleResult, Tensor};

use crate::config::ModelConfig;
use crate::layers::activation::Activation;
use crate::layers::layer::Layer;
use crate::layers::linear::LinearLayer;
use crate::nlp::embeddings::EmbeddingsLayer;
use crate::nlp::transformer::TransformerLayer;

pub const NUM_LABELS: usize = 2;

pub trait Model {
    /// Forward pass over a batch of token ids, returning class logits
    /// of shape (batch, NUM_LABELS). `attention_mask` is 1.0 for real
    /// tokens and 0.0 for padding.
    fn forward(&self, input_ids: &Tensor, attention_mask: &Tensor) -> CandleResult<Tensor>;
    fn num_labels(&self) -> usize;
}

pub struct DistilBertClassifier {
    device: Device,
    embeddings: EmbeddingsLayer,
    encoder_layers: Vec<TransformerLayer>,
    pre_classifier: LinearLayer,
    classifier: LinearLayer,
}

impl DistilBertClassifier {
    pub fn new(
        weights: &MmapedSafetensors,
        config: &ModelConfig,
        device: &Device,
    ) -> CandleResult<Self> {
        let activation = Activation::parse(&config.activation)?;

        let embeddings = EmbeddingsLayer::new(weights, "distilbert.embeddings", device)?;

        let encoder_layers = (0..config.n_layers)
            .map(|layer_idx| {
                TransformerLayer::new(
                    weights,
                    &format!("distilbert.transformer.layer.{}", layer_idx),
                    config,
                    activation.clone(),
                    device,
                )
            })
            .collect::<CandleResult<Vec<_>>>()?;

        let pre_classifier = LinearLayer::new(weights, "pre_classifier", device.clone())?;
        let classifier = LinearLayer::new(weights, "classifier", device.clone())?;

        let head_labels = classifier.out_features()?;
        if head_labels != NUM_LABELS {
            return Err(candle_core::Error::msg(format!(
                "classifier head has {} output labels, expected {}",
                head_labels, NUM_LABELS
            )));
        }

        Ok(Self {
            device: device.clone(),
            embeddings,
            encoder_layers,
            pre_classifier,
            classifier,
        })
    }
}

impl Model for DistilBertClassifier {
    fn forward(&self, input_ids: &Tensor, attention_mask: &Tensor) -> CandleResult<Tensor> {
        let input_ids = input_ids.to_device(&self.device)?;
        let attention_mask = attention_mask.to_device(&self.device)?;

        // 1.0 -> 0.0 (attend), 0.0 -> -1e9 (padding), shaped (batch, 1, 1, seq)
        let additive_mask = attention_mask
            .affine(1e9, -1e9)?
            .unsqueeze(1)?
            .unsqueeze(1)?;

        let mut hidden_states = self.embeddings.forward(&input_ids)?;
        for layer in &self.encoder_layers {
            hidden_states = layer.forward(&hidden_states, &additive_mask)?;
        }

        // Pool the [CLS] position, then project through the classification head
        let cls = hidden_states.i((.., 0))?;
        let pooled = self.pre_classifier.forward(&cls)?.relu()?;
        let logits = self.classifier.forward(&pooled)?;

        Ok(logits)
    }

    fn num_labels(&self) -> usize {
        NUM_LABELS
    }
}
