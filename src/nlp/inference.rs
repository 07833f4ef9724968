use candle_core::{Device, Result as CandleResult, Tensor};
use candle_nn::ops::softmax;
use serde::Serialize;
use tokenizers::Tokenizer;

use crate::nlp::models::Model;

/// DistilBERT max sequence length; longer inputs are truncated by the tokenizer.
pub const MAX_SEQUENCE_LENGTH: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Neutral,
    Manipulative,
    Unknown,
}

impl Label {
    /// Class index to label. An index outside the trained head (unreachable
    /// with a 2-label model) maps to `Unknown` instead of failing.
    pub fn from_class_index(index: usize) -> Self {
        match index {
            0 => Label::Neutral,
            1 => Label::Manipulative,
            _ => Label::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Neutral => "neutral",
            Label::Manipulative => "manipulative",
            Label::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub label: Label,
    pub confidence: f32,
}

/// Text to token ids plus attention mask.
pub trait TextEncoder {
    fn encode_ids(&self, text: &str) -> CandleResult<(Vec<u32>, Vec<u32>)>;
}

impl TextEncoder for Tokenizer {
    fn encode_ids(&self, text: &str) -> CandleResult<(Vec<u32>, Vec<u32>)> {
        let encoding = self
            .encode(text, true)
            .map_err(|e| candle_core::Error::msg(e.to_string()))?;
        Ok((
            encoding.get_ids().to_vec(),
            encoding.get_attention_mask().to_vec(),
        ))
    }
}

pub fn classify(
    text: &str,
    encoder: &dyn TextEncoder,
    model: &dyn Model,
    device: &Device,
) -> CandleResult<Prediction> {
    let (ids, mask) = encoder.encode_ids(text)?;
    if ids.is_empty() {
        return Err(candle_core::Error::msg("tokenizer produced no tokens"));
    }

    let seq_len = ids.len();
    let input_ids = Tensor::from_vec(ids, (1, seq_len), device)?;
    let mask = mask.iter().map(|&m| m as f32).collect::<Vec<f32>>();
    let attention_mask = Tensor::from_vec(mask, (1, seq_len), device)?;

    let logits = model.forward(&input_ids, &attention_mask)?;

    let probabilities = softmax(&logits, candle_core::D::Minus1)?
        .squeeze(0)?
        .to_vec1::<f32>()?;

    let (class_index, confidence) = probabilities
        .iter()
        .enumerate()
        .fold((0, f32::MIN), |best, (index, &p)| {
            if p > best.1 {
                (index, p)
            } else {
                best
            }
        });

    Ok(Prediction {
        label: Label::from_class_index(class_index),
        confidence: round_confidence(confidence),
    })
}

fn round_confidence(confidence: f32) -> f32 {
    (confidence * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    struct CharCodeEncoder {
        calls: AtomicUsize,
    }

    impl CharCodeEncoder {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl TextEncoder for CharCodeEncoder {
        fn encode_ids(&self, text: &str) -> CandleResult<(Vec<u32>, Vec<u32>)> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let ids = text.chars().map(|c| c as u32).collect::<Vec<u32>>();
            let mask = vec![1u32; ids.len()];
            Ok((ids, mask))
        }
    }

    struct FixedLogitsModel {
        logits: [f32; 2],
        calls: AtomicUsize,
    }

    impl FixedLogitsModel {
        fn new(logits: [f32; 2]) -> Self {
            Self {
                logits,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Model for FixedLogitsModel {
        fn forward(&self, _input_ids: &Tensor, _attention_mask: &Tensor) -> CandleResult<Tensor> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Tensor::from_vec(self.logits.to_vec(), (1, 2), &Device::Cpu)
        }

        fn num_labels(&self) -> usize {
            2
        }
    }

    /// Logits derived from the first two token ids, so each concurrent
    /// request has an output traceable to its own input.
    struct EchoModel;

    impl Model for EchoModel {
        fn forward(&self, input_ids: &Tensor, _attention_mask: &Tensor) -> CandleResult<Tensor> {
            let ids = input_ids.to_vec2::<u32>()?;
            let logits = vec![ids[0][0] as f32 / 100.0, ids[0][1] as f32 / 100.0];
            Tensor::from_vec(logits, (1, 2), &Device::Cpu)
        }

        fn num_labels(&self) -> usize {
            2
        }
    }

    #[test]
    fn maps_class_indices_to_labels() {
        assert_eq!(Label::from_class_index(0), Label::Neutral);
        assert_eq!(Label::from_class_index(1), Label::Manipulative);
        assert_eq!(Label::from_class_index(7), Label::Unknown);
    }

    #[test]
    fn picks_max_probability_class() {
        let encoder = CharCodeEncoder::new();
        let model = FixedLogitsModel::new([0.1, 2.3]);

        let prediction = classify("some text", &encoder, &model, &Device::Cpu).unwrap();

        assert_eq!(prediction.label, Label::Manipulative);
        assert!(prediction.confidence > 0.5 && prediction.confidence <= 1.0);
    }

    #[test]
    fn confidence_is_rounded_to_four_decimals() {
        let encoder = CharCodeEncoder::new();
        let model = FixedLogitsModel::new([1.7, -0.3]);

        let prediction = classify("some text", &encoder, &model, &Device::Cpu).unwrap();

        let rescaled = prediction.confidence * 10_000.0;
        assert!((rescaled - rescaled.round()).abs() < 1e-3);
    }

    #[test]
    fn class_probabilities_sum_to_one() {
        let logits = Tensor::from_vec(vec![1.7f32, -0.3], (1, 2), &Device::Cpu).unwrap();
        let probabilities = softmax(&logits, candle_core::D::Minus1)
            .unwrap()
            .squeeze(0)
            .unwrap()
            .to_vec1::<f32>()
            .unwrap();

        let sum: f32 = probabilities.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert!(probabilities.iter().all(|&p| (0.0..=1.0).contains(&p)));
    }

    #[test]
    fn identical_input_yields_identical_prediction() {
        let encoder = CharCodeEncoder::new();
        let model = FixedLogitsModel::new([0.4, 0.9]);

        let first = classify("the same text", &encoder, &model, &Device::Cpu).unwrap();
        let second = classify("the same text", &encoder, &model, &Device::Cpu).unwrap();

        assert_eq!(first.label, second.label);
        assert_eq!(first.confidence, second.confidence);
    }

    #[test]
    fn encodes_and_runs_forward_exactly_once_per_call() {
        let encoder = CharCodeEncoder::new();
        let model = FixedLogitsModel::new([0.4, 0.9]);

        classify("some text", &encoder, &model, &Device::Cpu).unwrap();

        assert_eq!(encoder.calls.load(Ordering::SeqCst), 1);
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn concurrent_calls_keep_results_tied_to_their_input() {
        let model = Arc::new(EchoModel);

        let handles = (0..8)
            .map(|i| {
                let model = Arc::clone(&model);
                // "abc" -> logits favor index 1, "cba" -> index 0
                let (text, expected) = if i % 2 == 0 {
                    ("abc", Label::Manipulative)
                } else {
                    ("cba", Label::Neutral)
                };
                std::thread::spawn(move || {
                    let encoder = CharCodeEncoder::new();
                    let prediction =
                        classify(text, &encoder, model.as_ref(), &Device::Cpu).unwrap();
                    (prediction, expected)
                })
            })
            .collect::<Vec<_>>();

        for handle in handles {
            let (prediction, expected) = handle.join().unwrap();
            assert_eq!(prediction.label, expected);
            assert!((0.0..=1.0).contains(&prediction.confidence));
        }
    }
}
