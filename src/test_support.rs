use ahash::AHashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use candle_core::{Device, Result as CandleResult, Tensor};
use tokenizers::models::wordlevel::WordLevel;
use tokenizers::pre_tokenizers::whitespace::Whitespace;
use tokenizers::Tokenizer;

use crate::app_state::LoadedModel;
use crate::nlp::models::Model;

/// Stand-in for the classifier: fixed logits, with a call counter so tests
/// can assert whether the model was invoked at all.
pub struct CountingModel {
    logits: [f32; 2],
    calls: Arc<AtomicUsize>,
}

impl Model for CountingModel {
    fn forward(&self, _input_ids: &Tensor, _attention_mask: &Tensor) -> CandleResult<Tensor> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Tensor::from_vec(self.logits.to_vec(), (1, 2), &Device::Cpu)
    }

    fn num_labels(&self) -> usize {
        2
    }
}

/// A small word-level tokenizer; unknown words map to `[UNK]`.
pub fn word_level_tokenizer() -> Tokenizer {
    let vocab: AHashMap<String, u32> = [("[UNK]", 0), ("hello", 1), ("world", 2)]
        .into_iter()
        .map(|(word, id)| (word.to_string(), id))
        .collect();
    let model = WordLevel::builder()
        .vocab(vocab)
        .unk_token("[UNK]".to_string())
        .build()
        .unwrap();

    let mut tokenizer = Tokenizer::new(model);
    tokenizer.with_pre_tokenizer(Some(Whitespace {}));
    tokenizer
}

pub fn loaded_model_with_logits(logits: [f32; 2]) -> LoadedModel {
    let (loaded, _calls) = counting_loaded_model(logits);
    loaded
}

pub fn counting_loaded_model(logits: [f32; 2]) -> (LoadedModel, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let loaded = LoadedModel {
        tokenizer: word_level_tokenizer(),
        model: Box::new(CountingModel {
            logits,
            calls: Arc::clone(&calls),
        }),
    };
    (loaded, calls)
}
