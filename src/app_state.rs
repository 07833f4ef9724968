use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Error};
use candle_core::safetensors::MmapedSafetensors;
use candle_core::Device;
use tokenizers::{Tokenizer, TruncationParams};
use tokio::sync::RwLock;

use crate::config::ModelConfig;
use crate::nlp::inference::MAX_SEQUENCE_LENGTH;
use crate::nlp::models::{DistilBertClassifier, Model};

/// Tokenizer and model, loaded together or not at all.
pub struct LoadedModel {
    pub tokenizer: Tokenizer,
    pub model: Box<dyn Model + Send + Sync>,
}

impl LoadedModel {
    /// Reads `config.json`, `tokenizer.json` and `model.safetensors` from the
    /// artifact directory and builds the classifier on the given device.
    pub fn from_dir(model_dir: &Path, device: &Device) -> Result<Self, Error> {
        let config_path = model_dir.join("config.json");
        let cfg: ModelConfig = serde_json::from_reader(
            File::open(&config_path)
                .with_context(|| format!("failed to open {}", config_path.display()))?,
        )
        .with_context(|| format!("failed to parse {}", config_path.display()))?;

        let tokenizer_path = model_dir.join("tokenizer.json");
        tracing::info!("loading tokenizer from {}", tokenizer_path.display());
        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!(e))
            .with_context(|| format!("failed to load {}", tokenizer_path.display()))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_SEQUENCE_LENGTH,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!(e))
            .context("failed to configure tokenizer truncation")?;

        let weights_path = model_dir.join("model.safetensors");
        tracing::info!("loading model weights from {}", weights_path.display());
        let weights = unsafe { MmapedSafetensors::new(&weights_path) }
            .with_context(|| format!("failed to load {}", weights_path.display()))?;

        let model = DistilBertClassifier::new(&weights, &cfg, device)
            .context("failed to build classifier from weights")?;

        Ok(Self {
            tokenizer,
            model: Box::new(model),
        })
    }
}

/// Process-wide model state. Mutated twice in the happy path: set at startup,
/// cleared at shutdown. Requests take an `Arc` snapshot under a read lock and
/// run inference without holding it, so they never observe a half-set pair.
pub struct ModelState {
    loaded: RwLock<Option<Arc<LoadedModel>>>,
    device: Device,
}

impl ModelState {
    pub fn new() -> Self {
        Self {
            loaded: RwLock::new(None),
            device: Device::Cpu,
        }
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn device_name(&self) -> &'static str {
        match self.device {
            Device::Cpu => "cpu",
            _ => "unknown",
        }
    }

    /// Loads the artifacts and installs them atomically. On failure nothing
    /// is installed and the error is returned for the caller to treat as
    /// fatal; there is no partial retry inside the process.
    pub async fn load(&self, model_dir: &Path) -> Result<(), Error> {
        let loaded = LoadedModel::from_dir(model_dir, &self.device)?;
        self.install(loaded).await;
        tracing::info!("model and tokenizer loaded successfully");
        Ok(())
    }

    pub(crate) async fn install(&self, loaded: LoadedModel) {
        *self.loaded.write().await = Some(Arc::new(loaded));
    }

    /// Idempotently drops the tokenizer and model handles.
    pub async fn unload(&self) {
        *self.loaded.write().await = None;
    }

    pub async fn is_ready(&self) -> bool {
        self.loaded.read().await.is_some()
    }

    pub async fn snapshot(&self) -> Option<Arc<LoadedModel>> {
        self.loaded.read().await.clone()
    }
}
