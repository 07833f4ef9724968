use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Error};
use serde::Deserialize;

/// DistilBERT `config.json`, as written by the training pipeline.
#[derive(Deserialize, Debug, Clone)]
#[allow(unused)]
pub struct ModelConfig {
    pub activation: String,
    pub architectures: Option<Vec<String>>,
    pub attention_dropout: f32,
    pub dim: usize,
    pub dropout: f32,
    pub hidden_dim: usize,
    pub initializer_range: f32,
    pub max_position_embeddings: usize,
    pub model_type: String,
    pub n_heads: usize,
    pub n_layers: usize,
    pub pad_token_id: u32,
    pub vocab_size: usize,
}

pub struct ServiceConfig {
    pub bind_addr: SocketAddr,
    pub model_dir: PathBuf,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, Error> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = std::env::var("PORT").unwrap_or_else(|_| "8000".to_string());
        let bind_addr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid HOST/PORT: {}:{}", host, port))?;

        let model_dir = std::env::var("MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("models/manipulation_detector_model"));

        Ok(Self {
            bind_addr,
            model_dir,
        })
    }
}
