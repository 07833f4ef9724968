use serde::{Deserialize, Serialize};

use crate::nlp::inference::Label;

#[derive(Debug, Deserialize)]
pub struct PredictionRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub label: Label,
    pub confidence: f32,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model_loaded: bool,
    pub device: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
}
