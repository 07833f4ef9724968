use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::api::models::{HealthResponse, PredictionRequest, PredictionResponse};
use crate::app_state::ModelState;
use crate::error::ApiError;
use crate::nlp::inference;
use crate::validation;

pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "NLP Manipulation Detector API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "predict": "/predict (POST)",
            "health": "/health (GET)",
            "root": "/ (GET)"
        }
    }))
}

/// Derived from the model state on every call, never cached.
pub async fn health(State(state): State<Arc<ModelState>>) -> Json<HealthResponse> {
    let model_loaded = state.is_ready().await;
    Json(HealthResponse {
        status: if model_loaded { "healthy" } else { "unhealthy" },
        model_loaded,
        device: state.device_name().to_string(),
    })
}

pub async fn predict(
    State(state): State<Arc<ModelState>>,
    Json(payload): Json<PredictionRequest>,
) -> Result<Json<PredictionResponse>, ApiError> {
    // Validation runs before any model work is attempted.
    let text = validation::validate(&payload.text)?;

    tracing::info!(
        "prediction request received (text length: {} chars)",
        text.chars().count()
    );

    let loaded = state.snapshot().await.ok_or(ApiError::NotReady)?;
    let device = state.device().clone();

    // Encode + forward are CPU-bound; keep them off the async workers so
    // health checks stay responsive during a long inference call.
    let prediction = tokio::task::spawn_blocking(move || {
        inference::classify(&text, &loaded.tokenizer, &*loaded.model, &device)
    })
    .await
    .map_err(|e| ApiError::Inference(e.to_string()))?
    .map_err(|e| ApiError::Inference(e.to_string()))?;

    tracing::info!(
        "prediction: {} (confidence: {:.4})",
        prediction.label.as_str(),
        prediction.confidence
    );

    Ok(Json(PredictionResponse {
        label: prediction.label,
        confidence: prediction.confidence,
    }))
}
