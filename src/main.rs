use std::sync::Arc;

use anyhow::{Context, Error};
use tracing_subscriber::EnvFilter;

mod api;
mod app_state;
mod config;
mod error;
mod layers;
mod nlp;
#[cfg(test)]
mod test_support;
mod validation;

use app_state::ModelState;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cfg = config::ServiceConfig::from_env()?;

    let state = Arc::new(ModelState::new());
    tracing::info!(
        "starting up: loading model and tokenizer from {}",
        cfg.model_dir.display()
    );
    tracing::info!("using device: {}", state.device_name());

    // A failed load is fatal: the process must not serve with a
    // partially-initialized state.
    state
        .load(&cfg.model_dir)
        .await
        .context("model loading failed")?;

    let app = api::server::create_router(state.clone());

    let listener = tokio::net::TcpListener::bind(cfg.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", cfg.bind_addr))?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shutting down: cleaning up resources");
    state.unload().await;
    tracing::info!("shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", err);
    }
}
