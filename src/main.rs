use std::sync::Arc;

use air_quality_api::api;
use air_quality_api::config::Config;
use air_quality_api::state::AppState;
use anyhow::{Context, Result};

#[tokio::main]
async fn main() -> Result<()> {
    // Before the logger, so RUST_LOG may come from .env
    let dotenv_path = dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Some(path) = dotenv_path {
        log::debug!("Loaded environment from {}", path.display());
    }

    let config = Config::from_env()?;
    log::info!(
        "Dataset {} (persist: {})",
        config.data_path.display(),
        config.persist
    );

    let state = Arc::new(AppState::load(&config)?);
    let app = api::router(state.clone());

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    log::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    if state.storage().is_none() {
        log::warn!("Persistence disabled; in-memory changes are discarded");
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    log::info!("Shutting down");
}
