//! Application setup and initialization
//!
//! Everything `main` needs to go from a loaded [`Config`] to a router:
//! telemetry, the metadata store, the storage backend, services and routes.

pub mod database;
pub mod routes;
pub mod server;
pub mod services;
pub mod storage;

use crate::state::AppState;
use anyhow::{Context, Result};
use std::sync::Arc;
use tubely_core::Config;
use tubely_processing::TokioProcessRunner;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    config.validate().context("Configuration validation failed")?;

    crate::telemetry::init_telemetry(config.is_production())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!(
        environment = %config.environment(),
        "Configuration loaded and validated successfully"
    );

    let repository = database::setup_repository(&config).await?;
    let storage = storage::setup_storage(&config).await?;

    let state = services::build_state(
        config.clone(),
        repository,
        storage,
        Arc::new(TokioProcessRunner::new()),
    )?;

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
