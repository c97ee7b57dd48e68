//! Application setup and initialization
//!
//! Wires configuration, telemetry, the database pool, storage and the insight service
//! into an [`AppState`] and builds the router.

pub mod database;
pub mod routes;
pub mod server;
pub mod validation;

use crate::state::AppState;
use anyhow::{Context, Result};
use drumnote_core::Config;
use drumnote_services::DrumInsightService;
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    validation::validate_config(&config).context("Configuration validation failed")?;

    crate::telemetry::init_telemetry(&config.log_format)?;
    tracing::info!(
        environment = %config.environment,
        "Configuration loaded and validated successfully"
    );

    let pool = database::setup_database(&config).await?;

    let storage = drumnote_storage::create_storage(&config)
        .await
        .context("Failed to initialize storage")?;

    let insights = DrumInsightService::from_config(&config.openai)
        .context("Failed to initialize insight service")?;

    let state = Arc::new(AppState::new(&config, pool, storage, insights));
    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
