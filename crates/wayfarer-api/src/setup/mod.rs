//! Application setup and initialization

pub mod database;
pub mod routes;
pub mod server;

use crate::auth::HttpIdentityProvider;
use crate::state::{AppState, HttpSettings, Stores};
use anyhow::{Context, Result};
use std::sync::Arc;
use wayfarer_core::Config;

/// Wires configuration, telemetry, database, storage and the identity client
/// into the shared state and router.
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    config
        .validate()
        .context("Configuration validation failed")?;

    crate::telemetry::init_telemetry(config.log_format(), config.environment())
        .context("Failed to initialize telemetry")?;
    crate::error::set_production_mode(config.is_production());
    tracing::info!("Configuration loaded and validated successfully");

    let pool = database::setup_database(&config).await?;

    let storage = wayfarer_storage::create_storage(&config)
        .await
        .context("Failed to initialize storage")?;
    tracing::info!(backend = %storage.backend_type(), "Storage initialized");

    let identity = HttpIdentityProvider::new(
        config.identity_service_url(),
        config.identity_service_api_key(),
    )
    .context("Failed to build identity service client")?;

    let state = Arc::new(AppState::new(
        Stores::postgres(pool),
        Arc::new(identity),
        storage,
        HttpSettings::from_config(&config),
    ));

    let router = routes::setup_routes(config.cors_origins(), state.clone())?;

    Ok((state, router))
}
