//! PostgreSQL pool and schema migrations

use anyhow::{Context, Result};
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::path::PathBuf;
use std::time::Duration;
use wayfarer_core::Config;

const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(10 * 60);
const POOL_MAX_LIFETIME: Duration = Duration::from_secs(30 * 60);

/// SQL files shared by every crate, kept at the workspace root.
fn migrations_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../migrations")
}

pub async fn setup_database(config: &Config) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections())
        .acquire_timeout(Duration::from_secs(config.db_timeout_seconds()))
        .idle_timeout(POOL_IDLE_TIMEOUT)
        .max_lifetime(POOL_MAX_LIFETIME)
        .connect(config.database_url())
        .await
        .context("Could not open the PostgreSQL pool")?;
    tracing::info!(
        max_connections = config.db_max_connections(),
        "PostgreSQL pool ready"
    );

    run_migrations(&pool).await?;
    Ok(pool)
}

/// Applies the CRM, referral and admin schema files that have not run yet.
async fn run_migrations(pool: &PgPool) -> Result<()> {
    let dir = migrations_dir();
    let migrator = Migrator::new(dir.clone())
        .await
        .with_context(|| format!("Could not read migrations from {}", dir.display()))?;
    migrator
        .run(pool)
        .await
        .context("Schema migration failed")?;
    tracing::info!(
        migrations = migrator.iter().count(),
        "Schema up to date"
    );
    Ok(())
}
