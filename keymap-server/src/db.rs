//! PostgreSQL connection pool and migrations.
//!
//! The pool is created once at startup and handed to the registry; every
//! request checks out a connection per statement and returns it when the
//! statement completes.

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::Config;

/// Create the shared `PostgreSQL` connection pool.
pub async fn create_pool(config: &Config) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .min_connections(config.database_min_connections)
        // Bounds how long a request waits when every connection is busy
        .acquire_timeout(config.database_acquire_timeout())
        .test_before_acquire(true)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to PostgreSQL")?;

    info!(
        max_connections = config.database_max_connections,
        min_connections = config.database_min_connections,
        "database_pool_created"
    );

    Ok(pool)
}

/// Run the embedded migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("Failed to run database migrations")?;

    info!("database_migrations_complete");
    Ok(())
}
