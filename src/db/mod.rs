//! Database connection and pool management
//!
//! PostgreSQL pooling and embedded migrations for the RentHub backend.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

use crate::config::Config;

/// Database connection error
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Failed to connect to database: {0}")]
    Connection(String),

    #[error("Failed to run migrations: {0}")]
    Migration(String),

    #[error("Database health check failed: {0}")]
    HealthCheck(String),
}

/// Create a database connection pool and verify it answers
pub async fn create_pool(config: &Config) -> Result<PgPool, DbError> {
    tracing::info!("Connecting to database at {}", config.database_url_masked());

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect(&config.database_url)
        .await
        .map_err(|e| DbError::Connection(e.to_string()))?;

    check_health(&pool).await?;
    tracing::info!("Database connection pool ready");

    Ok(pool)
}

/// Run the embedded migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), DbError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| DbError::Migration(e.to_string()))?;

    tracing::info!("Database migrations up to date");
    Ok(())
}

/// Check database connectivity (used by /health)
pub async fn check_health(pool: &PgPool) -> Result<(), DbError> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await
        .map_err(|e| DbError::HealthCheck(e.to_string()))?;

    Ok(())
}
