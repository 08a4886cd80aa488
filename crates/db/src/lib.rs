//! PostgreSQL/PostGIS access for the backscatter comparison pipeline.
//!
//! Statements are assembled in [`statements`] from validated identifiers;
//! every literal value is a bound parameter. Repositories in
//! [`repositories`] execute them.

use sqlx::postgres::PgPoolOptions;

pub mod config;
pub mod error;
pub mod models;
pub mod repositories;
pub mod statements;
pub mod swap;

pub use config::{ConnectionTarget, DatabaseConfig};
pub use error::DbError;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from resolved settings.
pub async fn create_pool(config: &DatabaseConfig) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect_with(config.connect_options()?)
        .await
}

/// Verify the server answers a trivial query.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// PostGIS version string; fails when the extension is not installed.
pub async fn postgis_version(pool: &DbPool) -> Result<String, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT postgis_full_version()")
        .fetch_one(pool)
        .await
}
