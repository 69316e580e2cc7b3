//! Postgres connection pool.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::{DbError, StoreConfig};

/// Type alias for the shared Postgres pool handed to the store.
pub type DbPool = PgPool;

/// Create a new connection pool from `config`.
///
/// `max_connections` controls the pool ceiling and `acquire_timeout` how long
/// a call waits for a free connection.
pub async fn create_pool(config: &StoreConfig) -> Result<DbPool, DbError> {
    info!(
        "Connecting to database (max_connections={}, acquire_timeout={:?})",
        config.max_connections, config.acquire_timeout
    );
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect(&config.database_url)
        .await?;
    Ok(pool)
}
