/// Database connection pool management
///
/// PostgreSQL pooling via sqlx. Rolo only tunes the URL and the pool size;
/// the remaining pool behavior (acquire timeout, idle recycling, pre-acquire
/// ping) is fixed here rather than configurable.
///
/// # Example
///
/// ```no_run
/// use rolo_core::db::pool::{create_pool, DatabaseConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = DatabaseConfig {
///         url: std::env::var("DATABASE_URL")?,
///         max_connections: 10,
///     };
///
///     let pool = create_pool(config).await?;
///
///     let row: (i64,) = sqlx::query_as("SELECT $1")
///         .bind(42i64)
///         .fetch_one(&pool)
///         .await?;
///
///     Ok(())
/// }
/// ```

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{debug, info};

/// Idle connections kept warm
const MIN_CONNECTIONS: u32 = 2;

/// Timeout for acquiring a connection from the pool
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

/// How long a connection may sit idle before being closed
const IDLE_TIMEOUT: Duration = Duration::from_secs(600);

/// Maximum lifetime of a connection before forced recycling
const MAX_LIFETIME: Duration = Duration::from_secs(1800);

/// Configuration for the database connection pool
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,
}

/// Creates and initializes a PostgreSQL connection pool
///
/// Connects with the given configuration and runs a health check before
/// returning, so a bad URL or an unreachable database fails at startup.
///
/// # Errors
///
/// Returns an error if the URL is invalid, the database is unreachable, or
/// the health check fails.
pub async fn create_pool(config: DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    info!(
        max_connections = config.max_connections,
        "Creating database connection pool"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(MIN_CONNECTIONS.min(config.max_connections))
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .idle_timeout(IDLE_TIMEOUT)
        .max_lifetime(MAX_LIFETIME)
        .test_before_acquire(true)
        .connect(&config.url)
        .await?;

    health_check(&pool).await?;

    info!("Database connection pool created");
    Ok(pool)
}

/// Performs a health check on the database connection
///
/// # Errors
///
/// Returns an error if the health check query fails.
pub async fn health_check(pool: &PgPool) -> Result<(), sqlx::Error> {
    debug!("Performing database health check");
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Snapshot of the pool's connection usage
#[derive(Debug, Clone)]
pub struct PoolStats {
    /// Number of connections currently in use
    pub active_connections: usize,

    /// Number of idle connections available
    pub idle_connections: usize,

    /// Total connections in the pool
    pub total_connections: usize,
}

/// Gets current pool statistics for the health endpoint
pub fn get_pool_stats(pool: &PgPool) -> PoolStats {
    let size = pool.size();
    let idle = pool.num_idle();

    PoolStats {
        active_connections: size.saturating_sub(idle as u32) as usize,
        idle_connections: idle,
        total_connections: size as usize,
    }
}

/// Gracefully closes the connection pool
///
/// Call during shutdown so in-flight queries drain before the process
/// exits.
pub async fn close_pool(pool: PgPool) {
    info!("Closing database connection pool");
    pool.close().await;
    info!("Database connection pool closed");
}
