/// Health check endpoint
///
/// Verifies the server is running and the database is reachable.
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "database": "connected",
///   "pool": { "active": 1, "idle": 4, "total": 5 }
/// }
/// ```

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Json};
use rolo_core::db::pool::get_pool_stats;
use serde::{Deserialize, Serialize};

/// Connection pool snapshot in the health response
#[derive(Debug, Serialize, Deserialize)]
pub struct PoolHealth {
    /// Connections currently in use
    pub active: usize,

    /// Idle connections available
    pub idle: usize,

    /// Total connections
    pub total: usize,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Application version
    pub version: String,

    /// Database status
    pub database: String,

    /// Pool statistics
    pub pool: PoolHealth,
}

/// Health check handler
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let database_status = match sqlx::query("SELECT 1").fetch_one(&state.db).await {
        Ok(_) => "connected",
        Err(_) => "disconnected",
    };

    let stats = get_pool_stats(&state.db);

    Ok(Json(HealthResponse {
        status: if database_status == "connected" {
            "healthy".to_string()
        } else {
            "degraded".to_string()
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: database_status.to_string(),
        pool: PoolHealth {
            active: stats.active_connections,
            idle: stats.idle_connections,
            total: stats.total_connections,
        },
    }))
}
