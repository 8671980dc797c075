/// Health check endpoint
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
///   "status": "success",
///   "message": "Service is healthy",
///   "data": {
///     "status": "healthy",
///     "version": "0.1.0",
///     "database": "connected",
///     "lock_backend": "redis",
///     "pool": { "active_connections": 1, "idle_connections": 4, "total_connections": 5 }
///   }
/// }
/// ```

use crate::{
    app::AppState,
    envelope::{ok, ApiResponse},
    error::ApiResult,
};
use axum::extract::State;
use scopegate_shared::db::pool::{self, PoolStats};
use serde::Serialize;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "healthy" or "degraded"
    pub status: String,

    pub version: String,

    /// "connected" or "disconnected"
    pub database: String,

    /// Lock store in use ("redis" or "memory")
    pub lock_backend: String,

    pub pool: PoolStats,
}

/// Health check handler
///
/// Always answers 200; a failed database probe shows as `degraded`.
pub async fn health_check(State(state): State<AppState>) -> ApiResult<ApiResponse<HealthResponse>> {
    let connected = match pool::health_check(&state.db).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Health check database probe failed: {}", e);
            false
        }
    };

    let response = HealthResponse {
        status: if connected { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: if connected { "connected" } else { "disconnected" }.to_string(),
        lock_backend: state.locks.backend_name().to_string(),
        pool: pool::get_pool_stats(&state.db),
    };

    let message = if connected {
        "Service is healthy"
    } else {
        "Service is degraded"
    };

    Ok(ok(message, response))
}
