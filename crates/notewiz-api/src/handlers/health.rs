use axum::{extract::State, http::StatusCode, Json};
use serde_json::json;
use tracing::warn;

use notewiz_core::logging::{component, subsystem};
use notewiz_db::PoolStats;

use crate::AppState;

/// Liveness plus a database round trip.
#[utoipa::path(get, path = "/health", tag = "System",
    responses((status = 200, description = "Healthy"), (status = 503, description = "Database unreachable")))]
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let pool = PoolStats::of(state.db.pool());
    if pool.is_saturated() {
        warn!(
            subsystem = subsystem::DB,
            component = component::POOL,
            pool_size = pool.size,
            "Connection pool has no idle connections"
        );
    }

    match sqlx::query("SELECT 1").execute(state.db.pool()).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "version": env!("CARGO_PKG_VERSION"),
                "pool": pool,
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "degraded", "error": e.to_string(), "pool": pool })),
        ),
    }
}
