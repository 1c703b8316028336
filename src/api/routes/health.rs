//! Health check endpoint

use axum::{Json, extract::State};
use tracing::warn;

use crate::api::{state::ApiState, types::HealthResponse};

/// GET /api/v1/health
///
/// Reports whether the durable store answers. Always 200; the body carries
/// the verdict.
pub async fn health_check(State(state): State<ApiState>) -> Json<HealthResponse> {
    let (status, storage) = match state.storage.health_check().await {
        Ok(health) if health.healthy => ("ok", health.message),
        Ok(health) => ("degraded", health.message),
        Err(e) => {
            warn!("storage health check failed: {e}");
            ("degraded", e.to_string())
        }
    };

    Json(HealthResponse {
        status: status.to_string(),
        storage,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}
