//! Aggregate statistics endpoints

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use tracing::info;

use crate::api::{
    error::ApiResult,
    state::ApiState,
    types::{ResetResponse, StatsResponse},
};

#[derive(Debug, Deserialize)]
pub struct StatsParams {
    device: Option<String>,
}

/// GET /api/v1/stats
///
/// Store aggregates, plus the ingest counters when the pipeline is running
pub async fn get_stats(
    State(state): State<ApiState>,
    Query(params): Query<StatsParams>,
) -> ApiResult<Json<StatsResponse>> {
    let store = state.storage.query_stats(params.device.as_deref()).await?;

    let ingest = match &state.ingest {
        Some(handle) => handle.get_stats().await,
        None => None,
    };

    Ok(Json(StatsResponse {
        timestamp: chrono::Utc::now().to_rfc3339(),
        device: params.device,
        store,
        ingest,
    }))
}

/// POST /api/v1/stats/reset
///
/// Deletes alerts of one device, or all alerts. Readings are kept.
pub async fn reset_stats(
    State(state): State<ApiState>,
    Query(params): Query<StatsParams>,
) -> ApiResult<Json<ResetResponse>> {
    let deleted = state.storage.delete_alerts(params.device.as_deref()).await?;

    match &params.device {
        Some(device) => info!("reset {deleted} alerts of {device}"),
        None => info!("reset {deleted} alerts"),
    }

    Ok(Json(ResetResponse {
        device: params.device,
        deleted,
    }))
}
