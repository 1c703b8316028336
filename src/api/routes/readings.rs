//! Sensor reading endpoints

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use super::clamp_limit;
use crate::{
    api::{
        error::{ApiError, ApiResult},
        state::ApiState,
        types::{BatchReadingsResponse, BatchesResponse, ReadingsResponse},
    },
    storage::backend::{DEFAULT_BATCH_LIMIT, DEFAULT_READING_LIMIT},
};

#[derive(Debug, Deserialize)]
pub struct ReadingsParams {
    device: Option<String>,
    limit: Option<usize>,
}

/// GET /api/v1/readings/latest
///
/// The newest readings in chronological order (default: 500)
pub async fn latest_readings(
    State(state): State<ApiState>,
    Query(params): Query<ReadingsParams>,
) -> ApiResult<Json<ReadingsResponse>> {
    let limit = clamp_limit(params.limit, DEFAULT_READING_LIMIT);
    let readings = state
        .storage
        .query_latest_readings(params.device.as_deref(), limit)
        .await?;

    Ok(Json(ReadingsResponse {
        count: readings.len(),
        readings,
    }))
}

/// GET /api/v1/readings/batches
///
/// Newest batches first (default: 10)
pub async fn list_batches(
    State(state): State<ApiState>,
    Query(params): Query<ReadingsParams>,
) -> ApiResult<Json<BatchesResponse>> {
    let limit = clamp_limit(params.limit, DEFAULT_BATCH_LIMIT);
    let batches = state
        .storage
        .query_batches(params.device.as_deref(), limit)
        .await?;

    Ok(Json(BatchesResponse {
        count: batches.len(),
        batches,
    }))
}

/// GET /api/v1/readings/batches/:batch_id
pub async fn batch_readings(
    State(state): State<ApiState>,
    Path(batch_id): Path<i64>,
) -> ApiResult<Json<BatchReadingsResponse>> {
    let readings = state.storage.query_readings(batch_id).await?;
    if readings.is_empty() {
        return Err(ApiError::NotFound(format!("batch {batch_id} not found")));
    }

    Ok(Json(BatchReadingsResponse { batch_id, readings }))
}
