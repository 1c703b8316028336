//! Alert endpoints

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;

use super::clamp_limit;
use crate::{
    api::{
        error::{ApiError, ApiResult},
        state::ApiState,
        types::{AlertHistoryResponse, AlertSummaryResponse, AlertsResponse, MAX_HISTORY_HOURS},
    },
    storage::{
        AlertKind, AlertQuery,
        backend::{DEFAULT_ALERT_LIMIT, DEFAULT_HISTORY_HOURS},
    },
};

/// Query parameters for alert listings
#[derive(Debug, Deserialize)]
pub struct AlertsParams {
    device: Option<String>,

    /// `crash` or `warning`
    kind: Option<String>,

    /// Max results (default: 50)
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct DeviceParams {
    device: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    device: Option<String>,

    /// Lookback window in hours (default: 24)
    hours: Option<u32>,
}

/// GET /api/v1/alerts
///
/// Newest alerts first, optionally filtered by device and kind
pub async fn list_alerts(
    State(state): State<ApiState>,
    Query(params): Query<AlertsParams>,
) -> ApiResult<Json<AlertsResponse>> {
    let mut query = AlertQuery::new(clamp_limit(params.limit, DEFAULT_ALERT_LIMIT));
    if let Some(device) = params.device {
        query = query.device(device);
    }
    if let Some(kind) = params.kind {
        let kind = AlertKind::parse(&kind)
            .ok_or_else(|| ApiError::InvalidRequest(format!("unknown alert kind '{kind}'")))?;
        query = query.kind(kind);
    }

    let alerts = state.storage.query_alerts(query).await?;

    Ok(Json(AlertsResponse {
        count: alerts.len(),
        alerts,
    }))
}

/// GET /api/v1/alerts/summary
pub async fn alert_summary(
    State(state): State<ApiState>,
    Query(params): Query<DeviceParams>,
) -> ApiResult<Json<AlertSummaryResponse>> {
    let summary = state
        .storage
        .alert_summary(params.device.as_deref())
        .await?;

    Ok(Json(AlertSummaryResponse { summary }))
}

/// GET /api/v1/alerts/history
///
/// Hourly alert counts, oldest hour first
pub async fn alert_history(
    State(state): State<ApiState>,
    Query(params): Query<HistoryParams>,
) -> ApiResult<Json<AlertHistoryResponse>> {
    let hours = params
        .hours
        .unwrap_or(DEFAULT_HISTORY_HOURS)
        .min(MAX_HISTORY_HOURS);

    let history = state
        .storage
        .alert_history(params.device.as_deref(), hours)
        .await?;

    Ok(Json(AlertHistoryResponse { hours, history }))
}
