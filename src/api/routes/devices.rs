//! Device registry endpoints and device commands

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};

use crate::{
    api::{
        error::{ApiError, ApiResult},
        state::ApiState,
        types::{DeviceInfo, DevicesResponse, THRESHOLD_RANGE, ThresholdRequest, ThresholdResponse},
    },
    devices::{DeviceState, ThresholdKind},
    transport::{SetThreshold, send_threshold},
};

/// GET /api/v1/devices
pub async fn list_devices(State(state): State<ApiState>) -> Json<DevicesResponse> {
    let devices: Vec<DeviceInfo> = state
        .registry
        .list()
        .into_iter()
        .map(DeviceInfo::from)
        .collect();

    Json(DevicesResponse {
        count: devices.len(),
        devices,
    })
}

/// GET /api/v1/devices/:id/status
pub async fn get_device_status(
    State(state): State<ApiState>,
    Path(device_id): Path<String>,
) -> ApiResult<Json<DeviceState>> {
    state
        .registry
        .get(&device_id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("device '{device_id}' not found")))
}

/// POST /api/v1/devices/:id/threshold
///
/// The device does not have to be known to the registry; the command is
/// published either way.
pub async fn set_threshold(
    State(state): State<ApiState>,
    Path(device_id): Path<String>,
    body: Result<Json<ThresholdRequest>, JsonRejection>,
) -> ApiResult<Json<ThresholdResponse>> {
    let Json(request) = body?;
    let (kind, value) = validate_threshold(&request)?;

    send_threshold(
        state.publisher.as_ref(),
        &state.topics,
        &device_id,
        &SetThreshold::new(kind, value),
    )
    .await?;

    Ok(Json(ThresholdResponse {
        topic: state.topics.command_topic(&device_id),
        device_id,
        kind,
        value,
    }))
}

fn validate_threshold(request: &ThresholdRequest) -> ApiResult<(ThresholdKind, f64)> {
    let kind = request
        .kind
        .as_deref()
        .and_then(ThresholdKind::parse)
        .ok_or_else(|| ApiError::InvalidRequest("invalid threshold type".to_string()))?;

    let value = request
        .value
        .filter(|value| THRESHOLD_RANGE.contains(value))
        .ok_or_else(|| {
            ApiError::InvalidRequest("value must be a number between 0 and 50".to_string())
        })?;

    Ok((kind, value))
}
