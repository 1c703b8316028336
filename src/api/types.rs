//! Request and response bodies of the query interface

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::actors::messages::IngestStats;
use crate::devices::{DeviceState, ThresholdKind};
use crate::storage::schema::{
    AlertHistoryBucket, AlertRow, AlertSummaryRow, BatchSummary, ReadingRow, StatsSummary,
};

/// Upper bound for any `limit` query parameter
pub const MAX_QUERY_LIMIT: usize = 10_000;

/// Upper bound for the `hours` parameter of the alert history
pub const MAX_HISTORY_HOURS: u32 = 24 * 30;

/// Accepted range of a threshold value sent to a device
pub const THRESHOLD_RANGE: std::ops::RangeInclusive<f64> = 0.0..=50.0;

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "ok" when the store answers, "degraded" otherwise
    pub status: String,
    pub storage: String,
    pub timestamp: String,
}

/// Device as listed by `GET /devices`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub device_id: String,
    pub connected: bool,
    pub last_update: DateTime<Utc>,
}

impl From<DeviceState> for DeviceInfo {
    fn from(state: DeviceState) -> Self {
        Self {
            device_id: state.device_id,
            connected: state.connected,
            last_update: state.last_update,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevicesResponse {
    pub devices: Vec<DeviceInfo>,
    pub count: usize,
}

/// Body of `POST /devices/:id/threshold`
///
/// Fields are optional so a missing one is reported as a validation error
/// rather than as a deserialization failure.
#[derive(Debug, Clone, Deserialize)]
pub struct ThresholdRequest {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdResponse {
    pub device_id: String,
    #[serde(rename = "type")]
    pub kind: ThresholdKind,
    pub value: f64,
    pub topic: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertsResponse {
    pub alerts: Vec<AlertRow>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertSummaryResponse {
    pub summary: Vec<AlertSummaryRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertHistoryResponse {
    pub hours: u32,
    pub history: Vec<AlertHistoryBucket>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadingsResponse {
    pub readings: Vec<ReadingRow>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchesResponse {
    pub batches: Vec<BatchSummary>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReadingsResponse {
    pub batch_id: i64,
    pub readings: Vec<ReadingRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    pub store: StatsSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingest: Option<IngestStats>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    pub deleted: u64,
}
