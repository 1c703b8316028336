//! Device message schemas
//!
//! Each topic carries one JSON shape. Payloads are first deserialized into a
//! permissive raw struct (every field optional) and then validated into one
//! of the strict `DeviceMessage` variants, so that a missing field is reported
//! by name instead of as a generic serde error.

use serde::Deserialize;

use crate::devices::Thresholds;
use crate::storage::schema::{Sample, calculated_timestamp};
use crate::transport::TopicKind;

use super::error::IngestError;

/// Device id used when a payload does not name its device
pub const UNKNOWN_DEVICE: &str = "unknown";

/// A validated inbound message
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceMessage {
    CrashAlert {
        device_id: String,
        device_timestamp: i64,
        magnitude: f64,
    },
    WarningAlert {
        device_id: String,
        device_timestamp: i64,
        event: String,
        accel_x: f64,
        accel_y: f64,
    },
    TelemetryBatch {
        device_id: String,
        batch_start_timestamp: i64,
        sample_rate_hz: u32,
        /// Count announced by the device; informational only
        declared_count: i64,
        samples: Vec<Sample>,
    },
    StatusUpdate {
        device_id: String,
        thresholds: Thresholds,
    },
}

impl DeviceMessage {
    /// Parse and validate `payload` as the schema carried by `topic`
    pub fn parse(topic: TopicKind, payload: &[u8]) -> Result<Self, IngestError> {
        match topic {
            TopicKind::Alerts => parse_alert(payload),
            TopicKind::Telemetry => parse_telemetry(payload),
            TopicKind::Status => parse_status(payload),
        }
    }

    pub fn device_id(&self) -> &str {
        match self {
            DeviceMessage::CrashAlert { device_id, .. }
            | DeviceMessage::WarningAlert { device_id, .. }
            | DeviceMessage::TelemetryBatch { device_id, .. }
            | DeviceMessage::StatusUpdate { device_id, .. } => device_id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawAlert {
    #[serde(rename = "type")]
    kind: Option<String>,
    ts: Option<i64>,
    mag: Option<f64>,
    event: Option<String>,
    x: Option<f64>,
    y: Option<f64>,
    dev: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawTelemetry {
    ts: Option<i64>,
    rate: Option<i64>,
    n: Option<i64>,
    d: Option<Vec<[f64; 3]>>,
    dev: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawStatus {
    dev: Option<String>,
    crash: Option<f64>,
    braking: Option<f64>,
    accel: Option<f64>,
    cornering: Option<f64>,
}

fn decode<'a, T: Deserialize<'a>>(payload: &'a [u8]) -> Result<T, IngestError> {
    serde_json::from_slice(payload).map_err(|e| IngestError::MalformedJson(e.to_string()))
}

fn required<T>(value: Option<T>, field: &'static str) -> Result<T, IngestError> {
    value.ok_or(IngestError::MissingField(field))
}

fn device_id(dev: Option<String>) -> String {
    dev.filter(|id| !id.is_empty())
        .unwrap_or_else(|| UNKNOWN_DEVICE.to_string())
}

fn parse_alert(payload: &[u8]) -> Result<DeviceMessage, IngestError> {
    let raw: RawAlert = decode(payload)?;
    let kind = required(raw.kind, "type")?;

    match kind.as_str() {
        "crash" => Ok(DeviceMessage::CrashAlert {
            device_timestamp: required(raw.ts, "ts")?,
            magnitude: required(raw.mag, "mag")?,
            device_id: device_id(raw.dev),
        }),
        "warning" => Ok(DeviceMessage::WarningAlert {
            device_timestamp: required(raw.ts, "ts")?,
            event: required(raw.event, "event")?,
            accel_x: required(raw.x, "x")?,
            accel_y: required(raw.y, "y")?,
            device_id: device_id(raw.dev),
        }),
        _ => Err(IngestError::UnknownAlertType(kind)),
    }
}

fn parse_telemetry(payload: &[u8]) -> Result<DeviceMessage, IngestError> {
    let raw: RawTelemetry = decode(payload)?;

    let batch_start_timestamp = required(raw.ts, "ts")?;
    let rate = required(raw.rate, "rate")?;
    let declared_count = required(raw.n, "n")?;
    let samples = required(raw.d, "d")?;

    let sample_rate_hz = u32::try_from(rate)
        .ok()
        .filter(|rate| *rate > 0)
        .ok_or_else(|| IngestError::InvalidField {
            field: "rate",
            reason: format!("sample rate must be a positive integer, got {rate}"),
        })?;

    // Timestamps grow with the index, so the last sample bounds the batch
    if let Some(last) = samples.len().checked_sub(1) {
        calculated_timestamp(batch_start_timestamp, last, sample_rate_hz).ok_or_else(|| {
            IngestError::InvalidField {
                field: "ts",
                reason: format!(
                    "timestamp of sample {last} overflows from start {batch_start_timestamp}"
                ),
            }
        })?;
    }

    Ok(DeviceMessage::TelemetryBatch {
        device_id: device_id(raw.dev),
        batch_start_timestamp,
        sample_rate_hz,
        declared_count,
        samples: samples.into_iter().map(Sample::from).collect(),
    })
}

fn parse_status(payload: &[u8]) -> Result<DeviceMessage, IngestError> {
    let raw: RawStatus = decode(payload)?;

    Ok(DeviceMessage::StatusUpdate {
        device_id: device_id(raw.dev),
        thresholds: Thresholds {
            crash: raw.crash,
            braking: raw.braking,
            accel: raw.accel,
            cornering: raw.cornering,
        },
    })
}
