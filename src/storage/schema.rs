//! Row definitions for the two durable tables
//!
//! ## Layout
//!
//! - `alerts`: one row per crash or warning event. Crash rows carry
//!   `accel_magnitude`, warning rows carry `event`, `accel_x` and `accel_y`.
//! - `sensor_readings`: one row per accelerometer sample. Batch metadata
//!   (`device_id`, `batch_start_timestamp`, `sample_rate_hz`, `received_at`) is
//!   denormalized onto every row, so a batch exists exactly when at least one
//!   row carries its `batch_id`.
//!
//! Write-side types (`NewAlert`, `NewBatch`) keep the crash/warning split in the
//! type system. Read-side types (`AlertRow`, `ReadingRow`, ...) mirror the
//! flat column layout and serialize straight into API responses.

use serde::{Deserialize, Serialize};

/// Kind of a safety alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Crash,
    Warning,
}

impl AlertKind {
    /// Column representation (matches the serde format)
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::Crash => "crash",
            AlertKind::Warning => "warning",
        }
    }

    /// Parse the column representation back into a kind
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "crash" => Some(AlertKind::Crash),
            "warning" => Some(AlertKind::Warning),
            _ => None,
        }
    }
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-specific payload of an alert
#[derive(Debug, Clone, PartialEq)]
pub enum AlertDetail {
    /// Crash: acceleration magnitude only
    Crash { magnitude: f64 },

    /// Warning: sub-classification plus planar acceleration
    Warning {
        event: String,
        accel_x: f64,
        accel_y: f64,
    },
}

/// An alert ready to be inserted
#[derive(Debug, Clone, PartialEq)]
pub struct NewAlert {
    pub device_id: String,

    /// Device tick at which the event was detected
    pub device_timestamp: i64,

    /// Wall-clock milliseconds assigned at ingestion
    pub received_at: i64,

    pub detail: AlertDetail,
}

impl NewAlert {
    pub fn kind(&self) -> AlertKind {
        match self.detail {
            AlertDetail::Crash { .. } => AlertKind::Crash,
            AlertDetail::Warning { .. } => AlertKind::Warning,
        }
    }
}

/// A persisted alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRow {
    pub id: i64,
    pub device_id: String,
    pub kind: AlertKind,
    pub event: Option<String>,
    pub device_timestamp: i64,
    pub magnitude: Option<f64>,
    pub accel_x: Option<f64>,
    pub accel_y: Option<f64>,
    pub received_at: i64,
}

/// One accelerometer sample as transmitted by the device
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl From<[f64; 3]> for Sample {
    fn from([x, y, z]: [f64; 3]) -> Self {
        Self { x, y, z }
    }
}

/// A telemetry batch ready to be inserted
#[derive(Debug, Clone, PartialEq)]
pub struct NewBatch {
    pub device_id: String,
    pub batch_id: i64,

    /// Device tick of the first sample
    pub batch_start_timestamp: i64,

    /// Always > 0, enforced when the payload is parsed
    pub sample_rate_hz: u32,

    /// Samples in transmission order; position is the sample index
    pub samples: Vec<Sample>,

    pub received_at: i64,
}

impl NewBatch {
    /// Timestamp of the sample at `sample_index` within this batch, `None` on overflow
    pub fn timestamp_of(&self, sample_index: usize) -> Option<i64> {
        calculated_timestamp(self.batch_start_timestamp, sample_index, self.sample_rate_hz)
    }
}

/// Device tick of a sample, derived from its batch metadata
///
/// `batch_start + floor(sample_index * 1000 / sample_rate_hz)`. Both operands
/// are non-negative, so integer division is the floor. Returns `None` when the
/// result does not fit in an `i64` or the rate is zero.
pub fn calculated_timestamp(
    batch_start: i64,
    sample_index: usize,
    sample_rate_hz: u32,
) -> Option<i64> {
    let offset = i64::try_from(sample_index)
        .ok()?
        .checked_mul(1000)?
        .checked_div(i64::from(sample_rate_hz))?;
    batch_start.checked_add(offset)
}

/// A persisted sensor reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingRow {
    pub device_id: String,
    pub batch_id: i64,
    pub sample_index: i64,
    pub calculated_timestamp: i64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Aggregated view of one batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub device_id: String,
    pub batch_id: i64,
    pub batch_start_timestamp: i64,
    pub sample_rate_hz: i64,
    pub sample_count: i64,
    pub received_at: i64,
}

/// Alert count grouped by kind and event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertSummaryRow {
    pub kind: AlertKind,
    pub event: Option<String>,
    pub count: i64,
}

/// Alert count within one wall-clock hour (UTC)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertHistoryBucket {
    /// Hour label, formatted `YYYY-MM-DD HH:00`
    pub hour: String,
    pub kind: AlertKind,
    pub count: i64,
}

/// Aggregate counts over the whole store, or one device
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsSummary {
    pub total_alerts: i64,
    pub crashes: i64,
    pub warnings: i64,
    pub total_readings: i64,
    pub total_batches: i64,
}
