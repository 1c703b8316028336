//! Storage backend trait definition
//!
//! This module defines the core `StorageBackend` trait that the ingestion
//! pipeline writes through and the query interface reads through.

use std::collections::HashMap;

use async_trait::async_trait;

use super::error::StorageResult;
use super::schema::{
    AlertHistoryBucket, AlertKind, AlertRow, AlertSummaryRow, BatchSummary, NewAlert, NewBatch,
    ReadingRow, StatsSummary,
};

/// Default number of alerts returned by `query_alerts`
pub const DEFAULT_ALERT_LIMIT: usize = 50;

/// Default number of readings returned by `query_latest_readings`
pub const DEFAULT_READING_LIMIT: usize = 500;

/// Default number of batches returned by `query_batches`
pub const DEFAULT_BATCH_LIMIT: usize = 10;

/// Default lookback window of `alert_history`
pub const DEFAULT_HISTORY_HOURS: u32 = 24;

/// Filter for alert listings
#[derive(Debug, Clone, Default)]
pub struct AlertQuery {
    /// Only alerts of this device
    pub device_id: Option<String>,

    /// Only alerts of this kind
    pub kind: Option<AlertKind>,

    /// Maximum number of alerts (newest first)
    pub limit: usize,
}

impl AlertQuery {
    pub fn new(limit: usize) -> Self {
        Self {
            device_id: None,
            kind: None,
            limit,
        }
    }

    pub fn device(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    pub fn kind(mut self, kind: AlertKind) -> Self {
        self.kind = Some(kind);
        self
    }
}

/// Health status of the storage backend
#[derive(Debug, Clone)]
pub struct HealthStatus {
    /// Is the backend operational?
    pub healthy: bool,

    /// Human-readable status message
    pub message: String,

    /// Additional backend-specific metadata
    pub metadata: HashMap<String, String>,
}

/// Trait for durable storage of alerts and sensor readings
///
/// ## Atomicity
///
/// `insert_alert` and `insert_batch` either apply completely or not at all.
/// A reader never observes a batch id with only part of its readings.
///
/// ## Batch identifiers
///
/// `next_batch_id` hands out strictly increasing ids for the lifetime of the
/// backend, starting above the largest id already persisted. Ids that are
/// handed out but never written leave gaps, which is acceptable.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync`; the dispatcher and the query
/// interface share one backend across tasks.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Reserve the next batch identifier
    fn next_batch_id(&self) -> i64;

    /// Insert a single alert row
    async fn insert_alert(&self, alert: NewAlert) -> StorageResult<()>;

    /// Insert all readings of one batch in one transaction
    ///
    /// Returns the number of reading rows written (`batch.samples.len()`).
    async fn insert_batch(&self, batch: NewBatch) -> StorageResult<usize>;

    /// Alerts, newest first
    async fn query_alerts(&self, query: AlertQuery) -> StorageResult<Vec<AlertRow>>;

    /// Alert counts grouped by (kind, event)
    async fn alert_summary(&self, device_id: Option<&str>) -> StorageResult<Vec<AlertSummaryRow>>;

    /// Hourly alert counts per kind over the last `hours` hours, oldest hour first
    async fn alert_history(
        &self,
        device_id: Option<&str>,
        hours: u32,
    ) -> StorageResult<Vec<AlertHistoryBucket>>;

    /// Delete alerts of one device, or of every device when `device_id` is `None`
    ///
    /// Returns the number of alerts deleted.
    async fn delete_alerts(&self, device_id: Option<&str>) -> StorageResult<u64>;

    /// Batch summaries, newest batch first
    async fn query_batches(
        &self,
        device_id: Option<&str>,
        limit: usize,
    ) -> StorageResult<Vec<BatchSummary>>;

    /// All readings of one batch ordered by sample index
    async fn query_readings(&self, batch_id: i64) -> StorageResult<Vec<ReadingRow>>;

    /// The newest `limit` readings, returned ascending by (batch_id, sample_index)
    async fn query_latest_readings(
        &self,
        device_id: Option<&str>,
        limit: usize,
    ) -> StorageResult<Vec<ReadingRow>>;

    /// Aggregate counts
    async fn query_stats(&self, device_id: Option<&str>) -> StorageResult<StatsSummary>;

    /// Check backend health
    ///
    /// Performs a lightweight operation to verify the backend
    /// is operational (e.g., ping database, check file access).
    async fn health_check(&self) -> StorageResult<HealthStatus>;

    /// Close the backend and release resources
    async fn close(&self) -> StorageResult<()>;
}
