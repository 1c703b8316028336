//! SQLite storage backend implementation
//!
//! This module provides a SQLite-based implementation of the `StorageBackend` trait.
//!
//! ## Features
//!
//! - **Embedded**: No separate database server required
//! - **WAL mode**: Readers never block on the writer and only see committed batches
//! - **Connection pooling**: Concurrent telemetry handlers each get a connection;
//!   SQLite serializes their write transactions
//! - **Migrations**: Automatic schema versioning with sqlx

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Pool, QueryBuilder, Row, Sqlite};
use tracing::{debug, info, instrument, warn};

use super::backend::{AlertQuery, HealthStatus, StorageBackend};
use super::error::{StorageError, StorageResult};
use super::schema::{
    AlertDetail, AlertHistoryBucket, AlertKind, AlertRow, AlertSummaryRow, BatchSummary,
    NewAlert, NewBatch, ReadingRow, StatsSummary,
};

const ALERT_COLUMNS: &str = "id, device_id, kind, event, device_timestamp, \
     accel_magnitude, accel_x, accel_y, received_at";

const READING_COLUMNS: &str =
    "device_id, batch_id, sample_index, calculated_timestamp, x, y, z";

/// SQLite storage backend
///
/// Owns the connection pool and the in-process batch id counter.
pub struct SqliteBackend {
    pool: Pool<Sqlite>,
    db_path: String,
    next_batch: AtomicI64,
}

impl SqliteBackend {
    /// Open (or create) the database at `db_path`
    ///
    /// This will:
    /// 1. Create the database file if it doesn't exist
    /// 2. Run migrations to create tables and indexes
    /// 3. Seed the batch id counter from `max(batch_id) + 1`
    #[instrument(skip_all)]
    pub async fn new(db_path: impl AsRef<Path>) -> StorageResult<Self> {
        let db_path_str = db_path.as_ref().to_string_lossy().to_string();

        info!("initializing SQLite backend at: {}", db_path_str);

        let options = SqliteConnectOptions::new()
            .filename(&db_path_str)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(30)); // Retry on lock contention

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        debug!("running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;

        let max_batch =
            sqlx::query_scalar::<_, Option<i64>>("SELECT MAX(batch_id) FROM sensor_readings")
                .fetch_one(&pool)
                .await?;
        let next_batch = max_batch.unwrap_or(0) + 1;

        info!("SQLite backend ready (next batch_id: {})", next_batch);

        Ok(Self {
            pool,
            db_path: db_path_str,
            next_batch: AtomicI64::new(next_batch),
        })
    }

    fn alert_from_row(row: &SqliteRow) -> StorageResult<AlertRow> {
        let kind_str: String = row.try_get("kind")?;
        let kind = AlertKind::parse(&kind_str)
            .ok_or_else(|| StorageError::CorruptRow(format!("unknown alert kind '{kind_str}'")))?;

        Ok(AlertRow {
            id: row.try_get("id")?,
            device_id: row.try_get("device_id")?,
            kind,
            event: row.try_get("event")?,
            device_timestamp: row.try_get("device_timestamp")?,
            magnitude: row.try_get("accel_magnitude")?,
            accel_x: row.try_get("accel_x")?,
            accel_y: row.try_get("accel_y")?,
            received_at: row.try_get("received_at")?,
        })
    }

    fn reading_from_row(row: &SqliteRow) -> StorageResult<ReadingRow> {
        Ok(ReadingRow {
            device_id: row.try_get("device_id")?,
            batch_id: row.try_get("batch_id")?,
            sample_index: row.try_get("sample_index")?,
            calculated_timestamp: row.try_get("calculated_timestamp")?,
            x: row.try_get("x")?,
            y: row.try_get("y")?,
            z: row.try_get("z")?,
        })
    }

    /// Append `<clause> device_id = ?` when a device filter is present
    fn filter_device<'a>(
        builder: &mut QueryBuilder<'a, Sqlite>,
        clause: &str,
        device_id: Option<&'a str>,
    ) {
        if let Some(device_id) = device_id {
            builder.push(clause).push("device_id = ").push_bind(device_id);
        }
    }

    async fn count(&self, sql: &str, clause: &str, device_id: Option<&str>) -> StorageResult<i64> {
        let mut builder = QueryBuilder::<Sqlite>::new(sql);
        Self::filter_device(&mut builder, clause, device_id);
        let count = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl StorageBackend for SqliteBackend {
    fn next_batch_id(&self) -> i64 {
        self.next_batch.fetch_add(1, Ordering::SeqCst)
    }

    #[instrument(skip(self, alert), fields(device_id = %alert.device_id, kind = %alert.kind()))]
    async fn insert_alert(&self, alert: NewAlert) -> StorageResult<()> {
        let kind = alert.kind();
        let (event, magnitude, accel_x, accel_y) = match alert.detail {
            AlertDetail::Crash { magnitude } => (None, Some(magnitude), None, None),
            AlertDetail::Warning {
                event,
                accel_x,
                accel_y,
            } => (Some(event), None, Some(accel_x), Some(accel_y)),
        };

        sqlx::query(
            r#"
            INSERT INTO alerts (
                device_id, kind, event, device_timestamp,
                accel_magnitude, accel_x, accel_y, received_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&alert.device_id)
        .bind(kind.as_str())
        .bind(event)
        .bind(alert.device_timestamp)
        .bind(magnitude)
        .bind(accel_x)
        .bind(accel_y)
        .bind(alert.received_at)
        .execute(&self.pool)
        .await?;

        debug!("alert stored");
        Ok(())
    }

    #[instrument(skip(self, batch), fields(batch_id = batch.batch_id, count = batch.samples.len()))]
    async fn insert_batch(&self, batch: NewBatch) -> StorageResult<usize> {
        if batch.samples.is_empty() {
            return Ok(0);
        }

        // One transaction per batch: readers see all of its rows or none
        let mut tx = self.pool.begin().await?;

        for (index, sample) in batch.samples.iter().enumerate() {
            // Dropping `tx` on this early return rolls the batch back
            let timestamp = batch.timestamp_of(index).ok_or_else(|| {
                StorageError::QueryFailed(format!(
                    "timestamp of sample {index} in batch {} overflows",
                    batch.batch_id
                ))
            })?;
            sqlx::query(
                r#"
                INSERT INTO sensor_readings (
                    device_id, batch_id, sample_index, batch_start_timestamp,
                    sample_rate_hz, calculated_timestamp, x, y, z, received_at
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&batch.device_id)
            .bind(batch.batch_id)
            .bind(index as i64)
            .bind(batch.batch_start_timestamp)
            .bind(i64::from(batch.sample_rate_hz))
            .bind(timestamp)
            .bind(sample.x)
            .bind(sample.y)
            .bind(sample.z)
            .bind(batch.received_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        debug!("batch committed");
        Ok(batch.samples.len())
    }

    #[instrument(skip(self))]
    async fn query_alerts(&self, query: AlertQuery) -> StorageResult<Vec<AlertRow>> {
        let mut builder =
            QueryBuilder::<Sqlite>::new(format!("SELECT {ALERT_COLUMNS} FROM alerts WHERE 1 = 1"));
        Self::filter_device(&mut builder, " AND ", query.device_id.as_deref());
        if let Some(kind) = query.kind {
            builder.push(" AND kind = ").push_bind(kind.as_str());
        }
        builder
            .push(" ORDER BY received_at DESC, id DESC LIMIT ")
            .push_bind(query.limit as i64);

        let rows = builder.build().fetch_all(&self.pool).await?;
        let alerts = rows
            .iter()
            .map(Self::alert_from_row)
            .collect::<StorageResult<Vec<_>>>()?;

        debug!("query returned {} alerts", alerts.len());
        Ok(alerts)
    }

    #[instrument(skip(self))]
    async fn alert_summary(&self, device_id: Option<&str>) -> StorageResult<Vec<AlertSummaryRow>> {
        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT kind, event, COUNT(*) AS count FROM alerts",
        );
        Self::filter_device(&mut builder, " WHERE ", device_id);
        builder.push(" GROUP BY kind, event ORDER BY kind, event");

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| {
                let kind_str: String = row.try_get("kind")?;
                let kind = AlertKind::parse(&kind_str).ok_or_else(|| {
                    StorageError::CorruptRow(format!("unknown alert kind '{kind_str}'"))
                })?;
                Ok(AlertSummaryRow {
                    kind,
                    event: row.try_get("event")?,
                    count: row.try_get("count")?,
                })
            })
            .collect()
    }

    #[instrument(skip(self))]
    async fn alert_history(
        &self,
        device_id: Option<&str>,
        hours: u32,
    ) -> StorageResult<Vec<AlertHistoryBucket>> {
        let cutoff = Utc::now().timestamp_millis() - i64::from(hours) * 60 * 60 * 1000;

        let mut builder = QueryBuilder::<Sqlite>::new(
            r#"
            SELECT
                strftime('%Y-%m-%d %H:00', received_at / 1000, 'unixepoch') AS hour,
                kind,
                COUNT(*) AS count
            FROM alerts
            WHERE received_at >= "#,
        );
        builder.push_bind(cutoff);
        Self::filter_device(&mut builder, " AND ", device_id);
        builder.push(" GROUP BY hour, kind ORDER BY hour ASC, kind ASC");

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| {
                let kind_str: String = row.try_get("kind")?;
                let kind = AlertKind::parse(&kind_str).ok_or_else(|| {
                    StorageError::CorruptRow(format!("unknown alert kind '{kind_str}'"))
                })?;
                Ok(AlertHistoryBucket {
                    hour: row.try_get("hour")?,
                    kind,
                    count: row.try_get("count")?,
                })
            })
            .collect()
    }

    #[instrument(skip(self))]
    async fn delete_alerts(&self, device_id: Option<&str>) -> StorageResult<u64> {
        let mut builder = QueryBuilder::<Sqlite>::new("DELETE FROM alerts");
        Self::filter_device(&mut builder, " WHERE ", device_id);

        let result = builder.build().execute(&self.pool).await?;
        let deleted = result.rows_affected();

        match device_id {
            Some(id) => info!("cleared {} alerts for device {}", deleted, id),
            None => info!("cleared all {} alerts", deleted),
        }
        Ok(deleted)
    }

    #[instrument(skip(self))]
    async fn query_batches(
        &self,
        device_id: Option<&str>,
        limit: usize,
    ) -> StorageResult<Vec<BatchSummary>> {
        let mut builder = QueryBuilder::<Sqlite>::new(
            r#"
            SELECT
                MIN(device_id) AS device_id,
                batch_id,
                MIN(batch_start_timestamp) AS batch_start_timestamp,
                MIN(sample_rate_hz) AS sample_rate_hz,
                COUNT(*) AS sample_count,
                MIN(received_at) AS received_at
            FROM sensor_readings"#,
        );
        Self::filter_device(&mut builder, " WHERE ", device_id);
        builder
            .push(" GROUP BY batch_id ORDER BY batch_id DESC LIMIT ")
            .push_bind(limit as i64);

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| {
                Ok(BatchSummary {
                    device_id: row.try_get("device_id")?,
                    batch_id: row.try_get("batch_id")?,
                    batch_start_timestamp: row.try_get("batch_start_timestamp")?,
                    sample_rate_hz: row.try_get("sample_rate_hz")?,
                    sample_count: row.try_get("sample_count")?,
                    received_at: row.try_get("received_at")?,
                })
            })
            .collect()
    }

    #[instrument(skip(self))]
    async fn query_readings(&self, batch_id: i64) -> StorageResult<Vec<ReadingRow>> {
        let sql = format!(
            "SELECT {READING_COLUMNS} FROM sensor_readings WHERE batch_id = ? ORDER BY sample_index ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(batch_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::reading_from_row).collect()
    }

    #[instrument(skip(self))]
    async fn query_latest_readings(
        &self,
        device_id: Option<&str>,
        limit: usize,
    ) -> StorageResult<Vec<ReadingRow>> {
        let mut builder =
            QueryBuilder::<Sqlite>::new(format!("SELECT {READING_COLUMNS} FROM sensor_readings"));
        Self::filter_device(&mut builder, " WHERE ", device_id);
        builder
            .push(" ORDER BY batch_id DESC, sample_index DESC LIMIT ")
            .push_bind(limit as i64);

        let rows = builder.build().fetch_all(&self.pool).await?;
        let mut readings = rows
            .iter()
            .map(Self::reading_from_row)
            .collect::<StorageResult<Vec<_>>>()?;

        // Newest rows were selected; hand them back oldest first
        readings.reverse();
        Ok(readings)
    }

    #[instrument(skip(self))]
    async fn query_stats(&self, device_id: Option<&str>) -> StorageResult<StatsSummary> {
        let total_alerts = self
            .count("SELECT COUNT(*) FROM alerts", " WHERE ", device_id)
            .await?;
        let crashes = self
            .count(
                "SELECT COUNT(*) FROM alerts WHERE kind = 'crash'",
                " AND ",
                device_id,
            )
            .await?;
        let total_readings = self
            .count("SELECT COUNT(*) FROM sensor_readings", " WHERE ", device_id)
            .await?;
        let total_batches = self
            .count(
                "SELECT COUNT(DISTINCT batch_id) FROM sensor_readings",
                " WHERE ",
                device_id,
            )
            .await?;

        Ok(StatsSummary {
            total_alerts,
            crashes,
            warnings: total_alerts - crashes,
            total_readings,
            total_batches,
        })
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> StorageResult<HealthStatus> {
        match sqlx::query("SELECT 1").fetch_one(&self.pool).await {
            Ok(_) => {
                let mut metadata = HashMap::new();
                metadata.insert("backend".to_string(), "sqlite".to_string());
                metadata.insert("db_path".to_string(), self.db_path.clone());

                Ok(HealthStatus {
                    healthy: true,
                    message: "SQLite backend operational".to_string(),
                    metadata,
                })
            }
            Err(e) => {
                warn!("health check failed: {}", e);
                Ok(HealthStatus {
                    healthy: false,
                    message: format!("health check failed: {}", e),
                    metadata: HashMap::new(),
                })
            }
        }
    }

    async fn close(&self) -> StorageResult<()> {
        info!("closing SQLite backend");
        self.pool.close().await;
        Ok(())
    }
}
