//! Durable storage for alerts and sensor readings
//!
//! This module provides a trait-based abstraction over the persistent store.
//!
//! ## Design
//!
//! - **Trait-based**: `StorageBackend` lets the dispatcher and the query
//!   interface share one store behind `Arc<dyn StorageBackend>`
//! - **Async**: All I/O operations are async for compatibility with Tokio tasks
//! - **Batch-atomic**: every telemetry batch commits in a single transaction
//!
//! ## Usage
//!
//! ```no_run
//! use drive_monitor::storage::{StorageBackend, sqlite::SqliteBackend};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let backend = SqliteBackend::new("./driving_monitor.db").await?;
//!     let batch_id = backend.next_batch_id();
//!     println!("next batch: {batch_id}");
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod error;
pub mod schema;
pub mod sqlite;

pub use backend::{AlertQuery, StorageBackend};
pub use error::{StorageError, StorageResult};
pub use schema::{AlertKind, AlertRow, NewAlert, NewBatch, ReadingRow, Sample, StatsSummary};
