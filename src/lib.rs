//! Ingestion hub for in-vehicle safety monitors
//!
//! Devices publish safety alerts, accelerometer telemetry batches and status
//! reports over MQTT. The hub classifies each message by topic, validates it,
//! persists alerts and readings in SQLite and tracks the last known state of
//! every device in memory. A small HTTP interface reads both back and can
//! push threshold commands to devices.

pub mod actors;
#[cfg(feature = "api")]
pub mod api;
pub mod config;
pub mod devices;
pub mod ingest;
pub mod storage;
pub mod transport;
pub mod util;
