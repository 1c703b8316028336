//! Ingestion of device messages
//!
//! - `payload`: JSON schemas per topic, validated into `DeviceMessage`
//! - `dispatcher`: routes validated messages to the registry and the store
//! - `error`: per-message `IngestError`

pub mod dispatcher;
pub mod error;
pub mod payload;

pub use dispatcher::{Dispatcher, Ingested};
pub use error::IngestError;
pub use payload::{DeviceMessage, UNKNOWN_DEVICE};
