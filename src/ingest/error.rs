//! Per-message ingestion errors

use std::fmt;

use crate::storage::StorageError;

/// Why a single inbound message was not ingested
#[derive(Debug)]
pub enum IngestError {
    /// Topic is not one of the subscribed ingestion topics
    UnknownTopic(String),

    /// Payload is not valid JSON (or not a JSON object)
    MalformedJson(String),

    /// A required field is absent or null
    MissingField(&'static str),

    /// A field is present but has the wrong type or range
    InvalidField {
        field: &'static str,
        reason: String,
    },

    /// Alert `type` is neither `crash` nor `warning`
    UnknownAlertType(String),

    /// The durable store rejected the write
    Storage(StorageError),
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestError::UnknownTopic(topic) => write!(f, "no handler for topic '{}'", topic),
            IngestError::MalformedJson(msg) => write!(f, "malformed JSON payload: {}", msg),
            IngestError::MissingField(field) => write!(f, "missing required field '{}'", field),
            IngestError::InvalidField { field, reason } => {
                write!(f, "invalid field '{}': {}", field, reason)
            }
            IngestError::UnknownAlertType(kind) => write!(f, "unknown alert type '{}'", kind),
            IngestError::Storage(err) => write!(f, "storage write failed: {}", err),
        }
    }
}

impl std::error::Error for IngestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IngestError::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StorageError> for IngestError {
    fn from(err: StorageError) -> Self {
        IngestError::Storage(err)
    }
}

impl IngestError {
    /// Payload faults are the device's problem; storage faults are ours
    pub fn is_payload_fault(&self) -> bool {
        !matches!(self, IngestError::Storage(_))
    }
}
