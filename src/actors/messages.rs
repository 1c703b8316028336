//! Message types for task communication
//!
//! ## Design Principles
//!
//! 1. **Inbound**: opaque (topic, payload) pairs pushed by the transport into a
//!    bounded mpsc channel and consumed by a single ingest actor
//! 2. **Commands**: control messages sent to the ingest actor via its own mpsc
//! 3. **Request/Response**: oneshot channels for synchronous queries

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

/// One message as delivered by the broker
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl InboundMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// Commands that can be sent to the IngestActor
#[derive(Debug)]
pub enum IngestCommand {
    /// Get ingestion counters
    GetStats {
        respond_to: oneshot::Sender<IngestStats>,
    },

    /// Drain the inbound channel and stop, answering with the final counters
    Shutdown {
        respond_to: oneshot::Sender<IngestStats>,
    },
}

/// Ingestion counters since process start
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestStats {
    /// Messages taken off the inbound channel
    pub received: u64,

    /// Messages that reached the store or the registry
    pub stored: u64,

    /// Messages dropped after a payload or storage fault
    pub dropped: u64,
}
