//! API shared state

use std::sync::Arc;

use crate::actors::ingest::IngestHandle;
use crate::config::TopicConfig;
use crate::devices::DeviceRegistry;
use crate::storage::StorageBackend;
use crate::transport::CommandPublisher;

/// Shared state passed to all API handlers
#[derive(Clone)]
pub struct ApiState {
    /// Durable store, shared with the dispatcher
    pub storage: Arc<dyn StorageBackend>,

    /// Device registry, shared with the dispatcher
    pub registry: DeviceRegistry,

    /// Outbound command path to devices
    pub publisher: Arc<dyn CommandPublisher>,

    pub topics: TopicConfig,

    /// Handle to the ingest actor for pipeline counters
    pub ingest: Option<IngestHandle>,
}

impl ApiState {
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        registry: DeviceRegistry,
        publisher: Arc<dyn CommandPublisher>,
        topics: TopicConfig,
    ) -> Self {
        Self {
            storage,
            registry,
            publisher,
            topics,
            ingest: None,
        }
    }

    pub fn with_ingest(mut self, ingest: IngestHandle) -> Self {
        self.ingest = Some(ingest);
        self
    }
}
