//! Topic-driven dispatch of device messages
//!
//! ## Message Flow
//!
//! ```text
//! (topic, payload) → classify topic → parse + validate → handler
//!                                                         ├─ alert     → registry.get_or_create + store.insert_alert
//!                                                         ├─ telemetry → store.next_batch_id + registry.get_or_create + store.insert_batch
//!                                                         └─ status    → registry.update_status
//! ```
//!
//! `handle` reports the outcome of one message as a `Result`. `process` is the
//! entry point of the ingest loop: it logs and discards errors, so one bad
//! message never stops the ones behind it.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::actors::messages::InboundMessage;
use crate::config::TopicConfig;
use crate::devices::DeviceRegistry;
use crate::storage::StorageBackend;
use crate::storage::schema::{AlertDetail, AlertKind, NewAlert, NewBatch};
use crate::util::ReceiveClock;

use super::error::IngestError;
use super::payload::DeviceMessage;

/// What a successfully handled message changed
#[derive(Debug, Clone, PartialEq)]
pub enum Ingested {
    Alert {
        device_id: String,
        kind: AlertKind,
    },
    Batch {
        device_id: String,
        batch_id: i64,
        rows: usize,
    },
    Status {
        device_id: String,
    },
}

/// Routes inbound messages to the registry and the durable store
///
/// Cheap to clone; clones share the store, registry and clock.
#[derive(Clone)]
pub struct Dispatcher {
    storage: Arc<dyn StorageBackend>,
    registry: DeviceRegistry,
    topics: TopicConfig,
    clock: Arc<ReceiveClock>,
}

impl Dispatcher {
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        registry: DeviceRegistry,
        topics: TopicConfig,
    ) -> Self {
        Self {
            storage,
            registry,
            topics,
            clock: Arc::new(ReceiveClock::new()),
        }
    }

    /// Handle one message and report what happened
    #[instrument(skip(self, payload), fields(bytes = payload.len()))]
    pub async fn handle(&self, topic: &str, payload: &[u8]) -> Result<Ingested, IngestError> {
        let received_at = self.clock.now_millis();
        let kind = self
            .topics
            .classify(topic)
            .ok_or_else(|| IngestError::UnknownTopic(topic.to_string()))?;

        match DeviceMessage::parse(kind, payload)? {
            DeviceMessage::CrashAlert {
                device_id,
                device_timestamp,
                magnitude,
            } => {
                self.store_alert(NewAlert {
                    device_id,
                    device_timestamp,
                    received_at,
                    detail: AlertDetail::Crash { magnitude },
                })
                .await
            }
            DeviceMessage::WarningAlert {
                device_id,
                device_timestamp,
                event,
                accel_x,
                accel_y,
            } => {
                self.store_alert(NewAlert {
                    device_id,
                    device_timestamp,
                    received_at,
                    detail: AlertDetail::Warning {
                        event,
                        accel_x,
                        accel_y,
                    },
                })
                .await
            }
            DeviceMessage::TelemetryBatch {
                device_id,
                batch_start_timestamp,
                sample_rate_hz,
                declared_count,
                samples,
            } => {
                let batch_id = self.storage.next_batch_id();
                self.registry.get_or_create(&device_id);

                if usize::try_from(declared_count).ok() != Some(samples.len()) {
                    debug!(
                        "batch {batch_id} from {device_id} announced {declared_count} samples, carries {}",
                        samples.len()
                    );
                }

                let rows = self
                    .storage
                    .insert_batch(NewBatch {
                        device_id: device_id.clone(),
                        batch_id,
                        batch_start_timestamp,
                        sample_rate_hz,
                        samples,
                        received_at,
                    })
                    .await?;

                info!("telemetry from {device_id}: {rows} samples (batch_id: {batch_id})");
                Ok(Ingested::Batch {
                    device_id,
                    batch_id,
                    rows,
                })
            }
            DeviceMessage::StatusUpdate {
                device_id,
                thresholds,
            } => {
                self.registry.update_status(&device_id, thresholds);
                info!(
                    "status from {device_id}: crash={:?} braking={:?} accel={:?} cornering={:?}",
                    thresholds.crash, thresholds.braking, thresholds.accel, thresholds.cornering
                );
                Ok(Ingested::Status { device_id })
            }
        }
    }

    async fn store_alert(&self, alert: NewAlert) -> Result<Ingested, IngestError> {
        let device_id = alert.device_id.clone();
        let kind = alert.kind();

        self.registry.get_or_create(&device_id);
        self.storage.insert_alert(alert).await?;

        info!("alert from {device_id}: {kind}");
        Ok(Ingested::Alert { device_id, kind })
    }

    /// Handle one message, logging and discarding any error
    pub async fn process(&self, message: &InboundMessage) -> Option<Ingested> {
        match self.handle(&message.topic, &message.payload).await {
            Ok(ingested) => Some(ingested),
            Err(e) if e.is_payload_fault() => {
                warn!(topic = %message.topic, "dropping malformed message: {e}");
                None
            }
            Err(e) => {
                warn!(topic = %message.topic, "dropping message after store failure: {e}");
                None
            }
        }
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }
}
