//! Message transport between devices and the hub
//!
//! The transport owns the broker connection. Inbound messages are pushed as
//! (topic, payload) pairs into a bounded channel consumed by the ingest actor;
//! outbound device commands go through the `CommandPublisher` trait so the
//! query interface never depends on the concrete client.

pub mod mqtt;

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use crate::config::TopicConfig;
use crate::devices::ThresholdKind;

/// Delivery guarantee of a subscription or publish
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Qos {
    AtMostOnce,
    AtLeastOnce,
}

impl From<Qos> for rumqttc::QoS {
    fn from(value: Qos) -> Self {
        match value {
            Qos::AtMostOnce => rumqttc::QoS::AtMostOnce,
            Qos::AtLeastOnce => rumqttc::QoS::AtLeastOnce,
        }
    }
}

/// Which ingestion handler a topic belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicKind {
    Alerts,
    Telemetry,
    Status,
}

/// Errors raised by the transport
#[derive(Debug)]
pub enum TransportError {
    /// The broker connection is currently down
    NotConnected,

    /// The client refused the request (queue closed or full)
    Client(String),

    /// The command could not be encoded
    Encoding(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::NotConnected => write!(f, "not connected to broker"),
            TransportError::Client(msg) => write!(f, "broker client error: {}", msg),
            TransportError::Encoding(msg) => write!(f, "failed to encode command: {}", msg),
        }
    }
}

impl std::error::Error for TransportError {}

impl From<rumqttc::ClientError> for TransportError {
    fn from(err: rumqttc::ClientError) -> Self {
        TransportError::Client(err.to_string())
    }
}

/// Outbound publish primitive
///
/// A failed publish is reported to the caller and never retried here.
#[async_trait]
pub trait CommandPublisher: Send + Sync {
    async fn publish(&self, topic: &str, payload: Vec<u8>, qos: Qos) -> Result<(), TransportError>;
}

/// `set_threshold` command as sent to a device
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SetThreshold {
    cmd: &'static str,
    #[serde(rename = "type")]
    pub kind: ThresholdKind,
    pub value: f64,
}

impl SetThreshold {
    pub fn new(kind: ThresholdKind, value: f64) -> Self {
        Self {
            cmd: "set_threshold",
            kind,
            value,
        }
    }
}

/// Publish a threshold change to `<commands>/<device_id>` at-least-once
pub async fn send_threshold(
    publisher: &dyn CommandPublisher,
    topics: &TopicConfig,
    device_id: &str,
    command: &SetThreshold,
) -> Result<(), TransportError> {
    let topic = topics.command_topic(device_id);
    let payload =
        serde_json::to_vec(command).map_err(|e| TransportError::Encoding(e.to_string()))?;

    publisher.publish(&topic, payload, Qos::AtLeastOnce).await?;

    info!("command to {device_id}: {}={}", command.kind, command.value);
    Ok(())
}
