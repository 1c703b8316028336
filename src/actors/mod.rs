//! Channel-driven task wiring
//!
//! ## Architecture Overview
//!
//! ```text
//!   ┌───────────────┐   (topic, payload)   ┌──────────────┐
//!   │ MqttTransport │ ───────────────────→ │ IngestActor  │
//!   │ (event loop)  │   bounded mpsc       │ (Dispatcher) │
//!   └───────────────┘                      └──────┬───────┘
//!                                                 │
//!                               ┌─────────────────┴────────────┐
//!                               ▼                              ▼
//!                        DeviceRegistry                 StorageBackend
//!                               ▲                              ▲
//!                               └──────────── API ─────────────┘
//! ```
//!
//! ## Communication Patterns
//!
//! 1. **Inbound**: the transport pushes every broker message into a bounded
//!    channel; a full channel applies backpressure to the event loop
//! 2. **Commands**: the ingest actor has an mpsc command channel for control
//! 3. **Request/Response**: oneshot channels for synchronous queries

pub mod ingest;
pub mod messages;
