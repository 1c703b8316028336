//! MQTT transport built on rumqttc
//!
//! ## Connection lifecycle
//!
//! ```text
//! start → poll event loop ──ConnAck──→ subscribe alerts/telemetry/status
//!              │    ↑                        │
//!              │    └──── Publish ───────────┴──→ inbound channel → IngestActor
//!              │
//!              └─ error → wait reconnect interval → poll again (reconnects)
//! ```
//!
//! The session is clean, so subscriptions are re-issued on every ConnAck.
//! Reconnection never gives up; only `stop` ends the loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::actors::messages::InboundMessage;
use crate::config::{MqttConfig, TopicConfig};
use crate::util::client_id_suffix;

use super::{CommandPublisher, Qos, TransportError};

/// Telemetry batches of several hundred samples exceed the client default
const MAX_PACKET_SIZE: usize = 1024 * 1024;

/// Capacity of the client's outgoing request queue
const REQUEST_CAPACITY: usize = 64;

/// Handle to a running MQTT connection
pub struct MqttTransport {
    client: AsyncClient,
    connected: Arc<AtomicBool>,
    shutdown_tx: watch::Sender<bool>,
}

impl MqttTransport {
    /// Configure the client and spawn the event loop task
    ///
    /// Every inbound publish is forwarded to `inbound`. The returned
    /// `JoinHandle` completes after `stop` is called or `inbound` closes.
    pub fn start(
        config: &MqttConfig,
        inbound: mpsc::Sender<InboundMessage>,
    ) -> (Self, JoinHandle<()>) {
        let client_id = format!("{}-{}", config.client_id_prefix, client_id_suffix());
        info!("connecting to {}:{} as {}", config.host, config.port, client_id);

        let mut options = MqttOptions::new(client_id, &config.host, config.port);
        options.set_keep_alive(Duration::from_secs(config.keep_alive_secs));
        options.set_clean_session(true);
        options.set_max_packet_size(MAX_PACKET_SIZE, MAX_PACKET_SIZE);
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            options.set_credentials(username, password);
        }

        let (client, mut eventloop) = AsyncClient::new(options, REQUEST_CAPACITY);
        eventloop
            .network_options
            .set_connection_timeout(config.connect_timeout_secs);

        let connected = Arc::new(AtomicBool::new(false));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = EventLoopTask {
            client: client.clone(),
            eventloop,
            inbound,
            topics: config.topics.clone(),
            connected: connected.clone(),
            reconnect_interval: config.reconnect_interval(),
            shutdown_rx,
        };
        let handle = tokio::spawn(task.run());

        (
            Self {
                client,
                connected,
                shutdown_tx,
            },
            handle,
        )
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Stop the event loop; the connection is dropped
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

#[async_trait]
impl CommandPublisher for MqttTransport {
    #[instrument(skip(self, payload), fields(bytes = payload.len()))]
    async fn publish(&self, topic: &str, payload: Vec<u8>, qos: Qos) -> Result<(), TransportError> {
        if !self.is_connected() {
            warn!("cannot publish to {topic}: broker connection is down");
            return Err(TransportError::NotConnected);
        }

        self.client
            .publish(topic, qos.into(), false, payload)
            .await
            .inspect_err(|e| error!("failed to publish to {topic}: {e}"))?;
        Ok(())
    }
}

struct EventLoopTask {
    client: AsyncClient,
    eventloop: EventLoop,
    inbound: mpsc::Sender<InboundMessage>,
    topics: TopicConfig,
    connected: Arc<AtomicBool>,
    reconnect_interval: Duration,
    shutdown_rx: watch::Receiver<bool>,
}

impl EventLoopTask {
    async fn run(mut self) {
        loop {
            tokio::select! {
                _ = self.shutdown_rx.changed() => {
                    debug!("transport shutdown requested");
                    break;
                }

                event = self.eventloop.poll() => {
                    match event {
                        Ok(Event::Incoming(Packet::ConnAck(_))) => {
                            info!("connected to broker");
                            self.connected.store(true, Ordering::SeqCst);
                            self.subscribe_all();
                        }
                        Ok(Event::Incoming(Packet::Publish(publish))) => {
                            trace!("message on {} ({} bytes)", publish.topic, publish.payload.len());
                            let message = InboundMessage::new(publish.topic, publish.payload.to_vec());
                            if self.inbound.send(message).await.is_err() {
                                warn!("ingest channel closed, stopping transport");
                                break;
                            }
                        }
                        Ok(Event::Incoming(Packet::SubAck(ack))) => {
                            debug!("subscription confirmed (pkid {})", ack.pkid);
                        }
                        Ok(_) => {}
                        Err(e) => {
                            if self.connected.swap(false, Ordering::SeqCst) {
                                warn!("broker connection lost: {e}");
                            } else {
                                warn!("broker connection attempt failed: {e}");
                            }

                            tokio::select! {
                                _ = self.shutdown_rx.changed() => break,
                                _ = tokio::time::sleep(self.reconnect_interval) => {
                                    debug!("reconnecting to broker");
                                }
                            }
                        }
                    }
                }
            }
        }

        self.connected.store(false, Ordering::SeqCst);
        debug!("transport stopped");
    }

    fn subscribe_all(&self) {
        for (topic, qos) in self.topics.subscriptions() {
            match self.client.try_subscribe(topic, qos.into()) {
                Ok(()) => info!("subscribing to {topic} ({qos:?})"),
                Err(e) => error!("failed to subscribe to {topic}: {e}"),
            }
        }
    }
}
