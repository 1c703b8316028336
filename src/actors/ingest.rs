//! IngestActor - Applies inbound device messages in arrival order
//!
//! ## Ordering
//!
//! A single actor consumes the inbound channel, so messages are handled one
//! at a time in the order the transport delivered them. The telemetry handler
//! draws its batch id and writes all of the batch's rows before the next
//! message is looked at, which keeps batches from interleaving.
//!
//! ## Shutdown
//!
//! `IngestCommand::Shutdown` closes the inbound channel, handles everything
//! that was already queued and replies with the final counters.

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, instrument, trace};

use super::messages::{InboundMessage, IngestCommand, IngestStats};
use crate::ingest::Dispatcher;

pub struct IngestActor {
    dispatcher: Dispatcher,

    /// Messages pushed by the transport
    inbound_rx: mpsc::Receiver<InboundMessage>,

    command_rx: mpsc::Receiver<IngestCommand>,

    stats: IngestStats,
}

impl IngestActor {
    pub fn new(
        dispatcher: Dispatcher,
        inbound_rx: mpsc::Receiver<InboundMessage>,
        command_rx: mpsc::Receiver<IngestCommand>,
    ) -> Self {
        Self {
            dispatcher,
            inbound_rx,
            command_rx,
            stats: IngestStats::default(),
        }
    }

    /// Run the actor's main loop
    #[instrument(skip(self))]
    pub async fn run(mut self) {
        debug!("starting ingest actor");
        let mut inbound_open = true;

        loop {
            tokio::select! {
                message = self.inbound_rx.recv(), if inbound_open => {
                    match message {
                        Some(message) => self.ingest(message).await,
                        None => {
                            debug!("inbound channel closed");
                            inbound_open = false;
                        }
                    }
                }

                command = self.command_rx.recv() => {
                    match command {
                        Some(IngestCommand::GetStats { respond_to }) => {
                            let _ = respond_to.send(self.stats.clone());
                        }
                        Some(IngestCommand::Shutdown { respond_to }) => {
                            self.drain().await;
                            let _ = respond_to.send(self.stats.clone());
                            break;
                        }
                        None => {
                            debug!("all ingest handles dropped");
                            self.drain().await;
                            break;
                        }
                    }
                }
            }
        }

        info!(
            "ingest actor stopped: {} received, {} stored, {} dropped",
            self.stats.received, self.stats.stored, self.stats.dropped
        );
    }

    async fn ingest(&mut self, message: InboundMessage) {
        self.stats.received += 1;
        match self.dispatcher.process(&message).await {
            Some(ingested) => {
                trace!("ingested {ingested:?}");
                self.stats.stored += 1;
            }
            None => self.stats.dropped += 1,
        }
    }

    async fn drain(&mut self) {
        self.inbound_rx.close();
        let mut drained = 0usize;
        while let Some(message) = self.inbound_rx.recv().await {
            self.ingest(message).await;
            drained += 1;
        }
        if drained > 0 {
            debug!("handled {drained} queued messages before stopping");
        }
    }
}

/// Handle for controlling the IngestActor
#[derive(Clone)]
pub struct IngestHandle {
    sender: mpsc::Sender<IngestCommand>,
}

impl IngestHandle {
    /// Spawn an ingest actor consuming `inbound_rx`
    pub fn spawn(dispatcher: Dispatcher, inbound_rx: mpsc::Receiver<InboundMessage>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        let actor = IngestActor::new(dispatcher, inbound_rx, cmd_rx);
        tokio::spawn(actor.run());

        Self { sender: cmd_tx }
    }

    /// Get ingestion counters
    pub async fn get_stats(&self) -> Option<IngestStats> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(IngestCommand::GetStats { respond_to: tx })
            .await
            .ok()?;

        rx.await.ok()
    }

    /// Stop the actor after the queued messages are handled
    ///
    /// Returns `None` if the actor had already stopped.
    pub async fn shutdown(&self) -> Option<IngestStats> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(IngestCommand::Shutdown { respond_to: tx })
            .await
            .ok()?;

        rx.await.ok()
    }
}
