//! The broadcast hub.
//!
//! [`BroadcastHub`] owns the [`ClientRegistry`] and the
//! [`ThroughputCounter`] and runs as a single Tokio task (the service
//! context). Every other context talks to it through a cloneable
//! [`HubHandle`], which only enqueues [`HubCommand`]s on an unbounded
//! channel. Enqueueing never blocks, so the acquisition thread can hand
//! off a finished frame without waiting on the network or the registry.
//!
//! Delivery is fire-and-forget: a failing consumer is skipped and stays
//! registered until its transport reports the disconnect.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::DepthcastError;
use crate::hub::consumer::{Consumer, ConsumerId};
use crate::hub::registry::ClientRegistry;
use crate::hub::throughput::{ThroughputCounter, ThroughputReport};

// ── HubConfig ────────────────────────────────────────────────────

/// Configuration for [`BroadcastHub`].
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Period of the throughput report.
    pub report_interval: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            report_interval: Duration::from_secs(1),
        }
    }
}

// ── HubCommand ───────────────────────────────────────────────────

/// Work items marshalled onto the hub task.
pub enum HubCommand {
    Register(Arc<dyn Consumer>),
    Unregister(ConsumerId),
    Broadcast { payload: Bytes, binary: bool },
    ConsumerCount(oneshot::Sender<usize>),
}

// ── HubHandle ────────────────────────────────────────────────────

/// Cloneable, thread-safe entry point to the hub.
#[derive(Clone)]
pub struct HubHandle {
    tx: mpsc::UnboundedSender<HubCommand>,
}

impl HubHandle {
    /// Schedule `payload` for delivery to every registered consumer.
    pub fn broadcast(&self, payload: Bytes, binary: bool) -> Result<(), DepthcastError> {
        self.tx.send(HubCommand::Broadcast { payload, binary })?;
        Ok(())
    }

    /// Schedule registration of a newly connected consumer.
    pub fn register(&self, consumer: Arc<dyn Consumer>) -> Result<(), DepthcastError> {
        self.tx.send(HubCommand::Register(consumer))?;
        Ok(())
    }

    /// Schedule removal of a disconnected consumer.
    pub fn unregister(&self, id: ConsumerId) -> Result<(), DepthcastError> {
        self.tx.send(HubCommand::Unregister(id))?;
        Ok(())
    }

    /// Number of registered consumers, as seen by the hub task once all
    /// previously queued commands have been applied.
    pub async fn consumer_count(&self) -> Result<usize, DepthcastError> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(HubCommand::ConsumerCount(reply))?;
        rx.await.map_err(|_| DepthcastError::ChannelClosed)
    }

    /// Whether the hub task has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

// ── BroadcastHub ─────────────────────────────────────────────────

/// Consumer registry, fan-out and throughput metering.
pub struct BroadcastHub {
    registry: ClientRegistry,
    counter: ThroughputCounter,
    config: HubConfig,
    rx: mpsc::UnboundedReceiver<HubCommand>,
    reports: watch::Sender<ThroughputReport>,
}

impl BroadcastHub {
    /// Create a hub and the handle used to reach it.
    pub fn new(config: HubConfig) -> (Self, HubHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (reports, _) = watch::channel(ThroughputReport::default());
        let hub = Self {
            registry: ClientRegistry::new(),
            counter: ThroughputCounter::new(),
            config,
            rx,
            reports,
        };
        (hub, HubHandle { tx })
    }

    /// Observe throughput reports as they are produced.
    pub fn subscribe_reports(&self) -> watch::Receiver<ThroughputReport> {
        self.reports.subscribe()
    }

    /// Add `consumer` unless it is already registered.
    pub fn register(&mut self, consumer: Arc<dyn Consumer>) -> bool {
        let (id, peer) = (consumer.id(), consumer.peer().to_string());
        let inserted = self.registry.register(consumer);
        if inserted {
            info!(consumer = %id, "registered client: {peer}");
        }
        inserted
    }

    /// Remove the consumer with `id`; absent ids are ignored.
    pub fn unregister(&mut self, id: ConsumerId) -> bool {
        match self.registry.unregister(id) {
            Some(consumer) => {
                info!(consumer = %id, "unregistered client: {}", consumer.peer());
                true
            }
            None => false,
        }
    }

    /// Meter `payload` and hand it to every registered consumer.
    ///
    /// Returns how many consumers accepted it. Per-consumer failures
    /// are logged and skipped.
    pub fn broadcast(&mut self, payload: Bytes, binary: bool) -> usize {
        self.counter.record(payload.len());
        let mut delivered = 0;
        for consumer in self.registry.iter() {
            match consumer.send(payload.clone(), binary) {
                Ok(()) => delivered += 1,
                Err(e) if e.is_per_consumer() => {
                    debug!(consumer = %consumer.id(), "send skipped: {e}")
                }
                Err(e) => warn!(consumer = %consumer.id(), "send failed: {e}"),
            }
        }
        delivered
    }

    /// Read and reset the throughput counter, then publish the report.
    pub fn report(&mut self) -> ThroughputReport {
        let (bytes, frames) = self.counter.take();
        let report = ThroughputReport::from_window(
            bytes,
            frames,
            self.registry.len(),
            self.config.report_interval,
        );
        info!(
            consumers = report.consumers,
            frames = report.frames,
            "{} bytes/sec",
            report.bytes_per_sec
        );
        self.reports.send_replace(report);
        report
    }

    pub fn registry(&self) -> &ClientRegistry {
        &self.registry
    }

    pub fn counter(&self) -> &ThroughputCounter {
        &self.counter
    }

    /// Apply one queued command.
    pub fn handle_command(&mut self, command: HubCommand) {
        match command {
            HubCommand::Register(consumer) => {
                self.register(consumer);
            }
            HubCommand::Unregister(id) => {
                self.unregister(id);
            }
            HubCommand::Broadcast { payload, binary } => {
                self.broadcast(payload, binary);
            }
            HubCommand::ConsumerCount(reply) => {
                let _ = reply.send(self.registry.len());
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn try_next_command(&mut self) -> Result<HubCommand, mpsc::error::TryRecvError> {
        self.rx.try_recv()
    }

    /// Run the hub until `shutdown` fires or every handle is dropped.
    ///
    /// The throughput report re-arms itself every `report_interval`
    /// for as long as the loop runs.
    pub async fn run(mut self, shutdown: CancellationToken) {
        let period = self.config.report_interval;
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                command = self.rx.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                _ = ticker.tick() => {
                    self.report();
                }
            }
        }

        let remaining = self.registry.len();
        self.registry.clear();
        info!("broadcast hub stopped ({remaining} clients dropped)");
    }
}

// ── Tests ────────────────────────────────────────────────────────
