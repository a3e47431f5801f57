//! Single-writer creation worker
//!
//! All engine state is owned by one task. Everything else talks to it
//! through a bounded command channel: gossip intake registers events, the
//! consensus layer advances the non-ancient threshold, and an interval
//! timer inside the task drives creation cycles. Commands are applied in
//! arrival order, so parent registration always precedes child
//! registration as long as senders submit in topological order.

use crate::metrics::CreationMetrics;
use braid_core::error::{BraidError, Result};
use braid_core::event::GossipEvent;
use braid_core::types::Generation;
use braid_engine::creator::TipsetEventCreator;
use braid_engine::rules::CreationRule;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

/// Commands accepted by the creation worker
#[derive(Debug)]
pub enum CreatorCommand {
    /// An event arrived from gossip (or was recovered at startup)
    RegisterEvent(GossipEvent),
    /// The consensus layer advanced the minimum non-ancient generation
    SetNonAncientThreshold(Generation),
}

/// Clonable sender half of the worker's command channel
#[derive(Clone)]
pub struct CreatorHandle {
    commands: mpsc::Sender<CreatorCommand>,
    queue_depth: Arc<AtomicUsize>,
}

/// Receiver half, consumed by the worker
pub struct CreatorMailbox {
    commands: mpsc::Receiver<CreatorCommand>,
    queue_depth: Arc<AtomicUsize>,
}

impl CreatorHandle {
    /// Create a bounded command channel
    pub fn channel(capacity: usize) -> (CreatorHandle, CreatorMailbox) {
        let (tx, rx) = mpsc::channel(capacity);
        let queue_depth = Arc::new(AtomicUsize::new(0));
        (
            CreatorHandle {
                commands: tx,
                queue_depth: queue_depth.clone(),
            },
            CreatorMailbox {
                commands: rx,
                queue_depth,
            },
        )
    }

    pub async fn register_event(&self, event: GossipEvent) -> Result<()> {
        self.send(CreatorCommand::RegisterEvent(event)).await
    }

    pub async fn set_non_ancient_threshold(&self, generation: Generation) -> Result<()> {
        self.send(CreatorCommand::SetNonAncientThreshold(generation))
            .await
    }

    /// Commands currently waiting in the queue. Feeds the intake
    /// backpressure rule.
    pub fn queue_depth(&self) -> Arc<AtomicUsize> {
        self.queue_depth.clone()
    }

    async fn send(&self, command: CreatorCommand) -> Result<()> {
        self.queue_depth.fetch_add(1, Ordering::Relaxed);
        if self.commands.send(command).await.is_err() {
            self.queue_depth.fetch_sub(1, Ordering::Relaxed);
            return Err(BraidError::QueueClosed);
        }
        Ok(())
    }
}

/// The worker task: owns the creator, the gate and the clock tick
pub struct CreationWorker {
    creator: TipsetEventCreator,
    gate: Box<dyn CreationRule>,
    mailbox: CreatorMailbox,
    events_out: mpsc::Sender<GossipEvent>,
    attempt_interval: Duration,
    metrics: Arc<CreationMetrics>,
}

impl CreationWorker {
    pub fn new(
        creator: TipsetEventCreator,
        gate: Box<dyn CreationRule>,
        mailbox: CreatorMailbox,
        events_out: mpsc::Sender<GossipEvent>,
        attempt_interval: Duration,
        metrics: Arc<CreationMetrics>,
    ) -> Self {
        Self {
            creator,
            gate,
            mailbox,
            events_out,
            attempt_interval,
            metrics,
        }
    }

    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.attempt_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(node = %self.creator.self_id(), "creation worker started");
        loop {
            tokio::select! {
                // Drain pending commands before attempting creation
                biased;

                command = self.mailbox.commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => {
                        tracing::info!("command channel closed, stopping creation worker");
                        break;
                    }
                },
                _ = ticker.tick() => {
                    if !self.creation_cycle().await {
                        break;
                    }
                }
            }
        }
    }

    fn handle_command(&mut self, command: CreatorCommand) {
        self.mailbox.queue_depth.fetch_sub(1, Ordering::Relaxed);
        self.metrics.commands_processed.inc();
        self.metrics
            .command_queue_depth
            .set(self.mailbox.queue_depth.load(Ordering::Relaxed) as i64);

        match command {
            CreatorCommand::RegisterEvent(event) => self.creator.register_event(&event),
            CreatorCommand::SetNonAncientThreshold(generation) => {
                self.creator.set_minimum_generation_non_ancient(generation)
            }
        }
    }

    /// One creation opportunity. Returns false when the event consumer is
    /// gone and the worker should stop.
    async fn creation_cycle(&mut self) -> bool {
        if !self.gate.permits_creation() {
            self.metrics.cycles_denied.inc();
            return true;
        }

        match self.creator.maybe_create_event() {
            Ok(Some(event)) => {
                self.gate.on_event_created();
                self.metrics.events_created.inc();
                self.metrics
                    .max_bully_score
                    .set(self.creator.max_bully_score() as i64);
                self.metrics.score_ratio.set(self.creator.score_ratio());

                if self.events_out.send(event).await.is_err() {
                    tracing::info!("event consumer dropped, stopping creation worker");
                    return false;
                }
            }
            Ok(None) => {
                self.metrics.cycles_no_progress.inc();
            }
            Err(error) => {
                // Invariant violations are logged and the cycle skipped;
                // the worker keeps serving registrations
                tracing::error!(%error, "creation cycle failed");
            }
        }
        true
    }
}
