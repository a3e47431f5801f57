//! Node assembly: wires configuration, keys, the engine and the worker

use crate::config::NodeConfig;
use crate::metrics::{CreationMetrics, MetricsServer};
use crate::worker::{CreationWorker, CreatorHandle};
use braid_core::event::GossipEvent;
use braid_core::roster::Roster;
use braid_crypto::KeyPair;
use braid_engine::creator::TipsetEventCreator;
use braid_engine::pool::{PendingTransactionQueue, TransactionPool};
use braid_engine::rules::{
    AggregateCreationRule, IntakeBackpressureRule, MaxCreationRateRule, PlatformStatus,
    PlatformStatusHandle, PlatformStatusRule, ReconnectSafetyRule, StartupFreezeRule,
};
use braid_engine::time::{SystemTimeSource, TimeSource};
use rand::SeedableRng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// A running Braid node: the creation worker plus the shared handles the
/// surrounding layers use to talk to it.
///
/// Must be started inside a tokio runtime.
pub struct BraidNode {
    handle: CreatorHandle,
    events: mpsc::Receiver<GossipEvent>,
    pool: PendingTransactionQueue,
    status: PlatformStatusHandle,
    metrics: Arc<CreationMetrics>,
    latest_reconnect_round: Arc<AtomicU64>,
    latest_saved_round: Arc<AtomicU64>,
    worker: tokio::task::JoinHandle<()>,
}

impl BraidNode {
    pub fn start(config: NodeConfig, keypair: KeyPair, roster: Arc<Roster>) -> anyhow::Result<Self> {
        let metrics = Arc::new(CreationMetrics::new()?);
        let time: Arc<dyn TimeSource> = Arc::new(SystemTimeSource);
        let pool = PendingTransactionQueue::new(config.creation.transaction_batch_limit);
        let status = PlatformStatusHandle::new(PlatformStatus::Starting);
        let latest_reconnect_round = Arc::new(AtomicU64::new(0));
        let latest_saved_round = Arc::new(AtomicU64::new(0));

        let (handle, mailbox) = CreatorHandle::channel(config.creation.command_queue_capacity);

        let system_pending = {
            let pool = pool.clone();
            move || pool.has_system_transactions()
        };
        let gate = AggregateCreationRule::new(vec![
            Box::new(PlatformStatusRule::new(
                status.clone(),
                Box::new(system_pending),
            )),
            Box::new(StartupFreezeRule::new(
                time.clone(),
                config.creation.startup_freeze().as_nanos() as i64,
            )),
            Box::new(IntakeBackpressureRule::new(
                handle.queue_depth(),
                config.creation.intake_queue_limit,
            )),
            Box::new(MaxCreationRateRule::new(
                time.clone(),
                config.creation.max_creation_rate,
            )),
            Box::new(ReconnectSafetyRule::new(
                latest_reconnect_round.clone(),
                latest_saved_round.clone(),
            )),
        ]);

        let creator = TipsetEventCreator::new(
            keypair.node_id(),
            roster,
            config.creation.engine.clone(),
            Box::new(keypair),
            Box::new(pool.clone()),
            time,
            Box::new(rand::rngs::StdRng::from_entropy()),
        );

        let (events_tx, events) = mpsc::channel(1024);
        let worker = CreationWorker::new(
            creator,
            Box::new(gate),
            mailbox,
            events_tx,
            config.creation.attempt_interval(),
            metrics.clone(),
        )
        .spawn();

        if config.metrics.enabled {
            let server = MetricsServer::new(config.metrics.clone(), metrics.clone());
            tokio::spawn(async move {
                if let Err(error) = server.run().await {
                    tracing::error!(%error, "metrics server failed");
                }
            });
        }

        Ok(Self {
            handle,
            events,
            pool,
            status,
            metrics,
            latest_reconnect_round,
            latest_saved_round,
            worker,
        })
    }

    /// Command sender for gossip intake and threshold updates
    pub fn handle(&self) -> CreatorHandle {
        self.handle.clone()
    }

    /// Transaction submission side of the pool
    pub fn transaction_pool(&self) -> PendingTransactionQueue {
        self.pool.clone()
    }

    /// Lifecycle status control
    pub fn status(&self) -> PlatformStatusHandle {
        self.status.clone()
    }

    pub fn metrics(&self) -> Arc<CreationMetrics> {
        self.metrics.clone()
    }

    /// Next event created by this node, to be gossiped out
    pub async fn next_event(&mut self) -> Option<GossipEvent> {
        self.events.recv().await
    }

    /// Record the round learned during a reconnect; creation stays blocked
    /// until a state at or past it has been saved
    pub fn record_reconnect_round(&self, round: u64) {
        self.latest_reconnect_round.store(round, Ordering::Relaxed);
    }

    /// Record the newest locally saved state round
    pub fn record_saved_round(&self, round: u64) {
        self.latest_saved_round.store(round, Ordering::Relaxed);
    }

    /// Stop the worker by closing its command channel and wait for it to
    /// wind down. Pending commands are processed first.
    pub async fn shutdown(self) {
        drop(self.handle);
        drop(self.events);
        let _ = self.worker.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NodeConfig;
    use tokio::time::{timeout, Duration};

    fn fast_config() -> NodeConfig {
        let mut config = NodeConfig::default();
        config.creation.attempt_interval_ms = 5;
        config.creation.startup_freeze_seconds = 0;
        config.metrics.enabled = false;
        config
    }

    fn two_node_roster(keypair: &KeyPair) -> Arc<Roster> {
        let peer = KeyPair::from_seed([99u8; 32]);
        Arc::new(
            Roster::with_equal_weights(vec![keypair.node_id(), peer.node_id()], 1).unwrap(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_node_creates_genesis_with_transactions() {
        let keypair = KeyPair::from_seed([1u8; 32]);
        let roster = two_node_roster(&keypair);
        let mut node = BraidNode::start(fast_config(), keypair, roster).unwrap();

        node.transaction_pool().submit(b"hello".to_vec());
        node.status().set(PlatformStatus::Active);

        let event = timeout(Duration::from_secs(5), node.next_event())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.generation(), 0);
        assert_eq!(event.transactions(), &[b"hello".to_vec()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_node_blocked_while_starting() {
        let keypair = KeyPair::from_seed([1u8; 32]);
        let roster = two_node_roster(&keypair);
        let mut node = BraidNode::start(fast_config(), keypair, roster).unwrap();

        // Status stays Starting: nothing may be created
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(node.events.try_recv().is_err());
        assert!(node.metrics().cycles_denied.get() > 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_completes() {
        let keypair = KeyPair::from_seed([1u8; 32]);
        let roster = two_node_roster(&keypair);
        let node = BraidNode::start(fast_config(), keypair, roster).unwrap();

        timeout(Duration::from_secs(5), node.shutdown())
            .await
            .unwrap();
    }
}
