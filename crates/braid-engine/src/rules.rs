//! Creation-permission rules
//!
//! Before every creation cycle the worker asks an aggregate rule whether
//! creating an event is currently allowed. Rules are pure go/no-go checks
//! over shared counters and flags; they never error and never block.

use crate::time::TimeSource;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Lifecycle phase of the node, as seen by the creation gate
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlatformStatus {
    Starting,
    Active,
    Checking,
    Freezing,
    FreezeComplete,
    Behind,
}

/// Clonable handle to the node's current status
#[derive(Clone, Debug)]
pub struct PlatformStatusHandle {
    status: Arc<RwLock<PlatformStatus>>,
}

impl PlatformStatusHandle {
    pub fn new(initial: PlatformStatus) -> Self {
        Self {
            status: Arc::new(RwLock::new(initial)),
        }
    }

    pub fn set(&self, status: PlatformStatus) {
        *self.status.write() = status;
    }

    pub fn get(&self) -> PlatformStatus {
        *self.status.read()
    }
}

/// A single go/no-go check consulted before each creation cycle
pub trait CreationRule: Send {
    fn permits_creation(&mut self) -> bool;

    /// Notification that an event was actually created this cycle
    fn on_event_created(&mut self) {}
}

/// Conjunction of rules: creation is allowed only when every rule agrees.
/// Evaluation short-circuits on the first refusal.
pub struct AggregateCreationRule {
    rules: Vec<Box<dyn CreationRule>>,
}

impl AggregateCreationRule {
    pub fn new(rules: Vec<Box<dyn CreationRule>>) -> Self {
        Self { rules }
    }
}

impl CreationRule for AggregateCreationRule {
    fn permits_creation(&mut self) -> bool {
        self.rules.iter_mut().all(|rule| rule.permits_creation())
    }

    fn on_event_created(&mut self) {
        for rule in &mut self.rules {
            rule.on_event_created();
        }
    }
}

/// Gate on the node's lifecycle status.
///
/// Active and Checking permit creation. Freezing permits creation only
/// while system transactions (state signatures) still need to go out, so
/// the freeze state can gather its signatures. Everything else denies.
pub struct PlatformStatusRule {
    status: PlatformStatusHandle,
    system_transactions_pending: Box<dyn Fn() -> bool + Send>,
}

impl PlatformStatusRule {
    pub fn new(
        status: PlatformStatusHandle,
        system_transactions_pending: Box<dyn Fn() -> bool + Send>,
    ) -> Self {
        Self {
            status,
            system_transactions_pending,
        }
    }
}

impl CreationRule for PlatformStatusRule {
    fn permits_creation(&mut self) -> bool {
        match self.status.get() {
            PlatformStatus::Active | PlatformStatus::Checking => true,
            PlatformStatus::Freezing => (self.system_transactions_pending)(),
            PlatformStatus::Starting | PlatformStatus::FreezeComplete | PlatformStatus::Behind => {
                false
            }
        }
    }
}

/// Deny creation for a fixed window after startup, giving gossip a chance
/// to catch the node up before it starts publishing.
pub struct StartupFreezeRule {
    time: Arc<dyn TimeSource>,
    permitted_after: i64,
}

impl StartupFreezeRule {
    pub fn new(time: Arc<dyn TimeSource>, freeze_duration_nanos: i64) -> Self {
        let permitted_after = time.now_nanos().saturating_add(freeze_duration_nanos);
        Self {
            time,
            permitted_after,
        }
    }
}

impl CreationRule for StartupFreezeRule {
    fn permits_creation(&mut self) -> bool {
        self.time.now_nanos() >= self.permitted_after
    }
}

/// Deny creation while the inbound event queue is backed up. Creating
/// events while behind on intake only widens the gap.
pub struct IntakeBackpressureRule {
    queue_depth: Arc<AtomicUsize>,
    /// Zero disables the rule
    limit: usize,
}

impl IntakeBackpressureRule {
    pub fn new(queue_depth: Arc<AtomicUsize>, limit: usize) -> Self {
        Self { queue_depth, limit }
    }
}

impl CreationRule for IntakeBackpressureRule {
    fn permits_creation(&mut self) -> bool {
        self.limit == 0 || self.queue_depth.load(Ordering::Relaxed) < self.limit
    }
}

/// Token-bucket cap on the event creation rate. Inactive unless a positive
/// maximum rate is configured. Capacity is one token: no bursting.
pub struct MaxCreationRateRule {
    time: Arc<dyn TimeSource>,
    max_per_second: f64,
    tokens: f64,
    last_refill: i64,
}

impl MaxCreationRateRule {
    pub fn new(time: Arc<dyn TimeSource>, max_per_second: f64) -> Self {
        let last_refill = time.now_nanos();
        Self {
            time,
            max_per_second,
            tokens: 1.0,
            last_refill,
        }
    }

    fn refill(&mut self) {
        let now = self.time.now_nanos();
        let elapsed_seconds = (now - self.last_refill).max(0) as f64 / 1e9;
        self.tokens = (self.tokens + elapsed_seconds * self.max_per_second).min(1.0);
        self.last_refill = now;
    }
}

impl CreationRule for MaxCreationRateRule {
    fn permits_creation(&mut self) -> bool {
        if self.max_per_second <= 0.0 {
            return true;
        }
        self.refill();
        self.tokens >= 1.0
    }

    fn on_event_created(&mut self) {
        if self.max_per_second > 0.0 {
            self.tokens = (self.tokens - 1.0).max(0.0);
        }
    }
}

/// After a reconnect, deny creation until the state learned during the
/// reconnect has been saved locally. Creating events against an unsaved
/// state risks contradicting them after a crash.
pub struct ReconnectSafetyRule {
    latest_reconnect_round: Arc<AtomicU64>,
    latest_saved_round: Arc<AtomicU64>,
}

impl ReconnectSafetyRule {
    pub fn new(
        latest_reconnect_round: Arc<AtomicU64>,
        latest_saved_round: Arc<AtomicU64>,
    ) -> Self {
        Self {
            latest_reconnect_round,
            latest_saved_round,
        }
    }
}

impl CreationRule for ReconnectSafetyRule {
    fn permits_creation(&mut self) -> bool {
        self.latest_reconnect_round.load(Ordering::Relaxed)
            <= self.latest_saved_round.load(Ordering::Relaxed)
    }
}
