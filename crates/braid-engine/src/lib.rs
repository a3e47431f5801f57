//! Braid event-creation engine
//!
//! Decides when this node should create a new gossip event and which peer
//! tip to build on. The engine is single-writer: one logical task feeds it
//! registered events and creation-cycle ticks; everything it owns is plain
//! mutable state behind that task.
//!
//! The pieces, bottom up:
//!
//! - [`tipset_tracker::TipsetTracker`]: tipset per known event, windowed
//!   by the minimum non-ancient generation
//! - [`childless_tracker::ChildlessEventTracker`]: the current tips,
//!   i.e. the other-parent candidates
//! - [`score::TipsetScoreCalculator`]: weighted progress scoring and the
//!   fairness (bully) heuristic
//! - [`creator::TipsetEventCreator`]: the decision engine itself
//! - [`rules`]: go/no-go gate consulted before each creation cycle

pub mod childless_tracker;
pub mod creator;
pub mod pool;
pub mod rules;
pub mod score;
pub mod time;
pub mod tipset_tracker;

pub use childless_tracker::ChildlessEventTracker;
pub use creator::{EventCreationConfig, EventSigner, TipsetEventCreator};
pub use pool::{PendingTransactionQueue, TransactionPool};
pub use rules::{
    AggregateCreationRule, CreationRule, IntakeBackpressureRule, MaxCreationRateRule,
    PlatformStatus, PlatformStatusHandle, PlatformStatusRule, ReconnectSafetyRule,
    StartupFreezeRule,
};
pub use score::TipsetScoreCalculator;
pub use time::{ManualTimeSource, SystemTimeSource, TimeSource};
pub use tipset_tracker::TipsetTracker;

/// Common imports for engine consumers
pub mod prelude {
    pub use crate::creator::{EventCreationConfig, EventSigner, TipsetEventCreator};
    pub use crate::pool::{PendingTransactionQueue, TransactionPool};
    pub use crate::rules::{AggregateCreationRule, CreationRule, PlatformStatus};
    pub use crate::time::{SystemTimeSource, TimeSource};
    pub use braid_core::prelude::*;
}
