//! # Braid Core
//!
//! Core data structures for the Braid hashgraph event-creation engine.
//!
//! This crate provides the fundamental building blocks:
//! - `GossipEvent` / `EventFingerprint` - events of the gossip DAG and their
//!   hash-based identities
//! - `Tipset` - per-event summary of the highest generation known per creator
//! - `Roster` - the static weight/index provider for one run of the engine
//!
//! ## Architecture
//!
//! Each node continuously creates events that reference prior events as
//! parents, forming a DAG from which a total order is later derived:
//!
//! ```text
//!      creator A:  a1 ──► a2 ──────► a3
//!                     ╲       ╲    ╱
//!      creator B:  b1 ─╲─► b2 ─╲─╱──► b3
//!                       ╲       ╳
//!      creator C:  c1 ───► c2 ─╱─╲──► c3
//! ```
//!
//! The engine built on top of these types decides when this node should add
//! its next event, and which peer tip to pull in as the other parent.

pub mod error;
pub mod event;
pub mod roster;
pub mod tipset;
pub mod types;

pub use error::*;
pub use event::*;
pub use roster::*;
pub use tipset::*;
pub use types::*;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{BraidError, Result};
    pub use crate::event::{EventFingerprint, GossipEvent, UnsignedEvent};
    pub use crate::roster::{Roster, RosterEntry};
    pub use crate::tipset::Tipset;
    pub use crate::types::{EventHash, Generation, NodeId, Weight};
}
