//! Error types for Braid core operations

use crate::types::{EventHash, NodeId, Weight};
use thiserror::Error;

/// Result type alias for Braid operations
pub type Result<T> = std::result::Result<T, BraidError>;

/// Errors that can occur in the Braid event-creation engine
#[derive(Error, Debug, Clone)]
pub enum BraidError {
    // === Roster ===
    /// Roster was constructed with no entries
    #[error("Roster must contain at least one node")]
    EmptyRoster,

    /// Roster was constructed with a duplicate node
    #[error("Duplicate roster entry for node: {0}")]
    DuplicateRosterEntry(NodeId),

    // === Scoring invariants ===
    /// An advancement score exceeded the theoretical maximum. This means
    /// the weighted-scoring invariant was broken upstream.
    #[error("Advancement score {score} exceeds theoretical maximum {maximum}")]
    ScoreExceedsMaximum { score: Weight, maximum: Weight },

    /// A score was requested for an event created by another node
    #[error("Event was not created by this node: {0}")]
    NotSelfEvent(NodeId),

    /// An event was scored before its tipset was registered, which
    /// indicates a broken registration order
    #[error("No tipset registered for event: {0}")]
    TipsetNotFound(EventHash),

    /// The bully-relief path found candidates but failed to select one
    #[error("Weighted selection failed despite non-empty candidate set")]
    NerdSelectionFailed,

    // === External collaborators ===
    /// Signing the new event failed
    #[error("Signing failed: {0}")]
    SigningFailed(String),

    /// The transaction pool could not supply a batch
    #[error("Transaction pool error: {0}")]
    TransactionPool(String),

    // === General ===
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The worker queue was closed
    #[error("Creation worker queue is closed")]
    QueueClosed,
}

impl BraidError {
    /// Invariant violations indicate programmer error upstream; they must
    /// abort the current cycle loudly rather than be retried or swallowed.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Self::ScoreExceedsMaximum { .. }
                | Self::NotSelfEvent(_)
                | Self::TipsetNotFound(_)
                | Self::NerdSelectionFailed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BraidError::ScoreExceedsMaximum {
            score: 9,
            maximum: 3,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("exceeds theoretical maximum"));
    }

    #[test]
    fn test_invariant_classification() {
        assert!(BraidError::NerdSelectionFailed.is_invariant_violation());
        assert!(BraidError::TipsetNotFound(EventHash::ZERO).is_invariant_violation());
        assert!(!BraidError::QueueClosed.is_invariant_violation());
        assert!(!BraidError::SigningFailed("key unavailable".into()).is_invariant_violation());
    }
}
