//! Core identifier types for Braid
//!
//! Every event and node in the gossip graph is identified by a 256-bit
//! BLAKE3 digest. Identifiers are small `Copy` types so they can flow
//! freely through the tracking structures.

use serde::{Deserialize, Serialize};
use std::fmt;

/// NodeId - Unique identifier for network nodes
///
/// Derived from a BLAKE3 hash of the node's public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId {
    id: [u8; 32],
}

impl NodeId {
    pub fn new(id: [u8; 32]) -> Self {
        Self { id }
    }

    pub fn from_public_key(public_key: &[u8]) -> Self {
        let hash = blake3::hash(public_key);
        Self {
            id: *hash.as_bytes(),
        }
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.id
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.id)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", &self.to_hex()[..12])
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..12])
    }
}

/// EventHash - Unique identifier for gossip events
///
/// A 256-bit BLAKE3 digest over the unsigned event body. The digest covers
/// the creator, generation, parents, creation time, and transactions, so it
/// is the sole identity of an event.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct EventHash {
    hash: [u8; 32],
}

impl EventHash {
    pub fn new(hash: [u8; 32]) -> Self {
        Self { hash }
    }

    /// Hash arbitrary content with BLAKE3
    pub fn from_content(content: &[u8]) -> Self {
        let hash = blake3::hash(content);
        Self {
            hash: *hash.as_bytes(),
        }
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.hash
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.hash)
    }

    /// Zero hash (never produced by hashing)
    pub const ZERO: Self = Self { hash: [0u8; 32] };
}

impl fmt::Debug for EventHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventHash({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for EventHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

/// Generation of an event: one more than the maximum generation of its
/// parents, zero for an event with no parents.
pub type Generation = u64;

/// Consensus weight held by a node.
pub type Weight = u64;

/// System constants
pub mod constants {
    use super::Generation;

    /// Generation assigned to an event with no parents
    pub const FIRST_GENERATION: Generation = 0;

    /// Default number of progress snapshots retained for fairness scoring
    pub const DEFAULT_SNAPSHOT_HISTORY_SIZE: usize = 10;

    /// Default divisor applied to the bully score when computing the
    /// probability of taking the bully-relief creation path
    pub const DEFAULT_ANTI_BULLYING_FACTOR: f64 = 10.0;

    /// Lowest permitted anti-bullying factor
    pub const MINIMUM_ANTI_BULLYING_FACTOR: f64 = 1.0;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_hash_creation() {
        let hash = EventHash::from_content(b"test content");

        assert_ne!(hash, EventHash::ZERO);
        assert_eq!(hash.as_bytes().len(), 32);

        // Deterministic
        assert_eq!(hash, EventHash::from_content(b"test content"));
        assert_ne!(hash, EventHash::from_content(b"other content"));
    }

    #[test]
    fn test_node_id_from_public_key() {
        let node_id = NodeId::from_public_key(&[7u8; 32]);

        assert_eq!(node_id.as_bytes().len(), 32);
        assert_ne!(node_id, NodeId::from_public_key(&[8u8; 32]));
    }

    #[test]
    fn test_display_is_truncated_hex() {
        let node_id = NodeId::new([0xab; 32]);
        assert_eq!(format!("{}", node_id), "abababababab");
    }
}
