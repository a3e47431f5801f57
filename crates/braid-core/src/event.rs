//! Gossip events and their fingerprints
//!
//! An event references up to two parents: the creator's own previous event
//! (self parent) and one event from another creator (other parent). The
//! event hash is a BLAKE3 digest over the full unsigned body, so it uniquely
//! identifies creator, generation, parents, creation time and payload.

use crate::error::{BraidError, Result};
use crate::types::{constants, EventHash, Generation, NodeId};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// Identity of an event: its hash, plus the creator and generation carried
/// for indexing convenience.
///
/// Equality and hashing are defined by the event hash alone. Because the
/// hash covers the full unsigned body (including creator and generation),
/// two fingerprints with equal hash but different metadata cannot occur
/// from honest hashing.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct EventFingerprint {
    pub hash: EventHash,
    pub creator: NodeId,
    pub generation: Generation,
}

impl EventFingerprint {
    pub fn new(hash: EventHash, creator: NodeId, generation: Generation) -> Self {
        Self {
            hash,
            creator,
            generation,
        }
    }
}

impl PartialEq for EventFingerprint {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for EventFingerprint {}

impl Hash for EventFingerprint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}

/// An event body before it has been hashed and signed
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UnsignedEvent {
    creator: NodeId,
    self_parent: Option<EventFingerprint>,
    other_parent: Option<EventFingerprint>,
    generation: Generation,
    /// Creation time in nanoseconds since the Unix epoch
    created_at: i64,
    transactions: Vec<Vec<u8>>,
}

impl UnsignedEvent {
    pub fn new(
        creator: NodeId,
        self_parent: Option<EventFingerprint>,
        other_parent: Option<EventFingerprint>,
        created_at: i64,
        transactions: Vec<Vec<u8>>,
    ) -> Self {
        let generation = [&self_parent, &other_parent]
            .into_iter()
            .flatten()
            .map(|p| p.generation)
            .max()
            .map(|g| g + 1)
            .unwrap_or(constants::FIRST_GENERATION);

        Self {
            creator,
            self_parent,
            other_parent,
            generation,
            created_at,
            transactions,
        }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Compute the BLAKE3 digest of the unsigned body
    pub fn hash(&self) -> EventHash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.creator.as_bytes());
        hasher.update(&self.generation.to_le_bytes());
        hasher.update(&self.created_at.to_le_bytes());
        for parent in [&self.self_parent, &self.other_parent] {
            match parent {
                Some(p) => {
                    hasher.update(&[1u8]);
                    hasher.update(p.hash.as_bytes());
                }
                None => {
                    hasher.update(&[0u8]);
                }
            }
        }
        hasher.update(&(self.transactions.len() as u64).to_le_bytes());
        for transaction in &self.transactions {
            hasher.update(&(transaction.len() as u64).to_le_bytes());
            hasher.update(transaction);
        }
        EventHash::new(*hasher.finalize().as_bytes())
    }

    /// Attach the hash and signature, producing the final event
    pub fn into_signed(self, signature: Vec<u8>) -> GossipEvent {
        let hash = self.hash();
        GossipEvent {
            creator: self.creator,
            self_parent: self.self_parent,
            other_parent: self.other_parent,
            generation: self.generation,
            created_at: self.created_at,
            transactions: self.transactions,
            hash,
            signature,
        }
    }
}

/// A fully formed, hashed and signed gossip event
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GossipEvent {
    creator: NodeId,
    self_parent: Option<EventFingerprint>,
    other_parent: Option<EventFingerprint>,
    generation: Generation,
    created_at: i64,
    transactions: Vec<Vec<u8>>,
    hash: EventHash,
    signature: Vec<u8>,
}

impl GossipEvent {
    pub fn creator(&self) -> &NodeId {
        &self.creator
    }

    pub fn self_parent(&self) -> Option<&EventFingerprint> {
        self.self_parent.as_ref()
    }

    pub fn other_parent(&self) -> Option<&EventFingerprint> {
        self.other_parent.as_ref()
    }

    /// Both parents that are present, self parent first
    pub fn parents(&self) -> Vec<EventFingerprint> {
        [self.self_parent, self.other_parent]
            .into_iter()
            .flatten()
            .collect()
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    pub fn transactions(&self) -> &[Vec<u8>] {
        &self.transactions
    }

    pub fn hash(&self) -> &EventHash {
        &self.hash
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    pub fn fingerprint(&self) -> EventFingerprint {
        EventFingerprint::new(self.hash, self.creator, self.generation)
    }

    /// Serialize for the wire
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| BraidError::Serialization(e.to_string()))
    }

    /// Deserialize from the wire
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| BraidError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(n: u8) -> NodeId {
        NodeId::new([n; 32])
    }

    fn fingerprint(n: u8, generation: Generation) -> EventFingerprint {
        EventFingerprint::new(
            EventHash::from_content(&[n, generation as u8]),
            node(n),
            generation,
        )
    }

    #[test]
    fn test_generation_is_max_parent_plus_one() {
        let event = UnsignedEvent::new(
            node(1),
            Some(fingerprint(1, 4)),
            Some(fingerprint(2, 7)),
            100,
            vec![],
        );
        assert_eq!(event.generation(), 8);
    }

    #[test]
    fn test_genesis_generation_is_zero() {
        let event = UnsignedEvent::new(node(1), None, None, 100, vec![]);
        assert_eq!(event.generation(), constants::FIRST_GENERATION);
    }

    #[test]
    fn test_hash_is_deterministic_and_covers_payload() {
        let make = |payload: Vec<Vec<u8>>| {
            UnsignedEvent::new(node(1), Some(fingerprint(1, 1)), None, 42, payload)
        };

        assert_eq!(make(vec![b"tx".to_vec()]).hash(), make(vec![b"tx".to_vec()]).hash());
        assert_ne!(make(vec![b"tx".to_vec()]).hash(), make(vec![b"ty".to_vec()]).hash());

        // Transaction boundaries matter, not just the concatenated bytes
        assert_ne!(
            make(vec![b"ab".to_vec(), b"c".to_vec()]).hash(),
            make(vec![b"a".to_vec(), b"bc".to_vec()]).hash()
        );
    }

    #[test]
    fn test_fingerprint_identity_is_hash_only() {
        let hash = EventHash::from_content(b"same");
        let a = EventFingerprint::new(hash, node(1), 5);
        let b = EventFingerprint::new(hash, node(2), 9);

        assert_eq!(a, b);

        let mut set = std::collections::HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn test_event_serialization_roundtrip() {
        let event = UnsignedEvent::new(
            node(3),
            Some(fingerprint(3, 2)),
            Some(fingerprint(4, 1)),
            1234,
            vec![b"payload".to_vec()],
        )
        .into_signed(vec![0xaa; 64]);

        let bytes = event.to_bytes().unwrap();
        let decoded = GossipEvent::from_bytes(&bytes).unwrap();

        assert_eq!(event, decoded);
        assert_eq!(decoded.fingerprint(), event.fingerprint());
    }
}
