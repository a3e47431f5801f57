//! Consensus roster: the static set of nodes and their weights
//!
//! The roster is built once per tracker instance and never mutated; a
//! membership or weight change requires constructing new engine instances.

use crate::error::{BraidError, Result};
use crate::types::{NodeId, Weight};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

/// A single roster member
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub node_id: NodeId,
    pub weight: Weight,
}

impl RosterEntry {
    pub fn new(node_id: NodeId, weight: Weight) -> Self {
        Self { node_id, weight }
    }
}

/// Immutable weight/index provider for one run of the engine
#[derive(Clone, Debug)]
pub struct Roster {
    entries: Vec<RosterEntry>,
    index: HashMap<NodeId, usize>,
    total_weight: Weight,
}

impl Roster {
    /// Build a roster from its entries. Order is preserved and defines the
    /// node index used by per-index scoring.
    pub fn new(entries: Vec<RosterEntry>) -> Result<Self> {
        if entries.is_empty() {
            return Err(BraidError::EmptyRoster);
        }

        let mut index = HashMap::with_capacity(entries.len());
        let mut total_weight: Weight = 0;
        for (i, entry) in entries.iter().enumerate() {
            if index.insert(entry.node_id, i).is_some() {
                return Err(BraidError::DuplicateRosterEntry(entry.node_id));
            }
            total_weight = total_weight.saturating_add(entry.weight);
        }

        Ok(Self {
            entries,
            index,
            total_weight,
        })
    }

    /// Convenience constructor for equal-weight rosters
    pub fn with_equal_weights(node_ids: Vec<NodeId>, weight: Weight) -> Result<Self> {
        Self::new(
            node_ids
                .into_iter()
                .map(|node_id| RosterEntry::new(node_id, weight))
                .collect(),
        )
    }

    pub fn node_count(&self) -> usize {
        self.entries.len()
    }

    pub fn total_weight(&self) -> Weight {
        self.total_weight
    }

    pub fn contains(&self, node_id: &NodeId) -> bool {
        self.index.contains_key(node_id)
    }

    /// Index of a node within the roster
    pub fn index_of(&self, node_id: &NodeId) -> Option<usize> {
        self.index.get(node_id).copied()
    }

    /// Node at a given roster index
    pub fn node_at(&self, index: usize) -> Option<NodeId> {
        self.entries.get(index).map(|e| e.node_id)
    }

    /// Weight of a node; zero for nodes outside the roster
    pub fn weight_of(&self, node_id: &NodeId) -> Weight {
        self.index
            .get(node_id)
            .map(|&i| self.entries[i].weight)
            .unwrap_or(0)
    }

    /// Iterate over all members in index order
    pub fn iter(&self) -> impl Iterator<Item = &RosterEntry> {
        self.entries.iter()
    }

    /// Strict supermajority check: weight `w` over total `T` satisfies
    /// `3w > 2T`. Widened to avoid overflow on large weights.
    pub fn is_strict_supermajority(&self, weight: Weight) -> bool {
        3 * u128::from(weight) > 2 * u128::from(self.total_weight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(n: u8) -> NodeId {
        NodeId::new([n; 32])
    }

    #[test]
    fn test_roster_lookup() {
        let roster = Roster::new(vec![
            RosterEntry::new(node(1), 10),
            RosterEntry::new(node(2), 20),
            RosterEntry::new(node(3), 30),
        ])
        .unwrap();

        assert_eq!(roster.node_count(), 3);
        assert_eq!(roster.total_weight(), 60);
        assert_eq!(roster.weight_of(&node(2)), 20);
        assert_eq!(roster.weight_of(&node(9)), 0);
        assert_eq!(roster.index_of(&node(3)), Some(2));
        assert_eq!(roster.node_at(0), Some(node(1)));
        assert_eq!(roster.node_at(5), None);
    }

    #[test]
    fn test_empty_roster_rejected() {
        assert!(matches!(Roster::new(vec![]), Err(BraidError::EmptyRoster)));
    }

    #[test]
    fn test_duplicate_entry_rejected() {
        let result = Roster::new(vec![
            RosterEntry::new(node(1), 1),
            RosterEntry::new(node(1), 2),
        ]);
        assert!(matches!(result, Err(BraidError::DuplicateRosterEntry(_))));
    }

    #[test]
    fn test_strict_supermajority_boundary() {
        // 4 equal-weight nodes, total 4: 2 is not a supermajority, 3 is
        let roster = Roster::with_equal_weights(vec![node(1), node(2), node(3), node(4)], 1).unwrap();

        assert!(!roster.is_strict_supermajority(2));
        assert!(roster.is_strict_supermajority(3));

        // Exactly two thirds is not strict: 3*6 == 2*9
        let roster = Roster::with_equal_weights((1..=9).map(node).collect(), 1).unwrap();
        assert!(!roster.is_strict_supermajority(6));
        assert!(roster.is_strict_supermajority(7));
    }
}
