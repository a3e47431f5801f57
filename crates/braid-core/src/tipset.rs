//! Tipset: per-event summary of the highest generation known per creator
//!
//! Each event carries an immutable tipset describing the highest generation
//! transitively reachable from it for every creator in its ancestry. Tipsets
//! are built once, by merging the parents' tipsets and advancing the
//! creator's own entry, and never mutated afterwards.
//!
//! A creator absent from a tipset reads as generation zero.

use crate::roster::Roster;
use crate::types::{Generation, NodeId, Weight};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

/// Mapping from creator to the highest generation known through one event's
/// ancestry. The tip generation for any creator is monotonically
/// non-decreasing along any ancestry chain.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tipset {
    tips: HashMap<NodeId, Generation>,
}

impl Tipset {
    /// Empty tipset: nothing known from anyone
    pub fn new() -> Self {
        Self::default()
    }

    /// Highest generation known for a creator; zero if absent
    pub fn tip(&self, creator: &NodeId) -> Generation {
        self.tips.get(creator).copied().unwrap_or(0)
    }

    /// Whether a creator is present at all
    pub fn contains(&self, creator: &NodeId) -> bool {
        self.tips.contains_key(creator)
    }

    pub fn len(&self) -> usize {
        self.tips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tips.is_empty()
    }

    /// Iterate over all (creator, tip generation) entries
    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &Generation)> {
        self.tips.iter()
    }

    /// Merge tipsets: the result maps every creator appearing in any input
    /// to the maximum generation found for that creator across all inputs.
    /// Pure function, inputs are untouched.
    pub fn merge<'a, I>(tipsets: I) -> Tipset
    where
        I: IntoIterator<Item = &'a Tipset>,
    {
        let mut merged: HashMap<NodeId, Generation> = HashMap::new();
        for tipset in tipsets {
            for (creator, &generation) in tipset.tips.iter() {
                merged
                    .entry(*creator)
                    .and_modify(|g| *g = (*g).max(generation))
                    .or_insert(generation);
            }
        }
        Tipset { tips: merged }
    }

    /// Advance the tip for a creator, only if the new generation exceeds the
    /// current value. Returns self for chaining during construction.
    pub fn advance(mut self, creator: NodeId, generation: Generation) -> Self {
        let entry = self.tips.entry(creator).or_insert(0);
        if generation > *entry {
            *entry = generation;
        }
        self
    }

    /// Weighted advancement count: the sum of roster weights of every
    /// creator whose tip strictly increased from `self` to `other`.
    ///
    /// The node's own advancement never contributes; advancing one's own
    /// generation does not, by itself, help consensus progress.
    pub fn weighted_advancement(&self, self_id: &NodeId, other: &Tipset, roster: &Roster) -> Weight {
        let mut score: Weight = 0;
        for (creator, &generation) in other.tips.iter() {
            if creator == self_id {
                continue;
            }
            if self.tip(creator) < generation {
                score = score.saturating_add(roster.weight_of(creator));
            }
        }
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::RosterEntry;
    use proptest::prelude::*;

    fn node(n: u8) -> NodeId {
        NodeId::new([n; 32])
    }

    fn tipset(entries: &[(u8, Generation)]) -> Tipset {
        let mut t = Tipset::new();
        for &(n, g) in entries {
            t = t.advance(node(n), g);
        }
        t
    }

    #[test]
    fn test_merge_takes_maximum_per_creator() {
        let a = tipset(&[(1, 3), (2, 1)]);
        let b = tipset(&[(2, 5), (3, 2)]);

        let merged = Tipset::merge([&a, &b]);

        assert_eq!(merged.tip(&node(1)), 3);
        assert_eq!(merged.tip(&node(2)), 5);
        assert_eq!(merged.tip(&node(3)), 2);
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn test_advance_never_decreases() {
        let t = Tipset::new().advance(node(1), 5).advance(node(1), 3);
        assert_eq!(t.tip(&node(1)), 5);
    }

    #[test]
    fn test_absent_creator_reads_zero() {
        let t = Tipset::new();
        assert_eq!(t.tip(&node(42)), 0);
        assert!(!t.contains(&node(42)));
    }

    #[test]
    fn test_self_advancement_excluded_from_score() {
        let roster = Roster::new(vec![
            RosterEntry::new(node(1), 1),
            RosterEntry::new(node(2), 1),
        ])
        .unwrap();

        let snapshot = tipset(&[(1, 0), (2, 0)]);
        let other = tipset(&[(1, 9), (2, 0)]);

        // Only n1 advanced, and n1 is self
        assert_eq!(snapshot.weighted_advancement(&node(1), &other, &roster), 0);
    }

    #[test]
    fn test_weighted_advancement_sums_weights() {
        let roster = Roster::new(vec![
            RosterEntry::new(node(1), 5),
            RosterEntry::new(node(2), 7),
            RosterEntry::new(node(3), 11),
        ])
        .unwrap();

        let snapshot = tipset(&[(2, 1)]);
        let other = tipset(&[(1, 4), (2, 2), (3, 1)]);

        // n2 advanced (1 -> 2) and n3 advanced (absent -> 1); n1 is self
        assert_eq!(
            snapshot.weighted_advancement(&node(1), &other, &roster),
            7 + 11
        );
    }

    proptest! {
        /// Merging is dominated by its inputs: every tip in the merge equals
        /// the maximum of the corresponding input tips.
        #[test]
        fn prop_merge_is_pointwise_maximum(
            a in proptest::collection::vec((0u8..8, 0u64..100), 0..8),
            b in proptest::collection::vec((0u8..8, 0u64..100), 0..8),
        ) {
            let ta = tipset(&a);
            let tb = tipset(&b);
            let merged = Tipset::merge([&ta, &tb]);

            for n in 0u8..8 {
                let id = node(n);
                prop_assert_eq!(merged.tip(&id), ta.tip(&id).max(tb.tip(&id)));
            }
        }

        /// Advancing never lowers any tip.
        #[test]
        fn prop_advance_is_monotonic(
            base in proptest::collection::vec((0u8..8, 0u64..100), 0..8),
            n in 0u8..8,
            g in 0u64..100,
        ) {
            let before = tipset(&base);
            let after = before.clone().advance(node(n), g);

            for m in 0u8..8 {
                let id = node(m);
                prop_assert!(after.tip(&id) >= before.tip(&id));
            }
            prop_assert!(after.tip(&node(n)) >= g);
        }
    }
}
