//! Weighted consensus-progress scoring
//!
//! The calculator owns this node's notion of progress: a snapshot tipset
//! holding the last supermajority-confirmed position, a bounded history of
//! past snapshots, and the score not yet locked in by a supermajority.
//!
//! The snapshot history also drives the fairness heuristic: walking it
//! newest-to-oldest reveals how many consecutive snapshots failed to
//! incorporate a given peer's events (that peer's "bully score").

use crate::tipset_tracker::TipsetTracker;
use braid_core::error::{BraidError, Result};
use braid_core::event::EventFingerprint;
use braid_core::roster::Roster;
use braid_core::tipset::Tipset;
use braid_core::types::{NodeId, Weight};
use std::collections::VecDeque;
use std::sync::Arc;

/// State machine over (snapshot, history, previous score). Mutated only by
/// `add_event_and_get_advancement_score`, called exactly once per event this
/// node creates.
#[derive(Debug)]
pub struct TipsetScoreCalculator {
    self_id: NodeId,
    roster: Arc<Roster>,
    snapshot: Tipset,
    /// Past snapshots, oldest first; always contains the current snapshot
    /// as its newest element
    snapshot_history: VecDeque<Tipset>,
    history_capacity: usize,
    /// Progress not yet confirmed by a supermajority
    previous_score: Weight,
    maximum_possible_score: Weight,
}

impl TipsetScoreCalculator {
    pub fn new(self_id: NodeId, roster: Arc<Roster>, history_capacity: usize) -> Self {
        let history_capacity = history_capacity.max(1);
        let snapshot = Tipset::new();
        let mut snapshot_history = VecDeque::with_capacity(history_capacity + 1);
        snapshot_history.push_back(snapshot.clone());

        let maximum_possible_score = roster.total_weight() - roster.weight_of(&self_id);

        Self {
            self_id,
            roster,
            snapshot,
            snapshot_history,
            history_capacity,
            previous_score: 0,
            maximum_possible_score,
        }
    }

    /// The total weight of everyone else: a node's own advancement is
    /// structurally excluded from its score.
    pub fn maximum_possible_score(&self) -> Weight {
        self.maximum_possible_score
    }

    pub fn previous_score(&self) -> Weight {
        self.previous_score
    }

    pub fn snapshot(&self) -> &Tipset {
        &self.snapshot
    }

    /// Unconfirmed progress as a fraction of the maximum possible score
    pub fn score_ratio(&self) -> f64 {
        if self.maximum_possible_score == 0 {
            0.0
        } else {
            self.previous_score as f64 / self.maximum_possible_score as f64
        }
    }

    /// Record a new self event and report how much closer it moved this node
    /// to a supermajority.
    ///
    /// If the event's score plus the node's own weight forms a strict
    /// supermajority of the total weight, the event's tipset becomes the new
    /// snapshot and the unconfirmed score resets. Returns the score gained
    /// relative to the previous call.
    pub fn add_event_and_get_advancement_score(
        &mut self,
        event: &EventFingerprint,
        event_tipset: &Tipset,
    ) -> Result<Weight> {
        if event.creator != self.self_id {
            tracing::error!(creator = %event.creator, "scored an event created by another node");
            return Err(BraidError::NotSelfEvent(event.creator));
        }

        let score = self
            .snapshot
            .weighted_advancement(&self.self_id, event_tipset, &self.roster);
        if score > self.maximum_possible_score {
            tracing::error!(
                score,
                maximum = self.maximum_possible_score,
                "advancement score exceeds theoretical maximum"
            );
            return Err(BraidError::ScoreExceedsMaximum {
                score,
                maximum: self.maximum_possible_score,
            });
        }

        let improvement = score.saturating_sub(self.previous_score);

        let self_weight = self.roster.weight_of(&self.self_id);
        if self.roster.is_strict_supermajority(score + self_weight) {
            self.snapshot = event_tipset.clone();
            self.snapshot_history.push_back(self.snapshot.clone());
            if self.snapshot_history.len() > self.history_capacity {
                self.snapshot_history.pop_front();
            }
            self.previous_score = 0;
        } else {
            self.previous_score = score;
        }

        Ok(improvement)
    }

    /// Score a hypothetical event with the given other-parent candidates,
    /// without committing to them. Only the candidates' tipsets are merged;
    /// the node's own next generation is deliberately not included.
    pub fn theoretical_advancement_score(
        &self,
        parents: &[EventFingerprint],
        tracker: &TipsetTracker,
    ) -> Weight {
        let parent_tipsets: Vec<&Tipset> = parents
            .iter()
            .filter_map(|parent| tracker.get_tipset(&parent.hash))
            .collect();
        let merged = Tipset::merge(parent_tipsets);
        self.snapshot
            .weighted_advancement(&self.self_id, &merged, &self.roster)
    }

    /// How many consecutive snapshots, newest to oldest, failed to advance
    /// using this creator's events even though unused events were available.
    ///
    /// `latest_generations` is the tracker's record of the newest generation
    /// actually seen from each creator.
    pub fn bully_score_for(&self, node: &NodeId, latest_generations: &Tipset) -> u64 {
        let latest = latest_generations.tip(node);
        let mut score = 0u64;

        let mut iter = self.snapshot_history.iter().rev();
        let Some(mut newer) = iter.next() else {
            return 0;
        };
        for older in iter {
            let older_tip = older.tip(node);
            if older_tip == latest {
                // Every available event from this creator was already used
                break;
            }
            if newer.tip(node) > older_tip {
                // Our ancestry advanced using this creator's events
                break;
            }
            score += 1;
            newer = older;
        }
        score
    }

    /// The node's overall bully score: the maximum over all roster members.
    /// A high value means this node keeps failing to fold some peer's
    /// events into its own ancestry.
    pub fn max_bully_score(&self, latest_generations: &Tipset) -> u64 {
        self.roster
            .iter()
            .map(|entry| self.bully_score_for(&entry.node_id, latest_generations))
            .max()
            .unwrap_or(0)
    }
}
