//! Sliding-window tracking of event tipsets
//!
//! Maps event identity to the tipset implied by its ancestry. The window is
//! keyed by generation: once the consensus layer advances the minimum
//! non-ancient generation, everything below it is evicted. A missing parent
//! during insertion means the parent is ancient or unknown and is skipped,
//! never treated as an error.

use braid_core::event::EventFingerprint;
use braid_core::tipset::Tipset;
use braid_core::types::{EventHash, Generation};
use hashbrown::{HashMap, HashSet};
use std::collections::BTreeMap;

/// Mutable mapping from event hash to tipset, windowed by the minimum
/// non-ancient generation. One instance lives for one node-run.
#[derive(Debug, Default)]
pub struct TipsetTracker {
    tipsets: HashMap<EventHash, Tipset>,
    /// Generation index for sublinear window eviction
    by_generation: BTreeMap<Generation, HashSet<EventHash>>,
    /// Highest generation seen so far from each creator, regardless of
    /// whose ancestry it appears in. Feeds fairness (bully) scoring.
    latest_generations: Tipset,
    minimum_generation_non_ancient: Generation,
}

impl TipsetTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn minimum_generation_non_ancient(&self) -> Generation {
        self.minimum_generation_non_ancient
    }

    /// Shift the non-ancient window, evicting all tipsets below it
    pub fn set_minimum_generation_non_ancient(&mut self, generation: Generation) {
        self.minimum_generation_non_ancient = generation;

        let retained = self.by_generation.split_off(&generation);
        let evicted = std::mem::replace(&mut self.by_generation, retained);
        for hashes in evicted.into_values() {
            for hash in hashes {
                self.tipsets.remove(&hash);
            }
        }
    }

    /// Register an event and compute its tipset by merging the tipsets of
    /// its parents and advancing the creator's own entry.
    ///
    /// Must be called before any later event references this one as a
    /// parent. Ancient events are computed but not retained.
    pub fn add_event(&mut self, event: EventFingerprint, parents: &[EventFingerprint]) -> Tipset {
        let parent_tipsets: Vec<&Tipset> = parents
            .iter()
            .filter_map(|parent| self.tipsets.get(&parent.hash))
            .collect();

        let tipset = if parent_tipsets.is_empty() {
            Tipset::new().advance(event.creator, event.generation)
        } else {
            Tipset::merge(parent_tipsets).advance(event.creator, event.generation)
        };

        let latest = std::mem::take(&mut self.latest_generations);
        self.latest_generations = latest.advance(event.creator, event.generation);

        if event.generation >= self.minimum_generation_non_ancient {
            self.tipsets.insert(event.hash, tipset.clone());
            self.by_generation
                .entry(event.generation)
                .or_default()
                .insert(event.hash);
        }

        tipset
    }

    /// Tipset for an event; absent means ancient or unknown
    pub fn get_tipset(&self, hash: &EventHash) -> Option<&Tipset> {
        self.tipsets.get(hash)
    }

    /// Highest generation seen per creator across all registered events
    pub fn latest_generations(&self) -> &Tipset {
        &self.latest_generations
    }

    pub fn len(&self) -> usize {
        self.tipsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tipsets.is_empty()
    }
}
