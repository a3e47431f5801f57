//! Tracking of childless events ("tips")
//!
//! An event is a tip while no registered event names it as a parent. The
//! tips of other creators are the only candidates for the other parent of a
//! new self event.

use braid_core::event::EventFingerprint;
use braid_core::types::{EventHash, Generation};
use hashbrown::{HashMap, HashSet};
use std::collections::BTreeMap;

/// Set of events with no known children
#[derive(Debug, Default)]
pub struct ChildlessEventTracker {
    events: HashMap<EventHash, EventFingerprint>,
    /// Generation index for sublinear pruning
    by_generation: BTreeMap<Generation, HashSet<EventHash>>,
}

impl ChildlessEventTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an event: it becomes a tip, and its parents stop being tips
    pub fn add_event(&mut self, event: EventFingerprint, parents: &[EventFingerprint]) {
        self.insert(event);
        self.register_self_event_parents(parents);
    }

    /// Remove the parents consumed by a freshly built self event. Self
    /// events themselves are never candidates, so only their parents are
    /// recorded here.
    pub fn register_self_event_parents(&mut self, parents: &[EventFingerprint]) {
        for parent in parents {
            self.remove(&parent.hash);
        }
    }

    /// Drop all tips below the non-ancient window
    pub fn prune_old_events(&mut self, minimum_generation_non_ancient: Generation) {
        let retained = self.by_generation.split_off(&minimum_generation_non_ancient);
        let evicted = std::mem::replace(&mut self.by_generation, retained);
        for hashes in evicted.into_values() {
            for hash in hashes {
                self.events.remove(&hash);
            }
        }
    }

    /// Snapshot of all current tips; safe for the caller to shuffle/filter
    pub fn childless_events(&self) -> Vec<EventFingerprint> {
        self.events.values().copied().collect()
    }

    pub fn contains(&self, hash: &EventHash) -> bool {
        self.events.contains_key(hash)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    fn insert(&mut self, event: EventFingerprint) {
        if self.events.insert(event.hash, event).is_none() {
            self.by_generation
                .entry(event.generation)
                .or_default()
                .insert(event.hash);
        }
    }

    fn remove(&mut self, hash: &EventHash) {
        if let Some(event) = self.events.remove(hash) {
            if let Some(bucket) = self.by_generation.get_mut(&event.generation) {
                bucket.remove(hash);
                if bucket.is_empty() {
                    self.by_generation.remove(&event.generation);
                }
            }
        }
    }
}
