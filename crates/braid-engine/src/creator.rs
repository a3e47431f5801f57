//! The tipset event creator: decides whether this node should create a new
//! event and which peer tip to use as the other parent.
//!
//! Two creation strategies exist. The optimize path picks the candidate
//! whose tipset yields the highest weighted advancement over the current
//! snapshot. The bully-relief path instead favors peers whose events this
//! node has repeatedly failed to incorporate, selected at random with
//! probability proportional to their bully score. The relief path is taken
//! with a probability that grows with the node's overall bully score.

use crate::childless_tracker::ChildlessEventTracker;
use crate::pool::TransactionPool;
use crate::score::TipsetScoreCalculator;
use crate::time::TimeSource;
use crate::tipset_tracker::TipsetTracker;
use braid_core::error::{BraidError, Result};
use braid_core::event::{EventFingerprint, GossipEvent, UnsignedEvent};
use braid_core::roster::Roster;
use braid_core::types::{constants, EventHash, Generation, NodeId};
use braid_crypto::KeyPair;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Signer for freshly hashed events
pub trait EventSigner: Send {
    fn sign(&self, hash: &EventHash) -> Result<Vec<u8>>;
}

impl EventSigner for KeyPair {
    fn sign(&self, hash: &EventHash) -> Result<Vec<u8>> {
        Ok(KeyPair::sign(self, hash.as_bytes()).to_vec())
    }
}

/// Tunables for the creation strategy
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EventCreationConfig {
    /// Divisor applied to the bully score when computing the probability of
    /// taking the bully-relief path. Floored at 1.0.
    pub anti_bullying_factor: f64,

    /// Number of progress snapshots retained for bully scoring
    pub snapshot_history_size: usize,
}

impl Default for EventCreationConfig {
    fn default() -> Self {
        Self {
            anti_bullying_factor: constants::DEFAULT_ANTI_BULLYING_FACTOR,
            snapshot_history_size: constants::DEFAULT_SNAPSHOT_HISTORY_SIZE,
        }
    }
}

/// This node's most recently created event
#[derive(Clone, Copy, Debug)]
struct SelfEvent {
    fingerprint: EventFingerprint,
    created_at: i64,
    transaction_count: usize,
}

/// The event-creation decision engine.
///
/// Owns all mutable tracking state for one node-run. Single-writer: callers
/// must serialize `register_event`, `set_minimum_generation_non_ancient` and
/// `maybe_create_event` onto one logical thread of control.
pub struct TipsetEventCreator {
    self_id: NodeId,
    anti_bullying_factor: f64,
    signer: Box<dyn EventSigner>,
    pool: Box<dyn TransactionPool>,
    time: Arc<dyn TimeSource>,
    rng: Box<dyn RngCore + Send>,
    tipset_tracker: TipsetTracker,
    childless_tracker: ChildlessEventTracker,
    score_calculator: TipsetScoreCalculator,
    /// None only before the very first event this node has ever created
    last_self_event: Option<SelfEvent>,
}

impl TipsetEventCreator {
    pub fn new(
        self_id: NodeId,
        roster: Arc<Roster>,
        config: EventCreationConfig,
        signer: Box<dyn EventSigner>,
        pool: Box<dyn TransactionPool>,
        time: Arc<dyn TimeSource>,
        rng: Box<dyn RngCore + Send>,
    ) -> Self {
        let anti_bullying_factor = config
            .anti_bullying_factor
            .max(constants::MINIMUM_ANTI_BULLYING_FACTOR);

        Self {
            self_id,
            anti_bullying_factor,
            signer,
            pool,
            time,
            rng,
            tipset_tracker: TipsetTracker::new(),
            childless_tracker: ChildlessEventTracker::new(),
            score_calculator: TipsetScoreCalculator::new(
                self_id,
                roster,
                config.snapshot_history_size,
            ),
            last_self_event: None,
        }
    }

    pub fn self_id(&self) -> &NodeId {
        &self.self_id
    }

    /// Fingerprint of this node's newest event, if any
    pub fn last_self_event(&self) -> Option<&EventFingerprint> {
        self.last_self_event.as_ref().map(|e| &e.fingerprint)
    }

    /// Current overall bully score, for metrics
    pub fn max_bully_score(&self) -> u64 {
        self.score_calculator
            .max_bully_score(self.tipset_tracker.latest_generations())
    }

    /// Current unconfirmed progress ratio, for metrics
    pub fn score_ratio(&self) -> f64 {
        self.score_calculator.score_ratio()
    }

    /// Register an event received from gossip.
    ///
    /// Self-created events are duplicates of something already created here
    /// and are ignored, unless they are newer than `last_self_event`: that
    /// is the restart/recovery case, where the event is adopted without
    /// re-scoring.
    pub fn register_event(&mut self, event: &GossipEvent) {
        let fingerprint = event.fingerprint();
        if fingerprint.generation < self.tipset_tracker.minimum_generation_non_ancient() {
            tracing::trace!(event = %fingerprint.hash, "ignoring ancient event");
            return;
        }

        if event.creator() == &self.self_id {
            let newer = self
                .last_self_event
                .map(|last| fingerprint.generation > last.fingerprint.generation)
                .unwrap_or(true);
            if newer {
                let parents = event.parents();
                self.tipset_tracker.add_event(fingerprint, &parents);
                // The recovered event consumed these tips when it was
                // originally created; they must not be candidates again
                self.childless_tracker.register_self_event_parents(&parents);
                self.last_self_event = Some(SelfEvent {
                    fingerprint,
                    created_at: event.created_at(),
                    transaction_count: event.transactions().len(),
                });
                tracing::info!(
                    generation = fingerprint.generation,
                    "adopted own event from gossip"
                );
            }
            return;
        }

        self.tipset_tracker.add_event(fingerprint, &event.parents());
        self.childless_tracker.add_event(fingerprint, &event.parents());
    }

    /// Advance the non-ancient window across all tracking structures
    pub fn set_minimum_generation_non_ancient(&mut self, generation: Generation) {
        self.tipset_tracker
            .set_minimum_generation_non_ancient(generation);
        self.childless_tracker.prune_old_events(generation);
    }

    /// Run one creation cycle: either produce a fully formed, signed and
    /// registered event, or decide that no event should be created now.
    pub fn maybe_create_event(&mut self) -> Result<Option<GossipEvent>> {
        let bully_score = self.max_bully_score();
        let relief_probability =
            ((bully_score as f64 - 1.0) / self.anti_bullying_factor).max(0.0);

        if relief_probability > 0.0 && self.rng.gen::<f64>() < relief_probability {
            if let Some(other_parent) = self.select_nerd_parent()? {
                tracing::debug!(
                    other_parent = %other_parent.hash,
                    creator = %other_parent.creator,
                    "creating event to relieve a bullied peer"
                );
                return self.build_event(Some(other_parent)).map(Some);
            }
            // No nerd qualifies; fall through to the optimize path
        }

        self.create_event_by_optimization()
    }

    /// Optimize path: pick the candidate with the highest theoretical
    /// advancement score. Candidates are shuffled first so ties break
    /// uniformly at random.
    fn create_event_by_optimization(&mut self) -> Result<Option<GossipEvent>> {
        let mut candidates = self.childless_tracker.childless_events();
        candidates.shuffle(&mut *self.rng);

        let mut best: Option<EventFingerprint> = None;
        let mut best_score = 0;
        for candidate in &candidates {
            if candidate.creator == self.self_id {
                continue;
            }
            let score = self
                .score_calculator
                .theoretical_advancement_score(std::slice::from_ref(candidate), &self.tipset_tracker);
            if best.is_none() || score > best_score {
                best = Some(*candidate);
                best_score = score;
            }
        }

        if self.last_self_event.is_some() && best_score == 0 {
            // A non-genesis node never creates a zero-progress event
            tracing::trace!("no candidate advances consensus, skipping creation this cycle");
            return Ok(None);
        }

        self.build_event(best).map(Some)
    }

    /// Bully-relief path: select among "nerds" (peers with bully score
    /// above one whose tips would still advance consensus) with probability
    /// proportional to their bully score.
    fn select_nerd_parent(&mut self) -> Result<Option<EventFingerprint>> {
        let candidates = self.childless_tracker.childless_events();

        let mut nerds = Vec::new();
        let mut cumulative_weights = Vec::new();
        let mut total_weight = 0u64;
        for candidate in candidates {
            if candidate.creator == self.self_id {
                continue;
            }
            let advancement = self
                .score_calculator
                .theoretical_advancement_score(std::slice::from_ref(&candidate), &self.tipset_tracker);
            if advancement == 0 {
                continue;
            }
            let bully_score = self.score_calculator.bully_score_for(
                &candidate.creator,
                self.tipset_tracker.latest_generations(),
            );
            if bully_score <= 1 {
                continue;
            }
            total_weight += bully_score;
            nerds.push(candidate);
            cumulative_weights.push(total_weight);
        }

        if nerds.is_empty() {
            return Ok(None);
        }

        // Explicit cumulative-weight array, single draw
        let draw = self.rng.gen_range(0..total_weight);
        for (nerd, bound) in nerds.iter().zip(&cumulative_weights) {
            if draw < *bound {
                return Ok(Some(*nerd));
            }
        }

        tracing::error!("weighted selection failed over a non-empty nerd set");
        Err(BraidError::NerdSelectionFailed)
    }

    /// Assemble, sign and register a new self event
    fn build_event(&mut self, other_parent: Option<EventFingerprint>) -> Result<GossipEvent> {
        // Candidates come from the childless tracker, which is pruned in
        // lockstep with the tipset tracker; a missing tipset here means the
        // registration order was broken
        if let Some(parent) = &other_parent {
            if self.tipset_tracker.get_tipset(&parent.hash).is_none() {
                tracing::error!(parent = %parent.hash, "selected other parent has no tipset");
                return Err(BraidError::TipsetNotFound(parent.hash));
            }
        }

        let self_parent = self.last_self_event.as_ref().map(|e| e.fingerprint);

        let now = self.time.now_nanos();
        let created_at = match &self.last_self_event {
            // Strictly after the previous event, offset by its transaction
            // count so a single fast node cannot burst unboundedly
            Some(previous) => {
                let minimum_increment = previous.transaction_count.max(1) as i64;
                now.max(previous.created_at + minimum_increment)
            }
            None => now,
        };

        let transactions = self.pool.pending_transactions()?;
        let unsigned = UnsignedEvent::new(
            self.self_id,
            self_parent,
            other_parent,
            created_at,
            transactions,
        );
        let hash = unsigned.hash();
        let signature = self.signer.sign(&hash)?;
        let event = unsigned.into_signed(signature);

        let fingerprint = event.fingerprint();
        let parents = event.parents();
        let tipset = self.tipset_tracker.add_event(fingerprint, &parents);
        self.childless_tracker.register_self_event_parents(&parents);
        let improvement = self
            .score_calculator
            .add_event_and_get_advancement_score(&fingerprint, &tipset)?;

        self.last_self_event = Some(SelfEvent {
            fingerprint,
            created_at,
            transaction_count: event.transactions().len(),
        });

        tracing::debug!(
            event = %fingerprint.hash,
            generation = fingerprint.generation,
            improvement,
            "created self event"
        );

        Ok(event)
    }
}
