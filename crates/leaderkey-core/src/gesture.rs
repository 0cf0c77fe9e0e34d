// Leaderkey Gesture State
// Prefix tracking and candidate narrowing for one leader gesture

use smallvec::SmallVec;

use crate::registry::{Registry, SequenceId, MAX_KEYS_PER_SEQUENCE, MAX_SEQUENCES_PER_KEY};
use crate::KeyPosition;

/// Candidate sequences, a filtered view of one registry bucket.
pub type Candidates = SmallVec<[SequenceId; MAX_SEQUENCES_PER_KEY]>;

/// Mutable state of the single in-flight leader gesture.
///
/// Every candidate agrees with `prefix` on its first `depth` keys, and the
/// candidates keep the bucket's priority order.
#[derive(Debug, Clone, Default)]
pub struct GestureState {
    active: bool,
    anchor: Option<KeyPosition>,
    depth: usize,
    prefix: SmallVec<[KeyPosition; MAX_KEYS_PER_SEQUENCE]>,
    candidates: Candidates,
}

impl GestureState {
    /// Create an inactive gesture
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Position of the leader key that started the gesture
    pub fn anchor(&self) -> Option<KeyPosition> {
        self.anchor
    }

    /// Number of keys consumed so far, the index of the next expected key
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Key positions recorded so far
    pub fn prefix(&self) -> &[KeyPosition] {
        &self.prefix
    }

    /// Candidates from the most recent event
    pub fn candidates(&self) -> &[SequenceId] {
        &self.candidates
    }

    /// Start a gesture anchored at `position`, discarding any previous one
    pub fn start(&mut self, position: KeyPosition) {
        self.reset();
        self.active = true;
        self.anchor = Some(position);
    }

    /// Return to the inactive state
    pub fn reset(&mut self) {
        self.active = false;
        self.anchor = None;
        self.depth = 0;
        self.prefix.clear();
        self.clear_candidates();
    }

    pub fn clear_candidates(&mut self) {
        self.candidates.clear();
    }

    pub(crate) fn set_candidates(&mut self, candidates: Candidates) {
        self.candidates = candidates;
    }

    /// True if no key has been recorded at the current depth yet
    pub(crate) fn is_unrecorded(&self) -> bool {
        self.prefix.len() <= self.depth
    }

    /// Record `position` as the key at the current depth
    pub(crate) fn record(&mut self, position: KeyPosition) {
        self.prefix.truncate(self.depth);
        if self.prefix.len() < MAX_KEYS_PER_SEQUENCE {
            self.prefix.push(position);
        }
    }

    /// Move on to expect the next key
    pub(crate) fn advance(&mut self) {
        if self.depth < MAX_KEYS_PER_SEQUENCE {
            self.depth += 1;
        }
    }

    /// Find the sequences still consistent with the gesture once `position`
    /// is observed at the current depth on `layer`.
    ///
    /// A sequence qualifies when it is eligible on `layer`, its key at the
    /// current depth is `position`, and its earlier keys equal the prefix.
    /// The result keeps bucket order; an empty result means no configured
    /// sequence can complete. This does not modify the gesture.
    pub fn find_candidates(
        &self,
        registry: &Registry,
        position: KeyPosition,
        layer: u8,
    ) -> Candidates {
        log::debug!("Leader finding candidates for position {}", position);
        let Some(consumed) = self.prefix.get(..self.depth) else {
            return Candidates::new();
        };

        let candidates: Candidates = registry
            .lookup(position)
            .filter(|(_, def)| {
                def.layer_scope.is_active_on(layer)
                    && def.key_at(self.depth) == Some(position)
                    && def.starts_with(consumed)
            })
            .map(|(id, _)| id)
            .collect();

        log::debug!("Leader found {} candidates", candidates.len());
        candidates
    }
}
