// Leaderkey State Machine
// Drives one leader gesture from activation to resolution or abandonment

use crate::behavior::{press_sequence, release_sequence, BehaviorEngine};
use crate::gesture::GestureState;
use crate::input::{EventOutcome, PositionEvent};
use crate::layer::LayerState;
use crate::registry::Registry;
use crate::sequence::SequenceDefinition;
use crate::{KeyPosition, Timestamp};

/// Leader key sequence matcher.
///
/// Owns the registry built at start-up and the single gesture state. While
/// a gesture is active every position event other than the leader key's own
/// is matched against the registry:
///
/// - no candidate left: the gesture ends and the event falls through
/// - key-down: the top candidate's binding is pressed
/// - key-up: the top candidate's binding is released; a unique candidate
///   ends the gesture, otherwise the next key is expected
#[derive(Debug, Clone)]
pub struct Leader {
    registry: Registry,
    gesture: GestureState,
}

impl Leader {
    /// Create an inactive leader over a fully built registry
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            gesture: GestureState::new(),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn gesture(&self) -> &GestureState {
        &self.gesture
    }

    pub fn is_active(&self) -> bool {
        self.gesture.is_active()
    }

    /// Highest priority candidate from the last matched event
    pub fn top_candidate(&self) -> Option<&SequenceDefinition> {
        self.gesture
            .candidates()
            .first()
            .and_then(|&id| self.registry.get(id))
    }

    /// Start a gesture anchored at the leader key `position`.
    ///
    /// Activating while a gesture is in flight starts over.
    pub fn activate(&mut self, position: KeyPosition, timestamp: Timestamp) {
        log::debug!("Leader key activated at position {} @{}", position, timestamp);
        self.gesture.start(position);
    }

    /// End the current gesture. Calling it while inactive does nothing.
    pub fn deactivate(&mut self) {
        if self.gesture.is_active() {
            log::debug!("Leader key deactivated");
        }
        self.gesture.reset();
    }

    /// Handle a position state change.
    ///
    /// Returns `Unhandled` while inactive, for the leader key itself, and for
    /// the event that leaves no candidate (which also ends the gesture).
    /// Behavior engine errors are returned after the gesture state has been
    /// updated; nothing is rolled back.
    pub fn on_position_event<L, B>(
        &mut self,
        event: PositionEvent,
        layers: &L,
        behaviors: &mut B,
    ) -> Result<EventOutcome, B::Error>
    where
        L: LayerState + ?Sized,
        B: BehaviorEngine + ?Sized,
    {
        if !self.gesture.is_active() || self.gesture.anchor() == Some(event.position) {
            return Ok(EventOutcome::Unhandled);
        }

        let layer = layers.highest_active_layer();
        let candidates = self
            .gesture
            .find_candidates(&self.registry, event.position, layer);
        let Some(&top_id) = candidates.first() else {
            log::debug!("Leader found no sequence for {}, abandoning", event);
            self.deactivate();
            return Ok(EventOutcome::Unhandled);
        };
        let unique = candidates.len() == 1;
        self.gesture.set_candidates(candidates);
        let top = self.registry.definition(top_id);

        if event.is_pressed() {
            self.gesture.record(event.position);
            press_sequence(behaviors, top, event.timestamp)?;
            return Ok(EventOutcome::Handled);
        }

        let released = release_sequence(behaviors, top, event.timestamp);
        if unique {
            log::debug!("Leader sequence {} resolved", top);
            self.deactivate();
        } else {
            if self.gesture.is_unrecorded() {
                self.gesture.record(event.position);
            }
            self.gesture.advance();
        }
        released?;
        Ok(EventOutcome::Handled)
    }
}
