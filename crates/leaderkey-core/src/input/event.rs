// Leaderkey Input Events
// Position state changes and the handled/unhandled outcome

use std::fmt;

use crate::{KeyPosition, Timestamp};

/// State of a key position after a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyState {
    Released,
    Pressed,
}

impl KeyState {
    /// Returns true for a key-down
    pub fn is_pressed(self) -> bool {
        matches!(self, KeyState::Pressed)
    }

    /// Returns true for a key-up
    pub fn is_released(self) -> bool {
        matches!(self, KeyState::Released)
    }
}

impl From<bool> for KeyState {
    fn from(pressed: bool) -> Self {
        if pressed {
            KeyState::Pressed
        } else {
            KeyState::Released
        }
    }
}

impl fmt::Display for KeyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyState::Released => write!(f, "release"),
            KeyState::Pressed => write!(f, "press"),
        }
    }
}

/// A physical key position changed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionEvent {
    pub position: KeyPosition,
    pub state: KeyState,
    pub timestamp: Timestamp,
}

impl PositionEvent {
    pub fn new(position: impl Into<KeyPosition>, state: KeyState, timestamp: Timestamp) -> Self {
        Self {
            position: position.into(),
            state,
            timestamp,
        }
    }

    /// Key-down at `position`
    pub fn pressed(position: impl Into<KeyPosition>, timestamp: Timestamp) -> Self {
        Self::new(position, KeyState::Pressed, timestamp)
    }

    /// Key-up at `position`
    pub fn released(position: impl Into<KeyPosition>, timestamp: Timestamp) -> Self {
        Self::new(position, KeyState::Released, timestamp)
    }

    pub fn is_pressed(&self) -> bool {
        self.state.is_pressed()
    }
}

impl fmt::Display for PositionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} @{}", self.state, self.position, self.timestamp)
    }
}

/// Whether the leader consumed an event.
///
/// `Unhandled` lets the event continue to normal key processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventOutcome {
    Handled,
    Unhandled,
}

impl EventOutcome {
    pub fn is_handled(self) -> bool {
        matches!(self, EventOutcome::Handled)
    }
}

impl fmt::Display for EventOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventOutcome::Handled => write!(f, "handled"),
            EventOutcome::Unhandled => write!(f, "unhandled"),
        }
    }
}
