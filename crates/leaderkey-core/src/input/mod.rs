// Leaderkey Input Layer
// Position events consumed by the leader state machine

mod event;

pub use event::{EventOutcome, KeyState, PositionEvent};
