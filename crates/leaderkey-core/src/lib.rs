// Leaderkey Core Library
// Leader key sequence registry, matcher and dispatcher

pub mod behavior;
pub mod gesture;
pub mod input;
pub mod layer;
pub mod leader;
pub mod position;
pub mod registry;
pub mod sequence;

#[cfg(feature = "runtime")]
pub mod config;

#[cfg(feature = "runtime")]
pub mod event;

pub use behavior::{press_sequence, release_sequence, BehaviorEngine};
pub use gesture::{Candidates, GestureState};
pub use input::{EventOutcome, KeyState, PositionEvent};
pub use layer::{LayerError, LayerStack, LayerState};
pub use leader::Leader;
pub use position::{KeyPosition, Timestamp};
pub use registry::{
    Registry, RegistryError, SequenceId, MAX_KEYMAP_LEN, MAX_KEYS_PER_SEQUENCE,
    MAX_SEQUENCES_PER_KEY,
};
pub use sequence::{BehaviorBinding, LayerScope, SequenceDefinition};

#[cfg(feature = "runtime")]
pub use config::{Config, ConfigError};

#[cfg(feature = "runtime")]
pub use event::{Replay, ReplayError, ReplayReport, ScriptCommand, ScriptError, SequenceTimeout};
