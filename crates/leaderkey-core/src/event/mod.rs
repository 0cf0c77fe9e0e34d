// Leaderkey Event Handling
// Scripted event replay with the sequence timeout collaborator

pub mod replay;
pub mod script;
pub mod timeout;

pub use replay::{Dispatch, Replay, ReplayError, ReplayReport, ReplayStep, TraceBehaviors};
pub use script::{parse_script, ScriptCommand, ScriptError};
pub use timeout::SequenceTimeout;
