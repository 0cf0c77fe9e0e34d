// Leaderkey Behavior Dispatch
// Press/release of a matched sequence's binding on the behavior engine

use crate::sequence::{BehaviorBinding, SequenceDefinition};
use crate::{KeyPosition, Timestamp};

/// External behavior execution engine.
///
/// The leader only decides which binding to press or release and when.
/// What the behavior does is up to the engine, and any error it returns is
/// passed back to the caller of the leader unchanged.
pub trait BehaviorEngine {
    type Error;

    fn binding_pressed(
        &mut self,
        binding: &BehaviorBinding,
        position: KeyPosition,
        timestamp: Timestamp,
    ) -> Result<(), Self::Error>;

    fn binding_released(
        &mut self,
        binding: &BehaviorBinding,
        position: KeyPosition,
        timestamp: Timestamp,
    ) -> Result<(), Self::Error>;
}

impl<B: BehaviorEngine + ?Sized> BehaviorEngine for &mut B {
    type Error = B::Error;

    fn binding_pressed(
        &mut self,
        binding: &BehaviorBinding,
        position: KeyPosition,
        timestamp: Timestamp,
    ) -> Result<(), Self::Error> {
        (**self).binding_pressed(binding, position, timestamp)
    }

    fn binding_released(
        &mut self,
        binding: &BehaviorBinding,
        position: KeyPosition,
        timestamp: Timestamp,
    ) -> Result<(), Self::Error> {
        (**self).binding_released(binding, position, timestamp)
    }
}

/// Press the sequence's binding at its virtual position
pub fn press_sequence<B: BehaviorEngine + ?Sized>(
    engine: &mut B,
    sequence: &SequenceDefinition,
    timestamp: Timestamp,
) -> Result<(), B::Error> {
    log::debug!(
        "Leader pressing {} at virtual position {}",
        sequence.binding,
        sequence.virtual_position
    );
    engine.binding_pressed(&sequence.binding, sequence.virtual_position, timestamp)
}

/// Release the sequence's binding at its virtual position
pub fn release_sequence<B: BehaviorEngine + ?Sized>(
    engine: &mut B,
    sequence: &SequenceDefinition,
    timestamp: Timestamp,
) -> Result<(), B::Error> {
    log::debug!(
        "Leader releasing {} at virtual position {}",
        sequence.binding,
        sequence.virtual_position
    );
    engine.binding_released(&sequence.binding, sequence.virtual_position, timestamp)
}
