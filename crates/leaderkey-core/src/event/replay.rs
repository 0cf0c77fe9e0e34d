// Leaderkey Replay
// Drives a leader, a layer stack and the timeout from an event script

use std::convert::Infallible;
use std::fmt;

use crate::behavior::BehaviorEngine;
use crate::config::{Config, ConfigError, LeaderConfig};
use crate::event::script::{parse_script, ScriptCommand, ScriptError};
use crate::event::timeout::SequenceTimeout;
use crate::input::{EventOutcome, KeyState, PositionEvent};
use crate::layer::{LayerError, LayerStack};
use crate::leader::Leader;
use crate::sequence::BehaviorBinding;
use crate::{KeyPosition, Timestamp};

/// Errors that can occur while replaying
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Script error: {0}")]
    Script(#[from] ScriptError),

    #[error("Layer error: {0}")]
    Layer(#[from] LayerError),
}

/// A binding press or release sent to the behavior engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub state: KeyState,
    pub binding: BehaviorBinding,
    pub position: KeyPosition,
    pub timestamp: Timestamp,
}

impl fmt::Display for Dispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} at {} @{}",
            self.state, self.binding, self.position, self.timestamp
        )
    }
}

/// Behavior engine that only records what it was asked to do.
#[derive(Debug, Default)]
pub struct TraceBehaviors {
    pending: Vec<Dispatch>,
}

impl TraceBehaviors {
    fn record(
        &mut self,
        state: KeyState,
        binding: &BehaviorBinding,
        position: KeyPosition,
        timestamp: Timestamp,
    ) {
        self.pending.push(Dispatch {
            state,
            binding: binding.clone(),
            position,
            timestamp,
        });
    }

    fn drain(&mut self) -> impl Iterator<Item = Dispatch> + '_ {
        self.pending.drain(..)
    }
}

impl BehaviorEngine for TraceBehaviors {
    type Error = Infallible;

    fn binding_pressed(
        &mut self,
        binding: &BehaviorBinding,
        position: KeyPosition,
        timestamp: Timestamp,
    ) -> Result<(), Infallible> {
        self.record(KeyState::Pressed, binding, position, timestamp);
        Ok(())
    }

    fn binding_released(
        &mut self,
        binding: &BehaviorBinding,
        position: KeyPosition,
        timestamp: Timestamp,
    ) -> Result<(), Infallible> {
        self.record(KeyState::Released, binding, position, timestamp);
        Ok(())
    }
}

/// Something that happened during a replay, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayStep {
    Activated { position: KeyPosition, timestamp: Timestamp },
    Deactivated,
    TimedOut { timestamp: Timestamp },
    Dispatched(Dispatch),
    Event { event: PositionEvent, outcome: EventOutcome },
    Layer { layer: u8, active: bool },
}

impl fmt::Display for ReplayStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplayStep::Activated { position, timestamp } => {
                write!(f, "leader activated at {} @{}", position, timestamp)
            }
            ReplayStep::Deactivated => write!(f, "leader deactivated"),
            ReplayStep::TimedOut { timestamp } => write!(f, "leader timed out @{}", timestamp),
            ReplayStep::Dispatched(dispatch) => write!(f, "  -> {}", dispatch),
            ReplayStep::Event { event, outcome } => write!(f, "{}: {}", event, outcome),
            ReplayStep::Layer { layer, active } => {
                write!(f, "layer {} {}", layer, if *active { "on" } else { "off" })
            }
        }
    }
}

/// Ordered record of a replay
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayReport {
    pub steps: Vec<ReplayStep>,
}

impl ReplayReport {
    /// Binding presses and releases in dispatch order
    pub fn dispatches(&self) -> impl Iterator<Item = &Dispatch> {
        self.steps.iter().filter_map(|step| match step {
            ReplayStep::Dispatched(dispatch) => Some(dispatch),
            _ => None,
        })
    }

    /// Outcome of every position event
    pub fn outcomes(&self) -> impl Iterator<Item = (&PositionEvent, EventOutcome)> {
        self.steps.iter().filter_map(|step| match step {
            ReplayStep::Event { event, outcome } => Some((event, *outcome)),
            _ => None,
        })
    }

    /// Number of gestures abandoned by timeout
    pub fn timeouts(&self) -> usize {
        self.steps
            .iter()
            .filter(|step| matches!(step, ReplayStep::TimedOut { .. }))
            .count()
    }
}

/// Replays scripted key activity through a leader.
///
/// Plays the parts of the firmware around the matcher: a press of the
/// configured leader position activates it, the layer stack answers layer
/// queries, and a `SequenceTimeout` abandons idle gestures.
#[derive(Debug)]
pub struct Replay {
    leader: Leader,
    settings: LeaderConfig,
    layers: LayerStack,
    timeout: SequenceTimeout,
    behaviors: TraceBehaviors,
    report: ReplayReport,
}

impl Replay {
    /// Build the registry from `config` and set up an inactive leader
    pub fn new(config: &Config) -> Result<Self, ReplayError> {
        let registry = config.build_registry()?;
        Ok(Self::with_leader(Leader::new(registry), config.leader))
    }

    pub fn with_leader(leader: Leader, settings: LeaderConfig) -> Self {
        Self {
            leader,
            settings,
            layers: LayerStack::new(),
            timeout: SequenceTimeout::new(),
            behaviors: TraceBehaviors::default(),
            report: ReplayReport::default(),
        }
    }

    pub fn leader(&self) -> &Leader {
        &self.leader
    }

    pub fn layers(&self) -> &LayerStack {
        &self.layers
    }

    pub fn timeout(&self) -> &SequenceTimeout {
        &self.timeout
    }

    /// Parse and replay a script, returning everything recorded so far
    pub fn run_script(&mut self, content: &str) -> Result<ReplayReport, ReplayError> {
        let commands = parse_script(content)?;
        self.run(&commands)
    }

    /// Replay commands in order
    pub fn run(&mut self, commands: &[ScriptCommand]) -> Result<ReplayReport, ReplayError> {
        for &command in commands {
            self.step(command)?;
        }
        Ok(self.report.clone())
    }

    /// Take the report, leaving an empty one behind
    pub fn take_report(&mut self) -> ReplayReport {
        std::mem::take(&mut self.report)
    }

    pub fn step(&mut self, command: ScriptCommand) -> Result<(), ReplayError> {
        log::trace!("Replaying {}", command);
        match command {
            ScriptCommand::Press(position, timestamp) => {
                self.position_event(PositionEvent::pressed(position, timestamp));
            }
            ScriptCommand::Release(position, timestamp) => {
                self.position_event(PositionEvent::released(position, timestamp));
            }
            ScriptCommand::Tap(position, timestamp) => {
                self.position_event(PositionEvent::pressed(position, timestamp));
                self.position_event(PositionEvent::released(position, timestamp.saturating_add(1)));
            }
            ScriptCommand::Activate(position, timestamp) => {
                self.expire(timestamp);
                self.activate(position, timestamp);
            }
            ScriptCommand::Deactivate => {
                if self.leader.is_active() {
                    self.leader.deactivate();
                    self.report.steps.push(ReplayStep::Deactivated);
                }
                self.timeout.cancel();
            }
            ScriptCommand::LayerOn(layer) => {
                self.layers.activate(layer)?;
                self.report.steps.push(ReplayStep::Layer { layer, active: true });
            }
            ScriptCommand::LayerOff(layer) => {
                self.layers.deactivate(layer)?;
                self.report.steps.push(ReplayStep::Layer { layer, active: false });
            }
            ScriptCommand::Tick(timestamp) => self.expire(timestamp),
        }
        Ok(())
    }

    fn activate(&mut self, position: KeyPosition, timestamp: Timestamp) {
        self.leader.activate(position, timestamp);
        self.timeout.arm(timestamp, self.settings.timeout_ms);
        self.report
            .steps
            .push(ReplayStep::Activated { position, timestamp });
    }

    /// Fire the timeout if its deadline has passed
    fn expire(&mut self, now: Timestamp) {
        if self.leader.is_active() && self.timeout.is_expired(now) {
            log::warn!("Leader sequence timed out @{}", now);
            self.leader.deactivate();
            self.timeout.cancel();
            self.report.steps.push(ReplayStep::TimedOut { timestamp: now });
        }
    }

    fn position_event(&mut self, event: PositionEvent) {
        self.expire(event.timestamp);

        if event.is_pressed() && self.settings.position == Some(event.position) {
            self.activate(event.position, event.timestamp);
        }

        let was_active = self.leader.is_active();
        let outcome = match self
            .leader
            .on_position_event(event, &self.layers, &mut self.behaviors)
        {
            Ok(outcome) => outcome,
            Err(never) => match never {},
        };

        self.report
            .steps
            .extend(self.behaviors.drain().map(ReplayStep::Dispatched));

        if self.leader.is_active() {
            if outcome.is_handled() {
                let timeout_ms = self
                    .leader
                    .top_candidate()
                    .map(|top| top.timeout_ms)
                    .unwrap_or(self.settings.timeout_ms);
                self.timeout.arm(event.timestamp, timeout_ms);
            }
        } else {
            self.timeout.cancel();
            if was_active {
                self.report.steps.push(ReplayStep::Deactivated);
            }
        }

        self.report.steps.push(ReplayStep::Event { event, outcome });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
        [leader]
        keymap_len = 42
        position = 40
        timeout_ms = 300

        [[sequence]]
        keys = [5, 6]
        binding = "&kp 4"

        [[sequence]]
        keys = [5, 7]
        binding = "&kp 5"
        timeout_ms = 100

        [[sequence]]
        keys = [8]
        binding = "&kp 6"
        layers = [2]
    "#;

    fn replay() -> Replay {
        Replay::new(&Config::from_toml(CONFIG).unwrap()).unwrap()
    }

    #[test]
    fn test_leader_key_activates() {
        let mut replay = replay();
        let report = replay.run_script("press 40 0\nrelease 40 10").unwrap();

        assert!(replay.leader().is_active());
        assert_eq!(
            report.steps[0],
            ReplayStep::Activated {
                position: KeyPosition(40),
                timestamp: 0
            }
        );
        assert!(report.outcomes().all(|(_, o)| o == EventOutcome::Unhandled));
    }

    #[test]
    fn test_two_key_sequence() {
        let mut replay = replay();
        let report = replay
            .run_script("tap 40 0\ntap 5 10\ntap 6 20")
            .unwrap();

        let dispatched: Vec<(KeyState, u32)> = report
            .dispatches()
            .map(|d| (d.state, d.position.index()))
            .collect();
        assert_eq!(
            dispatched,
            vec![
                (KeyState::Pressed, 42),
                (KeyState::Released, 42),
                (KeyState::Pressed, 42),
                (KeyState::Released, 42),
            ]
        );
        assert!(!replay.leader().is_active());
        assert!(!replay.timeout().is_armed());
        assert!(report.steps.contains(&ReplayStep::Deactivated));
    }

    #[test]
    fn test_timeout_abandons_gesture() {
        let mut replay = replay();
        let report = replay.run_script("tap 40 0\ntap 5 10\ntick 400").unwrap();

        assert_eq!(report.timeouts(), 1);
        assert!(!replay.leader().is_active());
    }

    #[test]
    fn test_timeout_rearmed_from_top_candidate() {
        let mut replay = replay();
        replay.run_script("tap 40 0\npress 5 10").unwrap();
        // Top candidate is [5, 6] with the leader default of 300ms
        assert_eq!(replay.timeout().deadline(), Some(310));
    }

    #[test]
    fn test_late_key_is_unhandled_after_timeout() {
        let mut replay = replay();
        let report = replay.run_script("tap 40 0\ntap 5 10\npress 6 1000").unwrap();

        assert_eq!(report.timeouts(), 1);
        let (_, last) = report.outcomes().last().unwrap();
        assert_eq!(last, EventOutcome::Unhandled);
    }

    #[test]
    fn test_layer_scoped_sequence() {
        let mut replay = replay();
        let report = replay.run_script("tap 40 0\npress 8 10").unwrap();
        assert_eq!(report.dispatches().count(), 0);
        assert!(!replay.leader().is_active());

        let mut replay = self::replay();
        let report = replay
            .run_script("layer on 2\ntap 40 0\ntap 8 10")
            .unwrap();
        assert_eq!(report.dispatches().count(), 2);
    }

    #[test]
    fn test_explicit_activate_and_deactivate() {
        let mut replay = replay();
        replay.run_script("activate 41 0").unwrap();
        assert!(replay.leader().is_active());
        let report = replay.run_script("deactivate").unwrap();
        assert!(!replay.leader().is_active());
        assert_eq!(report.steps.last(), Some(&ReplayStep::Deactivated));
    }

    #[test]
    fn test_layer_out_of_range() {
        let mut replay = replay();
        assert!(matches!(
            replay.run_script("layer on 40"),
            Err(ReplayError::Layer(LayerError::OutOfRange(40)))
        ));
    }

    #[test]
    fn test_tap_at_latest_timestamp() {
        let mut replay = replay();
        let report = replay.run_script("tap 3 9223372036854775807").unwrap();

        let timestamps: Vec<Timestamp> = report.outcomes().map(|(e, _)| e.timestamp).collect();
        assert_eq!(timestamps, vec![i64::MAX, i64::MAX]);
    }

    #[test]
    fn test_take_report() {
        let mut replay = replay();
        replay.run_script("tap 40 0").unwrap();
        assert!(!replay.take_report().steps.is_empty());
        assert!(replay.take_report().steps.is_empty());
    }
}
