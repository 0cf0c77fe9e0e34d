// Leaderkey Sequence Timeout
// Idle deadline that abandons a gesture between keys

use crate::Timestamp;

/// Deadline for the next key of an active gesture.
///
/// The leader itself never looks at time. Whoever owns this timer calls
/// `Leader::deactivate` once it has expired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequenceTimeout {
    deadline: Option<Timestamp>,
}

impl SequenceTimeout {
    pub fn new() -> Self {
        Self::default()
    }

    /// (Re)start the countdown from `now`
    pub fn arm(&mut self, now: Timestamp, timeout_ms: u32) {
        self.deadline = Some(now.saturating_add(i64::from(timeout_ms)));
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Timestamp> {
        self.deadline
    }

    /// True once `now` has reached the deadline
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }
}
