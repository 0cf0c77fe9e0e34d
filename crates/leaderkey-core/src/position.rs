// Leaderkey Key Positions
// Physical and virtual key position identifiers

use std::fmt;

use serde::{Deserialize, Serialize};

/// Event timestamp in milliseconds since boot.
pub type Timestamp = i64;

/// A key position on the keyboard matrix.
///
/// Physical positions are `0..keymap_len`. Positions at or above `keymap_len`
/// are virtual: they never come from the matrix and are only used to address
/// the output behavior of a leader sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct KeyPosition(pub u32);

impl KeyPosition {
    /// Get the raw position index
    pub fn index(self) -> u32 {
        self.0
    }

    /// Returns true if this position lies on a keymap of `keymap_len` positions
    pub fn is_physical(self, keymap_len: u32) -> bool {
        self.0 < keymap_len
    }
}

impl From<u32> for KeyPosition {
    fn from(index: u32) -> Self {
        KeyPosition(index)
    }
}

impl From<KeyPosition> for u32 {
    fn from(position: KeyPosition) -> Self {
        position.0
    }
}

impl fmt::Display for KeyPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
