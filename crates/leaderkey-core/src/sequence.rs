// Leaderkey Sequence Definitions
// Configured leader sequences, their layer scope and output binding

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::registry::MAX_KEYS_PER_SEQUENCE;
use crate::KeyPosition;

/// Ordered key positions of a sequence, stored inline.
pub type SequenceKeys = SmallVec<[KeyPosition; MAX_KEYS_PER_SEQUENCE]>;

/// Reference to the behavior a sequence presses and releases.
///
/// The leader never interprets the binding; it is handed verbatim to the
/// behavior engine together with the sequence's virtual position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BehaviorBinding {
    pub behavior: String,
    #[serde(default)]
    pub param1: u32,
    #[serde(default)]
    pub param2: u32,
}

impl BehaviorBinding {
    pub fn new(behavior: impl Into<String>, param1: u32, param2: u32) -> Self {
        Self {
            behavior: behavior.into(),
            param1,
            param2,
        }
    }
}

impl fmt::Display for BehaviorBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "&{} {} {}", self.behavior, self.param1, self.param2)
    }
}

/// Layers on which a sequence may match.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LayerScope {
    /// Eligible whatever layer is active
    #[default]
    Global,
    /// Eligible only when the highest active layer is one of these
    Layers(SmallVec<[u8; 4]>),
}

impl LayerScope {
    pub fn layers(layers: impl IntoIterator<Item = u8>) -> Self {
        LayerScope::Layers(layers.into_iter().collect())
    }

    pub fn is_global(&self) -> bool {
        matches!(self, LayerScope::Global)
    }

    /// Check whether the sequence is eligible on `layer`
    pub fn is_active_on(&self, layer: u8) -> bool {
        match self {
            LayerScope::Global => true,
            LayerScope::Layers(layers) => layers.contains(&layer),
        }
    }
}

/// A single configured leader sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceDefinition {
    /// Exact press order required
    pub keys: SequenceKeys,
    /// Idle time allowed between consecutive keys, enforced by the timer collaborator
    pub timeout_ms: u32,
    /// Release the output on the last key's release instead of the first
    pub slow_release: bool,
    /// Unique position outside the keymap, reported to the behavior and used as tie-breaker
    pub virtual_position: KeyPosition,
    pub binding: BehaviorBinding,
    pub layer_scope: LayerScope,
}

impl SequenceDefinition {
    /// Create a global-scope sequence with the default 200ms timeout
    pub fn new(
        keys: impl IntoIterator<Item = KeyPosition>,
        virtual_position: impl Into<KeyPosition>,
        binding: BehaviorBinding,
    ) -> Self {
        Self {
            keys: keys.into_iter().collect(),
            timeout_ms: 200,
            slow_release: false,
            virtual_position: virtual_position.into(),
            binding,
            layer_scope: LayerScope::Global,
        }
    }

    pub fn with_layer_scope(mut self, layer_scope: LayerScope) -> Self {
        self.layer_scope = layer_scope;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_slow_release(mut self, slow_release: bool) -> Self {
        self.slow_release = slow_release;
        self
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Key expected at `depth`, if the sequence is that long
    pub fn key_at(&self, depth: usize) -> Option<KeyPosition> {
        self.keys.get(depth).copied()
    }

    /// True if the first `prefix.len()` keys equal `prefix`
    pub fn starts_with(&self, prefix: &[KeyPosition]) -> bool {
        self.keys.starts_with(prefix)
    }

    /// Bucket ordering: shorter sequences first, then lower virtual position.
    pub fn priority_cmp(&self, other: &Self) -> Ordering {
        self.keys
            .len()
            .cmp(&other.keys.len())
            .then(self.virtual_position.cmp(&other.virtual_position))
    }
}

impl fmt::Display for SequenceDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<String> = self.keys.iter().map(|k| k.to_string()).collect();
        write!(
            f,
            "[{}] -> {} @{}",
            keys.join(" "),
            self.binding,
            self.virtual_position
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(keys: &[u32], virtual_position: u32) -> SequenceDefinition {
        SequenceDefinition::new(
            keys.iter().copied().map(KeyPosition),
            virtual_position,
            BehaviorBinding::new("kp", virtual_position, 0),
        )
    }

    #[test]
    fn test_priority_shorter_first() {
        let short = seq(&[1, 2], 101);
        let long = seq(&[1, 2, 3], 100);
        assert_eq!(short.priority_cmp(&long), Ordering::Less);
        assert_eq!(long.priority_cmp(&short), Ordering::Greater);
    }

    #[test]
    fn test_priority_virtual_position_breaks_ties() {
        let a = seq(&[1, 2], 100);
        let b = seq(&[3, 4], 101);
        assert_eq!(a.priority_cmp(&b), Ordering::Less);
        assert_eq!(a.priority_cmp(&a.clone()), Ordering::Equal);
    }

    #[test]
    fn test_layer_scope() {
        assert!(LayerScope::Global.is_active_on(7));
        let scoped = LayerScope::layers([1, 2]);
        assert!(scoped.is_active_on(2));
        assert!(!scoped.is_active_on(0));
        assert!(!scoped.is_global());
    }

    #[test]
    fn test_key_at_and_prefix() {
        let s = seq(&[5, 6, 7], 100);
        assert_eq!(s.key_at(1), Some(KeyPosition(6)));
        assert_eq!(s.key_at(3), None);
        assert!(s.starts_with(&[KeyPosition(5), KeyPosition(6)]));
        assert!(!s.starts_with(&[KeyPosition(6)]));
        assert!(s.starts_with(&[]));
    }

    #[test]
    fn test_display() {
        let s = seq(&[5, 6], 100);
        assert_eq!(s.to_string(), "[5 6] -> &kp 100 0 @100");
    }
}
