// Leaderkey Layer State
// Highest-active-layer query used to scope sequences

/// Maximum number of layers a `LayerStack` tracks
pub const MAX_LAYERS: u8 = 32;

/// Source of the currently highest active keymap layer.
///
/// The leader asks this once per position event and treats the answer as
/// an opaque layer index.
pub trait LayerState {
    fn highest_active_layer(&self) -> u8;
}

/// A fixed layer, mostly useful when no layer subsystem exists.
impl LayerState for u8 {
    fn highest_active_layer(&self) -> u8 {
        *self
    }
}

impl<L: LayerState + ?Sized> LayerState for &L {
    fn highest_active_layer(&self) -> u8 {
        (**self).highest_active_layer()
    }
}

/// Errors from layer manipulation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayerError {
    #[error("Layer {0} is out of range (maximum {max})", max = MAX_LAYERS - 1)]
    OutOfRange(u8),
}

/// Bitmask of active layers on top of an always-active default layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerStack {
    active: u32,
    default_layer: u8,
}

impl Default for LayerStack {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerStack {
    /// Create a stack with only layer 0 active
    pub fn new() -> Self {
        Self {
            active: 1,
            default_layer: 0,
        }
    }

    /// Create a stack whose default layer is `layer`
    pub fn with_default(layer: u8) -> Result<Self, LayerError> {
        let bit = Self::bit(layer)?;
        Ok(Self {
            active: bit,
            default_layer: layer,
        })
    }

    fn bit(layer: u8) -> Result<u32, LayerError> {
        if layer >= MAX_LAYERS {
            return Err(LayerError::OutOfRange(layer));
        }
        Ok(1u32 << layer)
    }

    pub fn default_layer(&self) -> u8 {
        self.default_layer
    }

    /// Activate a layer
    pub fn activate(&mut self, layer: u8) -> Result<(), LayerError> {
        self.active |= Self::bit(layer)?;
        log::debug!("Layer {} activated", layer);
        Ok(())
    }

    /// Deactivate a layer. The default layer stays active.
    pub fn deactivate(&mut self, layer: u8) -> Result<(), LayerError> {
        let bit = Self::bit(layer)?;
        if layer != self.default_layer {
            self.active &= !bit;
            log::debug!("Layer {} deactivated", layer);
        }
        Ok(())
    }

    /// Toggle a layer on or off
    pub fn toggle(&mut self, layer: u8) -> Result<(), LayerError> {
        if self.is_active(layer) {
            self.deactivate(layer)
        } else {
            self.activate(layer)
        }
    }

    /// Check if a layer is active
    pub fn is_active(&self, layer: u8) -> bool {
        layer < MAX_LAYERS && self.active & (1u32 << layer) != 0
    }
}

impl LayerState for LayerStack {
    fn highest_active_layer(&self) -> u8 {
        if self.active == 0 {
            return self.default_layer;
        }
        (u32::BITS - 1 - self.active.leading_zeros()) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_stack_is_layer_zero() {
        let stack = LayerStack::new();
        assert_eq!(stack.highest_active_layer(), 0);
        assert!(stack.is_active(0));
    }

    #[test]
    fn test_highest_active_layer() {
        let mut stack = LayerStack::new();
        stack.activate(2).unwrap();
        stack.activate(5).unwrap();
        assert_eq!(stack.highest_active_layer(), 5);

        stack.deactivate(5).unwrap();
        assert_eq!(stack.highest_active_layer(), 2);
    }

    #[test]
    fn test_default_layer_cannot_be_deactivated() {
        let mut stack = LayerStack::with_default(1).unwrap();
        stack.deactivate(1).unwrap();
        assert!(stack.is_active(1));
        assert_eq!(stack.highest_active_layer(), 1);
    }

    #[test]
    fn test_toggle() {
        let mut stack = LayerStack::new();
        stack.toggle(3).unwrap();
        assert!(stack.is_active(3));
        stack.toggle(3).unwrap();
        assert!(!stack.is_active(3));
    }

    #[test]
    fn test_out_of_range() {
        let mut stack = LayerStack::new();
        assert_eq!(stack.activate(32), Err(LayerError::OutOfRange(32)));
        assert!(!stack.is_active(40));
    }

    #[test]
    fn test_fixed_layer() {
        assert_eq!(4u8.highest_active_layer(), 4);
        let stack = LayerStack::new();
        let by_ref: &LayerStack = &stack;
        assert_eq!(LayerState::highest_active_layer(&by_ref), 0);
    }
}
