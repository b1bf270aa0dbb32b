//! Pause/resume gate for event translation.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use super::state::InputStateStore;

/// Whether raw events are translated into state changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CaptureMode {
    #[default]
    Enabled,
    Paused,
}

/// Result of a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeTransition {
    /// ENABLED → PAUSED; the store has been reset to neutral.
    Paused,
    /// PAUSED → ENABLED; nothing was restored.
    Resumed,
}

/// Two-state capture mode, starting in [`CaptureMode::Enabled`].
#[derive(Debug, Default)]
pub struct CaptureModeController {
    mode: CaptureMode,
}

impl CaptureModeController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> CaptureMode {
        self.mode
    }

    pub fn is_enabled(&self) -> bool {
        self.mode == CaptureMode::Enabled
    }

    /// Flips the mode.
    ///
    /// Entering PAUSED resets `store` to neutral at `at` before returning, so
    /// the invariant "paused implies neutral" holds from the moment of
    /// transition.  Resuming leaves the store untouched.
    pub fn toggle(&mut self, store: &mut InputStateStore, at: Instant) -> ModeTransition {
        match self.mode {
            CaptureMode::Enabled => {
                self.mode = CaptureMode::Paused;
                store.reset_all(at);
                ModeTransition::Paused
            }
            CaptureMode::Paused => {
                self.mode = CaptureMode::Enabled;
                ModeTransition::Resumed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::signals::{ContinuousSignal, DiscreteId, TrackedSet};
    use crate::keymap::hid::HidKeyCode;

    fn store_with_w_pressed(at: Instant) -> InputStateStore {
        let tracked = TrackedSet::new(vec![HidKeyCode::KeyW], vec![], vec![]).unwrap();
        let mut store = InputStateStore::new(&tracked);
        store.set_discrete(DiscreteId::Key(HidKeyCode::KeyW), true).unwrap();
        store.set_continuous(ContinuousSignal::PointerVelocityX, 0.5, at);
        store
    }

    #[test]
    fn test_starts_enabled() {
        let controller = CaptureModeController::new();
        assert_eq!(controller.mode(), CaptureMode::Enabled);
        assert!(controller.is_enabled());
    }

    #[test]
    fn test_pausing_resets_store() {
        // Arrange
        let now = Instant::now();
        let mut store = store_with_w_pressed(now);
        let mut controller = CaptureModeController::new();

        // Act
        let transition = controller.toggle(&mut store, now);

        // Assert
        assert_eq!(transition, ModeTransition::Paused);
        assert_eq!(controller.mode(), CaptureMode::Paused);
        assert!(store.snapshot().is_neutral());
    }

    #[test]
    fn test_resuming_restores_nothing() {
        // Arrange
        let now = Instant::now();
        let mut store = store_with_w_pressed(now);
        let mut controller = CaptureModeController::new();
        controller.toggle(&mut store, now);

        // Act
        let transition = controller.toggle(&mut store, now);

        // Assert
        assert_eq!(transition, ModeTransition::Resumed);
        assert!(controller.is_enabled());
        assert!(store.snapshot().is_neutral());
    }
}
