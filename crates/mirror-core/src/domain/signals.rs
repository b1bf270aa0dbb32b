//! Tracked identifiers and signal kinds.
//!
//! The mirrored state is made of two families of signals:
//!
//! - **Discrete** signals are booleans: a tracked key, a modifier
//!   (ctrl/alt/shift), or a mouse button is either pressed or not.
//! - **Continuous** signals are velocities normalized into `[-1, 1]`: pointer
//!   X speed, pointer Y speed, and scroll-wheel speed.
//!
//! The set of tracked discrete identifiers is fixed at startup
//! ([`TrackedSet`]) and never changes size for the lifetime of the process.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::keymap::hid::HidKeyCode;

/// Keyboard modifier tracked as a single logical key.
///
/// Left and right physical keys both drive the same modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Modifier {
    Ctrl,
    Alt,
    Shift,
}

impl Modifier {
    pub const ALL: [Modifier; 3] = [Modifier::Ctrl, Modifier::Alt, Modifier::Shift];

    pub fn name(self) -> &'static str {
        match self {
            Modifier::Ctrl => "ctrl",
            Modifier::Alt => "alt",
            Modifier::Shift => "shift",
        }
    }

    pub fn from_name(name: &str) -> Option<Modifier> {
        let wanted = name.trim().to_ascii_lowercase();
        Modifier::ALL.into_iter().find(|m| m.name() == wanted)
    }

    /// Maps a sided HID modifier key onto its logical modifier.
    ///
    /// The Meta (Windows/Command) keys are not tracked and return `None`.
    pub fn from_hid(key: HidKeyCode) -> Option<Modifier> {
        match key {
            HidKeyCode::ControlLeft | HidKeyCode::ControlRight => Some(Modifier::Ctrl),
            HidKeyCode::AltLeft | HidKeyCode::AltRight => Some(Modifier::Alt),
            HidKeyCode::ShiftLeft | HidKeyCode::ShiftRight => Some(Modifier::Shift),
            _ => None,
        }
    }
}

/// Mouse button that can be tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    pub const ALL: [MouseButton; 3] = [MouseButton::Left, MouseButton::Right, MouseButton::Middle];

    pub fn name(self) -> &'static str {
        match self {
            MouseButton::Left => "mouse_left",
            MouseButton::Right => "mouse_right",
            MouseButton::Middle => "mouse_middle",
        }
    }

    pub fn from_name(name: &str) -> Option<MouseButton> {
        let wanted = name.trim().to_ascii_lowercase();
        MouseButton::ALL.into_iter().find(|b| b.name() == wanted)
    }
}

/// Identifier of one discrete (pressed/released) signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiscreteId {
    Key(HidKeyCode),
    Modifier(Modifier),
    Button(MouseButton),
}

impl DiscreteId {
    /// Short display label: the key name, modifier name, or button name.
    pub fn label(&self) -> String {
        match self {
            DiscreteId::Key(key) => key
                .name()
                .map(str::to_string)
                .unwrap_or_else(|| format!("hid_{:04x}", *key as u16)),
            DiscreteId::Modifier(m) => m.name().to_string(),
            DiscreteId::Button(b) => b.name().to_string(),
        }
    }

    /// Channel name on the publication sink.
    ///
    /// Keys and modifiers share the `key_` prefix (`key_q`, `key_ctrl`);
    /// buttons use `btn_` (`btn_mouse_left`).
    pub fn channel_name(&self) -> String {
        match self {
            DiscreteId::Key(_) | DiscreteId::Modifier(_) => format!("key_{}", self.label()),
            DiscreteId::Button(_) => format!("btn_{}", self.label()),
        }
    }
}

/// Velocity-like signals derived from motion and scroll deltas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContinuousSignal {
    PointerVelocityX,
    PointerVelocityY,
    ScrollVelocity,
}

impl ContinuousSignal {
    pub const ALL: [ContinuousSignal; 3] = [
        ContinuousSignal::PointerVelocityX,
        ContinuousSignal::PointerVelocityY,
        ContinuousSignal::ScrollVelocity,
    ];

    /// Stable array index used by fixed-size per-signal storage.
    pub fn index(self) -> usize {
        match self {
            ContinuousSignal::PointerVelocityX => 0,
            ContinuousSignal::PointerVelocityY => 1,
            ContinuousSignal::ScrollVelocity => 2,
        }
    }

    pub fn channel_name(self) -> &'static str {
        match self {
            ContinuousSignal::PointerVelocityX => "mouse_speed_x",
            ContinuousSignal::PointerVelocityY => "mouse_speed_y",
            ContinuousSignal::ScrollVelocity => "scroll_wheel_speed",
        }
    }
}

/// Error returned when building a [`TrackedSet`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrackedSetError {
    #[error("key {0:?} cannot be tracked (modifiers are tracked as ctrl/alt/shift)")]
    UntrackableKey(HidKeyCode),
    #[error("identifier {0} is listed more than once")]
    Duplicate(String),
}

/// The fixed set of discrete identifiers mirrored by this process.
///
/// Order is preserved: it determines channel numbering and display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedSet {
    keys: Vec<HidKeyCode>,
    modifiers: Vec<Modifier>,
    buttons: Vec<MouseButton>,
}

impl TrackedSet {
    /// Builds a tracked set, rejecting duplicates and keys without a name.
    ///
    /// # Errors
    ///
    /// Returns [`TrackedSetError`] if a key is a modifier/unknown key or an
    /// identifier appears twice.
    pub fn new(
        keys: Vec<HidKeyCode>,
        modifiers: Vec<Modifier>,
        buttons: Vec<MouseButton>,
    ) -> Result<Self, TrackedSetError> {
        if let Some(bad) = keys.iter().find(|k| k.name().is_none()) {
            return Err(TrackedSetError::UntrackableKey(*bad));
        }
        let set = Self {
            keys,
            modifiers,
            buttons,
        };
        let mut seen = HashSet::new();
        for id in set.iter() {
            if !seen.insert(id) {
                return Err(TrackedSetError::Duplicate(id.label()));
            }
        }
        Ok(set)
    }

    pub fn keys(&self) -> &[HidKeyCode] {
        &self.keys
    }

    pub fn modifiers(&self) -> &[Modifier] {
        &self.modifiers
    }

    pub fn buttons(&self) -> &[MouseButton] {
        &self.buttons
    }

    /// Iterates every tracked identifier: keys, then modifiers, then buttons.
    pub fn iter(&self) -> impl Iterator<Item = DiscreteId> + '_ {
        self.keys
            .iter()
            .map(|k| DiscreteId::Key(*k))
            .chain(self.modifiers.iter().map(|m| DiscreteId::Modifier(*m)))
            .chain(self.buttons.iter().map(|b| DiscreteId::Button(*b)))
    }

    pub fn len(&self) -> usize {
        self.keys.len() + self.modifiers.len() + self.buttons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
