//! # mirror-core
//!
//! Shared library for Input-Mirror: key code translation tables, the input
//! state domain, and the telemetry wire protocol.
//!
//! It has no dependencies on OS input APIs, terminals, or network sockets, so
//! everything here builds and tests on any platform.
//!
//! # Architecture overview (for beginners)
//!
//! Input-Mirror watches the local keyboard and mouse and republishes what it
//! sees as a set of named channels (`key_q`, `btn_mouse_left`,
//! `mouse_speed_x`, ...) that a remote control system can read.  A robot or
//! simulator that cannot see the operator's input devices reads the channels
//! instead.
//!
//! - **`keymap`** – Converts platform key codes (Windows VK, Linux evdev) into
//!   USB HID Usage IDs, the canonical representation used everywhere else.
//!
//! - **`domain`** – The state engine: which keys are pressed, how fast the
//!   pointer and wheel are moving, idle decay, and the pause/resume switch.
//!
//! - **`protocol`** – How channel announcements and updates travel to a table
//!   server: a 24-byte header plus a compact binary payload.

pub mod domain;
pub mod keymap;
pub mod protocol;

pub use domain::capture_mode::{CaptureMode, CaptureModeController, ModeTransition};
pub use domain::channels::{Channel, ChannelMap, ChannelValue, ValueKind};
pub use domain::decay::IdleDecay;
pub use domain::normalize::{normalize, SignalLimits};
pub use domain::signals::{
    ContinuousSignal, DiscreteId, Modifier, MouseButton, TrackedSet, TrackedSetError,
};
pub use domain::state::{InputSnapshot, InputStateStore, StateError};
pub use keymap::hid::HidKeyCode;
pub use protocol::codec::{decode_message, encode_message, ProtocolError};
pub use protocol::messages::TelemetryMessage;
