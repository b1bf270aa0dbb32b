//! Input capture infrastructure.
//!
//! Each platform source runs its own OS thread(s) and hands events to the
//! tick loop over a `std::sync::mpsc` channel, which the loop drains with
//! `try_recv` once per tick.
//!
//! - **Windows**: low-level keyboard and mouse hooks (`WH_KEYBOARD_LL`,
//!   `WH_MOUSE_LL`) on a dedicated Win32 message loop thread.
//! - **Linux**: one `evdev` reader thread per keyboard or mouse device under
//!   `/dev/input`.
//!
//! Platform key codes are translated to [`HidKeyCode`] inside the source, and
//! every event is stamped with a monotonic [`Instant`] at the moment it is
//! captured, so downstream code never sees a platform code or an OS clock.
//!
//! # Testability
//!
//! The [`InputSource`] trait allows tests to inject synthetic events through
//! [`mock::MockInputSource`] without OS hooks or device access.

use std::sync::mpsc;
use std::time::Instant;

use mirror_core::HidKeyCode;

pub mod mock;

#[cfg(target_os = "linux")]
pub mod linux;

#[cfg(target_os = "windows")]
pub mod windows;

/// A raw input event produced by an input source.
///
/// Sources deliver key auto-repeat as nothing: a held key produces exactly
/// one `KeyDown` and one `KeyUp`.
#[derive(Debug, Clone, PartialEq)]
pub enum RawInputEvent {
    /// A key was pressed down.
    KeyDown { key: HidKeyCode, at: Instant },
    /// A key was released.
    KeyUp { key: HidKeyCode, at: Instant },
    /// The pointer moved to an absolute position.
    MouseMove {
        /// Absolute X (screen pixels, or accumulated relative motion).
        x: f64,
        /// Absolute Y.
        y: f64,
        at: Instant,
    },
    /// A mouse button was pressed.
    MouseButtonDown { button: MouseButton, at: Instant },
    /// A mouse button was released.
    MouseButtonUp { button: MouseButton, at: Instant },
    /// The vertical wheel was scrolled.
    MouseWheel {
        /// Delta in wheel notches; positive = away from the user.
        delta: f64,
        at: Instant,
    },
}

impl RawInputEvent {
    /// Capture timestamp of the event.
    pub fn at(&self) -> Instant {
        match self {
            RawInputEvent::KeyDown { at, .. }
            | RawInputEvent::KeyUp { at, .. }
            | RawInputEvent::MouseMove { at, .. }
            | RawInputEvent::MouseButtonDown { at, .. }
            | RawInputEvent::MouseButtonUp { at, .. }
            | RawInputEvent::MouseWheel { at, .. } => *at,
        }
    }
}

/// Physical mouse button identifier used in [`RawInputEvent`].
///
/// Covers every button the platform sources can report; only the first three
/// can be tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    X1,
    X2,
}

impl MouseButton {
    /// The trackable button this physical button corresponds to, if any.
    pub fn tracked(self) -> Option<mirror_core::MouseButton> {
        match self {
            MouseButton::Left => Some(mirror_core::MouseButton::Left),
            MouseButton::Right => Some(mirror_core::MouseButton::Right),
            MouseButton::Middle => Some(mirror_core::MouseButton::Middle),
            MouseButton::X1 | MouseButton::X2 => None,
        }
    }
}

/// Error type for input capture operations.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("failed to install keyboard hook: {0}")]
    KeyboardHookInstallFailed(String),
    #[error("failed to install mouse hook: {0}")]
    MouseHookInstallFailed(String),
    #[error("no readable keyboard or mouse device found under /dev/input (is the user in the `input` group?)")]
    NoDevices,
    #[error("capture thread could not be started: {0}")]
    ThreadSpawn(String),
    #[error("capture source is already running")]
    AlreadyStarted,
    #[error("platform not supported: {0}")]
    UnsupportedPlatform(String),
}

/// Trait abstracting input event production.
pub trait InputSource: Send {
    /// Starts the source and returns a receiver for captured events.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError`] if the OS capture mechanism cannot be set up.
    /// Callers treat this as fatal.
    fn start(&self) -> Result<mpsc::Receiver<RawInputEvent>, CaptureError>;

    /// Stops the source and releases all OS resources.  The receiver returned
    /// by [`start`](Self::start) disconnects once the capture threads exit.
    fn stop(&self);
}

/// Creates the input source for the current platform.
///
/// # Errors
///
/// Returns [`CaptureError::UnsupportedPlatform`] on platforms without a
/// capture implementation.
pub fn platform_input_source() -> Result<Box<dyn InputSource>, CaptureError> {
    #[cfg(target_os = "windows")]
    {
        Ok(Box::new(windows::WindowsInputCaptureService::new()))
    }
    #[cfg(target_os = "linux")]
    {
        Ok(Box::new(linux::EvdevInputSource::new()))
    }
    #[cfg(not(any(target_os = "windows", target_os = "linux")))]
    {
        Err(CaptureError::UnsupportedPlatform(
            std::env::consts::OS.to_string(),
        ))
    }
}
