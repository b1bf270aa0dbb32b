//! Signal normalization.
//!
//! Raw device deltas arrive at irregular intervals: a mouse may report every
//! 1 ms on one machine and every 8 ms on another.  To turn them into something
//! a remote consumer can use directly, each delta is converted to a rate
//! (units per second) and then scaled by a configured maximum, so that the
//! published value is always a fraction in `[-1, 1]`.
//!
//! # Example
//!
//! The pointer moves 10 pixels right in 50 ms.  That is 200 px/s.  With a
//! maximum pointer speed of 1000 px/s the normalized value is `0.2`.

use std::time::Instant;

/// Default maximum pointer speed, in pixels per second.
pub const DEFAULT_MAX_POINTER_SPEED: f64 = 1000.0;

/// Default maximum scroll speed, in wheel notches per second.
pub const DEFAULT_MAX_SCROLL_SPEED: f64 = 10.0;

/// Converts a raw delta into a normalized rate in `[-1, 1]`.
///
/// Returns `None` when `elapsed_ms` is zero or negative, or when any input
/// is non-finite.  Callers treat `None` as "skip this update".
///
/// `max_magnitude` must be finite and positive; a non-positive value also
/// yields `None`.
pub fn normalize(delta: f64, elapsed_ms: f64, max_magnitude: f64) -> Option<f64> {
    if !delta.is_finite() || !elapsed_ms.is_finite() || !max_magnitude.is_finite() {
        return None;
    }
    if elapsed_ms <= 0.0 || max_magnitude <= 0.0 {
        return None;
    }
    let rate = delta / elapsed_ms * 1000.0;
    Some((rate / max_magnitude).clamp(-1.0, 1.0))
}

/// Milliseconds between two capture timestamps.
///
/// Returns `0.0` when `later` is not after `earlier`, which [`normalize`]
/// rejects.
pub fn elapsed_ms(earlier: Instant, later: Instant) -> f64 {
    later.saturating_duration_since(earlier).as_secs_f64() * 1000.0
}

/// Per-signal-kind normalization limits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalLimits {
    /// Pointer speed (px/s) that maps to a normalized magnitude of 1.
    pub max_pointer_speed: f64,
    /// Scroll speed (notches/s) that maps to a normalized magnitude of 1.
    pub max_scroll_speed: f64,
}

impl Default for SignalLimits {
    fn default() -> Self {
        Self {
            max_pointer_speed: DEFAULT_MAX_POINTER_SPEED,
            max_scroll_speed: DEFAULT_MAX_SCROLL_SPEED,
        }
    }
}

impl SignalLimits {
    pub fn pointer(&self, delta: f64, elapsed_ms: f64) -> Option<f64> {
        normalize(delta, elapsed_ms, self.max_pointer_speed)
    }

    pub fn scroll(&self, delta: f64, elapsed_ms: f64) -> Option<f64> {
        normalize(delta, elapsed_ms, self.max_scroll_speed)
    }
}
