//! Idle decay of continuous signals.
//!
//! Pointer and scroll velocities are derived from movement events, so when the
//! device stops moving no further event arrives to report a zero speed.  Once
//! per tick, [`IdleDecay::tick`] checks the shared "last continuous update"
//! marker; if it is older than the idle threshold, every non-zero continuous
//! signal is forced back to zero.
//!
//! Decay is grouped: the three signals share one marker, so a steady scroll
//! keeps a stale pointer velocity alive until both go idle.

use std::time::{Duration, Instant};

use super::signals::ContinuousSignal;
use super::state::InputStateStore;

/// Default idle threshold.
pub const DEFAULT_IDLE_THRESHOLD: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy)]
pub struct IdleDecay {
    threshold: Duration,
}

impl Default for IdleDecay {
    fn default() -> Self {
        Self::new(DEFAULT_IDLE_THRESHOLD)
    }
}

impl IdleDecay {
    pub fn new(threshold: Duration) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// Zeroes stale continuous signals.
    ///
    /// Returns the signals that were non-zero and have just been zeroed, in
    /// [`ContinuousSignal::ALL`] order.  The caller publishes each one.  The
    /// update marker is left untouched, so a signal that is already zero is
    /// never returned twice.
    pub fn tick(&self, store: &mut InputStateStore, now: Instant) -> Vec<ContinuousSignal> {
        let Some(last) = store.last_continuous_update() else {
            return Vec::new();
        };
        if now.saturating_duration_since(last) <= self.threshold {
            return Vec::new();
        }

        let mut zeroed = Vec::new();
        for signal in ContinuousSignal::ALL {
            if store.continuous(signal) != 0.0 {
                store.clear_continuous(signal);
                zeroed.push(signal);
            }
        }
        zeroed
    }
}
