//! Sequence numbering for outgoing telemetry frames.
//!
//! Every frame written by a publisher carries the next value of a
//! per-connection counter.  The table server logs gaps, which makes a
//! dropped or reordered frame visible in its output.
//!
//! The counter is an `AtomicU64` so that it can live inside a publisher that
//! is shared behind `&self` without an extra lock.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonically increasing frame counter.
///
/// Starts at 0 and wraps at `u64::MAX` without panicking.
///
/// # Examples
///
/// ```rust
/// use mirror_core::protocol::SequenceCounter;
///
/// let counter = SequenceCounter::new();
/// assert_eq!(counter.next(), 0);
/// assert_eq!(counter.next(), 1);
/// ```
#[derive(Debug, Default)]
pub struct SequenceCounter {
    inner: AtomicU64,
}

impl SequenceCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next sequence number and advances the counter.
    ///
    /// `Relaxed` ordering suffices: the value orders frames, it does not
    /// publish memory to other threads.
    pub fn next(&self) -> u64 {
        self.inner.fetch_add(1, Ordering::Relaxed)
    }

    /// Returns the value the next call to [`next`](Self::next) will yield.
    pub fn current(&self) -> u64 {
        self.inner.load(Ordering::Relaxed)
    }
}

/// Tracks the sequence numbers seen on one incoming connection.
#[derive(Debug, Default)]
pub struct SequenceTracker {
    expected: Option<u64>,
    gaps: u64,
}

impl SequenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `seq` and returns how many frames were skipped before it.
    ///
    /// A repeated or older number counts as a gap of zero and resets the
    /// expectation to follow it.
    pub fn observe(&mut self, seq: u64) -> u64 {
        let skipped = match self.expected {
            Some(expected) if seq > expected => seq - expected,
            _ => 0,
        };
        self.gaps += skipped;
        self.expected = Some(seq.wrapping_add(1));
        skipped
    }

    /// Total frames skipped so far.
    pub fn gaps(&self) -> u64 {
        self.gaps
    }
}
