//! Canonical input state.
//!
//! [`InputStateStore`] owns one boolean per tracked discrete identifier and one
//! normalized value per [`ContinuousSignal`].  It is mutated only by the event
//! translator and idle decay, and read through [`InputSnapshot`] copies.

use std::collections::HashMap;
use std::time::Instant;

use thiserror::Error;

use super::signals::{ContinuousSignal, DiscreteId, TrackedSet};

/// Errors raised by the state store.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    /// The identifier is not part of the tracked set.
    #[error("identifier {0:?} is not tracked")]
    Untracked(DiscreteId),
}

/// Mutable input state for one capture session.
#[derive(Debug, Clone)]
pub struct InputStateStore {
    discrete: Vec<(DiscreteId, bool)>,
    index: HashMap<DiscreteId, usize>,
    continuous: [f64; 3],
    last_continuous_update: Option<Instant>,
}

impl InputStateStore {
    /// Creates a store with every tracked identifier released and every
    /// continuous signal at zero.
    pub fn new(tracked: &TrackedSet) -> Self {
        let discrete: Vec<(DiscreteId, bool)> = tracked.iter().map(|id| (id, false)).collect();
        let index = discrete
            .iter()
            .enumerate()
            .map(|(i, (id, _))| (*id, i))
            .collect();
        Self {
            discrete,
            index,
            continuous: [0.0; 3],
            last_continuous_update: None,
        }
    }

    /// Records a press or release.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Untracked`] if `id` is not in the tracked set.
    pub fn set_discrete(&mut self, id: DiscreteId, pressed: bool) -> Result<(), StateError> {
        let slot = self.index.get(&id).ok_or(StateError::Untracked(id))?;
        self.discrete[*slot].1 = pressed;
        Ok(())
    }

    pub fn is_tracked(&self, id: DiscreteId) -> bool {
        self.index.contains_key(&id)
    }

    /// Current pressed state, or `None` for an untracked identifier.
    pub fn discrete(&self, id: DiscreteId) -> Option<bool> {
        self.index.get(&id).map(|slot| self.discrete[*slot].1)
    }

    /// Stores a continuous value, clamped to `[-1, 1]`, and stamps the shared
    /// update marker with `at`.  A NaN value is stored as zero.
    pub fn set_continuous(&mut self, signal: ContinuousSignal, value: f64, at: Instant) {
        self.continuous[signal.index()] = sanitize(value);
        self.last_continuous_update = Some(at);
    }

    /// Zeroes a continuous value without touching the update marker.
    pub(crate) fn clear_continuous(&mut self, signal: ContinuousSignal) {
        self.continuous[signal.index()] = 0.0;
    }

    pub fn continuous(&self, signal: ContinuousSignal) -> f64 {
        self.continuous[signal.index()]
    }

    /// Time of the most recent continuous update or reset.
    pub fn last_continuous_update(&self) -> Option<Instant> {
        self.last_continuous_update
    }

    /// Releases every discrete identifier and zeroes every continuous signal.
    ///
    /// The reset counts as a continuous update and stamps the marker.
    pub fn reset_all(&mut self, at: Instant) {
        for entry in &mut self.discrete {
            entry.1 = false;
        }
        self.continuous = [0.0; 3];
        self.last_continuous_update = Some(at);
    }

    /// Returns an immutable copy of the full state.
    pub fn snapshot(&self) -> InputSnapshot {
        InputSnapshot {
            discrete: self.discrete.clone(),
            continuous: self.continuous,
        }
    }
}

fn sanitize(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(-1.0, 1.0)
    }
}

/// Read-only copy of the input state at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct InputSnapshot {
    discrete: Vec<(DiscreteId, bool)>,
    continuous: [f64; 3],
}

impl InputSnapshot {
    /// Discrete entries in tracked order (keys, modifiers, buttons).
    pub fn discrete(&self) -> &[(DiscreteId, bool)] {
        &self.discrete
    }

    pub fn pressed(&self, id: DiscreteId) -> Option<bool> {
        self.discrete
            .iter()
            .find(|(entry, _)| *entry == id)
            .map(|(_, pressed)| *pressed)
    }

    pub fn continuous(&self, signal: ContinuousSignal) -> f64 {
        self.continuous[signal.index()]
    }

    /// `true` when nothing is pressed and every continuous value is zero.
    pub fn is_neutral(&self) -> bool {
        self.discrete.iter().all(|(_, pressed)| !pressed)
            && self.continuous.iter().all(|v| *v == 0.0)
    }
}
