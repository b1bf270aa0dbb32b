//! Published channels.
//!
//! Every tracked signal is published on a named channel.  The mapping from
//! signal to channel is computed once at startup by [`ChannelMap::new`] and
//! never changes; channel ids are dense `u16` values starting at zero, in
//! tracked order followed by the three continuous signals.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::signals::{ContinuousSignal, DiscreteId, TrackedSet};

/// Type of the value carried by a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Boolean,
    Double,
}

/// A published value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChannelValue {
    Boolean(bool),
    Double(f64),
}

impl ChannelValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            ChannelValue::Boolean(_) => ValueKind::Boolean,
            ChannelValue::Double(_) => ValueKind::Double,
        }
    }

    /// Neutral value of a kind: `false` or `0.0`.
    pub fn neutral(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Boolean => ChannelValue::Boolean(false),
            ValueKind::Double => ChannelValue::Double(0.0),
        }
    }
}

impl fmt::Display for ChannelValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelValue::Boolean(b) => write!(f, "{b}"),
            ChannelValue::Double(d) => write!(f, "{d:.2}"),
        }
    }
}

/// One published channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub id: u16,
    pub name: String,
    pub kind: ValueKind,
}

/// Fixed mapping from tracked signals to channels.
#[derive(Debug, Clone)]
pub struct ChannelMap {
    channels: Vec<Channel>,
    discrete: HashMap<DiscreteId, u16>,
}

impl ChannelMap {
    /// Assigns a channel to every tracked identifier and continuous signal.
    pub fn new(tracked: &TrackedSet) -> Self {
        let mut channels = Vec::with_capacity(tracked.len() + ContinuousSignal::ALL.len());
        let mut discrete = HashMap::with_capacity(tracked.len());

        for id in tracked.iter() {
            let channel_id = channels.len() as u16;
            channels.push(Channel {
                id: channel_id,
                name: id.channel_name(),
                kind: ValueKind::Boolean,
            });
            discrete.insert(id, channel_id);
        }
        for signal in ContinuousSignal::ALL {
            channels.push(Channel {
                id: channels.len() as u16,
                name: signal.channel_name().to_string(),
                kind: ValueKind::Double,
            });
        }

        Self { channels, discrete }
    }

    /// All channels in id order.
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn get(&self, id: u16) -> Option<&Channel> {
        self.channels.get(id as usize)
    }

    pub fn discrete(&self, id: DiscreteId) -> Option<&Channel> {
        self.discrete
            .get(&id)
            .and_then(|channel_id| self.channels.get(*channel_id as usize))
    }

    pub fn continuous(&self, signal: ContinuousSignal) -> &Channel {
        // Continuous channels always occupy the last three slots.
        let base = self.channels.len() - ContinuousSignal::ALL.len();
        &self.channels[base + signal.index()]
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}
