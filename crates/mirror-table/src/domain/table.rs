//! The per-session channel table.
//!
//! A publisher announces its channels once, then sends updates by channel id.
//! [`Table`] checks each update against the announcement and keeps the
//! latest value per channel.

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

use mirror_core::protocol::AnnounceMessage;
use mirror_core::{ChannelValue, ValueKind};

/// Errors raised when a publisher misuses its table.
#[derive(Debug, Error, PartialEq)]
pub enum TableError {
    #[error("channel {id} was already announced as {existing:?}")]
    ConflictingAnnounce { id: u16, existing: String },

    #[error("channel name {0:?} is already used by another id")]
    DuplicateName(String),

    #[error("update for channel {0}, which was never announced")]
    UnknownChannel(u16),

    #[error("channel {name:?} carries {expected:?} values, got {got:?}")]
    KindMismatch {
        name: String,
        expected: ValueKind,
        got: ValueKind,
    },
}

/// One announced channel and its latest value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableEntry {
    pub id: u16,
    pub name: String,
    pub kind: ValueKind,
    /// `None` until the first update arrives.
    pub value: Option<ChannelValue>,
}

/// A value that differs from the one previously stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueChange {
    pub channel: String,
    pub value: ChannelValue,
    pub previous: Option<ChannelValue>,
}

/// Latest value per channel for one table.
#[derive(Debug, Clone, Default)]
pub struct Table {
    name: String,
    entries: BTreeMap<u16, TableEntry>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registers a channel.
    ///
    /// Repeating an identical announcement is accepted and changes nothing.
    ///
    /// # Errors
    ///
    /// - [`TableError::ConflictingAnnounce`] if `id` is taken by a different
    ///   name or kind.
    /// - [`TableError::DuplicateName`] if the name is taken by another id.
    pub fn announce(&mut self, announce: &AnnounceMessage) -> Result<(), TableError> {
        if let Some(existing) = self.entries.get(&announce.channel_id) {
            if existing.name == announce.name && existing.kind == announce.kind {
                return Ok(());
            }
            return Err(TableError::ConflictingAnnounce {
                id: announce.channel_id,
                existing: existing.name.clone(),
            });
        }
        if self.entries.values().any(|e| e.name == announce.name) {
            return Err(TableError::DuplicateName(announce.name.clone()));
        }
        self.entries.insert(
            announce.channel_id,
            TableEntry {
                id: announce.channel_id,
                name: announce.name.clone(),
                kind: announce.kind,
                value: None,
            },
        );
        Ok(())
    }

    /// Stores `value` for channel `id`.
    ///
    /// Returns the change, or `None` when the value equals the stored one.
    ///
    /// # Errors
    ///
    /// [`TableError::UnknownChannel`] or [`TableError::KindMismatch`].
    pub fn update(&mut self, id: u16, value: ChannelValue) -> Result<Option<ValueChange>, TableError> {
        let entry = self
            .entries
            .get_mut(&id)
            .ok_or(TableError::UnknownChannel(id))?;
        if entry.kind != value.kind() {
            return Err(TableError::KindMismatch {
                name: entry.name.clone(),
                expected: entry.kind,
                got: value.kind(),
            });
        }
        let previous = entry.value.replace(value);
        if previous == Some(value) {
            return Ok(None);
        }
        Ok(Some(ValueChange {
            channel: entry.name.clone(),
            value,
            previous,
        }))
    }

    /// Latest value of the channel called `name`.
    pub fn get(&self, name: &str) -> Option<ChannelValue> {
        self.entries
            .values()
            .find(|e| e.name == name)
            .and_then(|e| e.value)
    }

    /// Entries in channel id order.
    pub fn entries(&self) -> impl Iterator<Item = &TableEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
