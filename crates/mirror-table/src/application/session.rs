//! Per-connection session logic.
//!
//! [`Session`] is a pure state machine: the infrastructure layer feeds it each
//! decoded message and writes back whatever it returns.  It never touches a
//! socket, which keeps the handshake and validation rules unit-testable.
//!
//! # Lifecycle
//!
//! ```text
//! AwaitingHello ── Hello (accepted) ──► Active ── Disconnect / error ──► closed
//!       │
//!       └── anything else, or a rejected Hello ──► closed
//! ```

use serde::Serialize;
use uuid::Uuid;

use mirror_core::protocol::{
    ErrorMessage, HelloAckMessage, HelloMessage, ProtocolErrorCode, RejectReason,
    SequenceTracker, TelemetryMessage, PROTOCOL_VERSION,
};
use mirror_core::ChannelValue;

use crate::domain::{Table, TableError, TableServerConfig, ValueChange};

/// A channel value change, tagged with where it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableChange {
    pub session: Uuid,
    pub client: String,
    pub table: String,
    pub channel: String,
    pub value: ChannelValue,
    pub previous: Option<ChannelValue>,
}

/// What the connection task must do after one message.
#[derive(Debug, Default, PartialEq)]
pub struct SessionOutput {
    /// Messages to send back to the publisher, in order.
    pub replies: Vec<TelemetryMessage>,
    /// Value changes to forward to the change sink.
    pub changes: Vec<TableChange>,
    /// Frames the publisher's sequence numbers skipped before this one.
    pub skipped: u64,
    /// The connection must be closed once `replies` are written.
    pub close: bool,
}

impl SessionOutput {
    fn reply(message: TelemetryMessage) -> Self {
        Self {
            replies: vec![message],
            ..Self::default()
        }
    }

    fn fatal(code: ProtocolErrorCode, description: impl Into<String>) -> Self {
        Self {
            replies: vec![TelemetryMessage::Error(ErrorMessage {
                error_code: code,
                description: description.into(),
            })],
            close: true,
            ..Self::default()
        }
    }
}

#[derive(Debug)]
enum Phase {
    AwaitingHello,
    Active { client_name: String, table: Table },
    Closed,
}

/// State of one publisher connection.
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    phase: Phase,
    tracker: SequenceTracker,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            phase: Phase::AwaitingHello,
            tracker: SequenceTracker::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Publisher name, once the handshake succeeded.
    pub fn client_name(&self) -> Option<&str> {
        match &self.phase {
            Phase::Active { client_name, .. } => Some(client_name),
            _ => None,
        }
    }

    /// The publisher's table, once the handshake succeeded.
    pub fn table(&self) -> Option<&Table> {
        match &self.phase {
            Phase::Active { table, .. } => Some(table),
            _ => None,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.phase, Phase::Closed)
    }

    /// Total frames skipped over the session's lifetime.
    pub fn sequence_gaps(&self) -> u64 {
        self.tracker.gaps()
    }

    /// Processes one message carrying header sequence number `seq`.
    pub fn handle(
        &mut self,
        config: &TableServerConfig,
        message: TelemetryMessage,
        seq: u64,
    ) -> SessionOutput {
        let skipped = self.tracker.observe(seq);
        let mut out = match (&mut self.phase, message) {
            (Phase::Closed, _) => SessionOutput {
                close: true,
                ..SessionOutput::default()
            },
            (phase @ Phase::AwaitingHello, TelemetryMessage::Hello(hello)) => {
                Self::open(phase, config, hello)
            }
            (Phase::AwaitingHello, other) => SessionOutput::fatal(
                ProtocolErrorCode::HandshakeRequired,
                format!("expected Hello, got {:?}", other.message_type()),
            ),
            (Phase::Active { client_name, table }, message) => {
                Self::handle_active(self.id, client_name, table, message)
            }
        };
        out.skipped = skipped;
        if out.close {
            self.phase = Phase::Closed;
        }
        out
    }

    fn open(phase: &mut Phase, config: &TableServerConfig, hello: HelloMessage) -> SessionOutput {
        let reject_reason = if hello.protocol_version != PROTOCOL_VERSION {
            Some(RejectReason::VersionMismatch)
        } else if !config.accepts_table(&hello.table) {
            Some(RejectReason::InvalidTable)
        } else {
            None
        };

        let ack = HelloAckMessage {
            accepted: reject_reason.is_none(),
            reject_reason: reject_reason.unwrap_or(RejectReason::None),
            server_name: config.server_name.clone(),
        };
        let mut out = SessionOutput::reply(TelemetryMessage::HelloAck(ack));
        match reject_reason {
            Some(_) => out.close = true,
            None => {
                *phase = Phase::Active {
                    client_name: hello.client_name,
                    table: Table::new(hello.table),
                };
            }
        }
        out
    }

    fn handle_active(
        session: Uuid,
        client_name: &str,
        table: &mut Table,
        message: TelemetryMessage,
    ) -> SessionOutput {
        match message {
            TelemetryMessage::Ping(token) => SessionOutput::reply(TelemetryMessage::Pong(token)),
            TelemetryMessage::Pong(_) => SessionOutput::default(),
            TelemetryMessage::Disconnect { .. } => SessionOutput {
                close: true,
                ..SessionOutput::default()
            },
            TelemetryMessage::Announce(announce) => match table.announce(&announce) {
                Ok(()) => SessionOutput::default(),
                Err(e) => table_error(e),
            },
            TelemetryMessage::Update(update) => match table.update(update.channel_id, update.value)
            {
                Ok(Some(change)) => SessionOutput {
                    changes: vec![tag(session, client_name, table.name(), change)],
                    ..SessionOutput::default()
                },
                Ok(None) => SessionOutput::default(),
                Err(e) => table_error(e),
            },
            // Publishers report errors before closing; nothing to answer.
            TelemetryMessage::Error(_) => SessionOutput::default(),
            other @ (TelemetryMessage::Hello(_) | TelemetryMessage::HelloAck(_)) => {
                SessionOutput::fatal(
                    ProtocolErrorCode::InvalidMessage,
                    format!("unexpected {:?} after handshake", other.message_type()),
                )
            }
        }
    }
}

fn table_error(error: TableError) -> SessionOutput {
    let code = match error {
        TableError::ConflictingAnnounce { .. } | TableError::DuplicateName(_) => {
            ProtocolErrorCode::DuplicateChannel
        }
        TableError::UnknownChannel(_) => ProtocolErrorCode::UnknownChannel,
        TableError::KindMismatch { .. } => ProtocolErrorCode::KindMismatch,
    };
    SessionOutput::fatal(code, error.to_string())
}

fn tag(session: Uuid, client: &str, table: &str, change: ValueChange) -> TableChange {
    TableChange {
        session,
        client: client.to_string(),
        table: table.to_string(),
        channel: change.channel,
        value: change.value,
        previous: change.previous,
    }
}
