//! Telemetry protocol message types.
//!
//! A publisher opens one TCP connection to a table server, performs a
//! `Hello`/`HelloAck` handshake naming the table it writes into, announces
//! every channel once, and then streams `Update` messages.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::channels::{ChannelValue, ValueKind};

// ── Protocol constants ────────────────────────────────────────────────────────

/// Current protocol version byte.
pub const PROTOCOL_VERSION: u8 = 0x01;

/// Total size of the common message header in bytes.
pub const HEADER_SIZE: usize = 24;

/// Default TCP port of the table server.
pub const DEFAULT_TABLE_PORT: u16 = 24810;

// ── Message type codes ────────────────────────────────────────────────────────

/// All message type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageType {
    // Session control (0x00–0x0F)
    Hello = 0x01,
    HelloAck = 0x02,
    Ping = 0x03,
    Pong = 0x04,
    Disconnect = 0x05,
    Error = 0x06,
    // Channel data (0x10–0x1F)
    Announce = 0x10,
    Update = 0x11,
}

impl TryFrom<u8> for MessageType {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, ()> {
        match value {
            0x01 => Ok(MessageType::Hello),
            0x02 => Ok(MessageType::HelloAck),
            0x03 => Ok(MessageType::Ping),
            0x04 => Ok(MessageType::Pong),
            0x05 => Ok(MessageType::Disconnect),
            0x06 => Ok(MessageType::Error),
            0x10 => Ok(MessageType::Announce),
            0x11 => Ok(MessageType::Update),
            _ => Err(()),
        }
    }
}

// ── Common message header ─────────────────────────────────────────────────────

/// 24-byte header prepended to every message on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageHeader {
    /// Protocol version; always [`PROTOCOL_VERSION`].
    pub version: u8,
    /// Identifies the payload type.
    pub message_type: MessageType,
    /// Length of the payload in bytes (not including this header).
    pub payload_length: u32,
    /// Monotonically increasing per-connection counter.
    pub sequence_number: u64,
    /// Microseconds since Unix epoch at time of generation.
    pub timestamp_us: u64,
}

// ── Per-message payload structs ───────────────────────────────────────────────

/// HELLO (0x01): sent by a publisher to open a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloMessage {
    /// UUID v4 identifying this publisher instance.
    pub client_id: Uuid,
    /// Protocol version the publisher speaks.
    pub protocol_version: u8,
    /// Human-readable publisher name.
    pub client_name: String,
    /// Name of the table the publisher writes into.
    pub table: String,
}

/// Reason a HELLO was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum RejectReason {
    None = 0x00,
    VersionMismatch = 0x01,
    InvalidTable = 0x02,
}

impl TryFrom<u8> for RejectReason {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(RejectReason::None),
            0x01 => Ok(RejectReason::VersionMismatch),
            0x02 => Ok(RejectReason::InvalidTable),
            _ => Err(()),
        }
    }
}

/// HELLO_ACK (0x02): server reply to HELLO.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloAckMessage {
    pub accepted: bool,
    pub reject_reason: RejectReason,
    /// Human-readable server name, for logs.
    pub server_name: String,
}

/// Why a session is being closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum DisconnectReason {
    UserInitiated = 0x01,
    ServerShutdown = 0x02,
    ProtocolError = 0x03,
    Timeout = 0x04,
}

impl TryFrom<u8> for DisconnectReason {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(DisconnectReason::UserInitiated),
            0x02 => Ok(DisconnectReason::ServerShutdown),
            0x03 => Ok(DisconnectReason::ProtocolError),
            0x04 => Ok(DisconnectReason::Timeout),
            _ => Err(()),
        }
    }
}

/// Protocol-level error codes carried by ERROR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ProtocolErrorCode {
    HandshakeRequired = 0x01,
    UnknownChannel = 0x02,
    KindMismatch = 0x03,
    DuplicateChannel = 0x04,
    InvalidMessage = 0x05,
    InternalError = 0x06,
}

impl TryFrom<u8> for ProtocolErrorCode {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(ProtocolErrorCode::HandshakeRequired),
            0x02 => Ok(ProtocolErrorCode::UnknownChannel),
            0x03 => Ok(ProtocolErrorCode::KindMismatch),
            0x04 => Ok(ProtocolErrorCode::DuplicateChannel),
            0x05 => Ok(ProtocolErrorCode::InvalidMessage),
            0x06 => Ok(ProtocolErrorCode::InternalError),
            _ => Err(()),
        }
    }
}

/// ERROR (0x06): error notification, sent by the server before it closes a
/// misbehaving session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub error_code: ProtocolErrorCode,
    /// Human-readable description, for logging only.
    pub description: String,
}

/// ANNOUNCE (0x10): declares one channel before any update on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnounceMessage {
    pub channel_id: u16,
    pub kind: ValueKind,
    pub name: String,
}

/// UPDATE (0x11): new value of an announced channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateMessage {
    pub channel_id: u16,
    pub value: ChannelValue,
}

// ── Top-level message enum ────────────────────────────────────────────────────

/// All telemetry protocol messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TelemetryMessage {
    Hello(HelloMessage),
    HelloAck(HelloAckMessage),
    Ping(u64),
    Pong(u64),
    Disconnect { reason: DisconnectReason },
    Error(ErrorMessage),
    Announce(AnnounceMessage),
    Update(UpdateMessage),
}

impl TelemetryMessage {
    /// Returns the [`MessageType`] discriminant for this message.
    pub fn message_type(&self) -> MessageType {
        match self {
            TelemetryMessage::Hello(_) => MessageType::Hello,
            TelemetryMessage::HelloAck(_) => MessageType::HelloAck,
            TelemetryMessage::Ping(_) => MessageType::Ping,
            TelemetryMessage::Pong(_) => MessageType::Pong,
            TelemetryMessage::Disconnect { .. } => MessageType::Disconnect,
            TelemetryMessage::Error(_) => MessageType::Error,
            TelemetryMessage::Announce(_) => MessageType::Announce,
            TelemetryMessage::Update(_) => MessageType::Update,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_message_type_byte_parses_back() {
        for ty in [
            MessageType::Hello,
            MessageType::HelloAck,
            MessageType::Ping,
            MessageType::Pong,
            MessageType::Disconnect,
            MessageType::Error,
            MessageType::Announce,
            MessageType::Update,
        ] {
            assert_eq!(MessageType::try_from(ty as u8), Ok(ty));
        }
    }

    #[test]
    fn test_unknown_type_byte_is_rejected() {
        assert_eq!(MessageType::try_from(0x7F), Err(()));
        assert_eq!(DisconnectReason::try_from(0x00), Err(()));
    }

    #[test]
    fn test_message_type_matches_variant() {
        let msg = TelemetryMessage::Update(UpdateMessage {
            channel_id: 3,
            value: ChannelValue::Boolean(true),
        });
        assert_eq!(msg.message_type(), MessageType::Update);
        assert_eq!(TelemetryMessage::Ping(1).message_type(), MessageType::Ping);
    }
}
