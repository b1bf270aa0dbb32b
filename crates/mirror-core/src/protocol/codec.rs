//! Binary codec for encoding and decoding telemetry protocol messages.
//!
//! Wire format:
//! ```text
//! [version:1][msg_type:1][reserved:2][payload_len:4][seq:8][timestamp_us:8][payload:N]
//! ```
//! Total header size: 24 bytes. All multi-byte integers are big-endian;
//! doubles travel as their IEEE-754 bit pattern.
//!
//! Payloads:
//! ```text
//! Hello       [client_id:16][protocol_version:1][client_name:lp][table:lp]
//! HelloAck    [accepted:1][reject_reason:1][server_name:lp]
//! Ping/Pong   [token:8]
//! Disconnect  [reason:1]
//! Error       [code:1][description:lp]
//! Announce    [channel_id:2][kind:1][name:lp]
//! Update      [channel_id:2][kind:1][value:1 (bool) | 8 (double)]
//! ```
//! `lp` is a 2-byte length prefix followed by UTF-8 bytes.

use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;
use uuid::Uuid;

use crate::domain::channels::{ChannelValue, ValueKind};
use crate::protocol::messages::{
    AnnounceMessage, DisconnectReason, ErrorMessage, HelloAckMessage, HelloMessage, MessageHeader,
    MessageType, ProtocolErrorCode, RejectReason, TelemetryMessage, UpdateMessage, HEADER_SIZE,
    PROTOCOL_VERSION,
};

/// Largest payload a decoder accepts.
pub const MAX_PAYLOAD_SIZE: usize = 64 * 1024;

const KIND_BOOLEAN: u8 = 0x01;
const KIND_DOUBLE: u8 = 0x02;

/// Errors that can occur during message encoding or decoding.
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    /// The byte slice does not yet hold a complete message.
    #[error("insufficient data: need at least {needed} bytes, got {available}")]
    InsufficientData { needed: usize, available: usize },

    /// The message type byte in the header is not a recognized value.
    #[error("unknown message type: 0x{0:02X}")]
    UnknownMessageType(u8),

    /// The protocol version in the header is not supported.
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(u8),

    /// The payload could not be parsed (field value out of range, UTF-8 error, etc.).
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// The header declares a payload larger than [`MAX_PAYLOAD_SIZE`].
    #[error("payload too large: header declares {declared} bytes, limit is {limit}")]
    PayloadTooLarge { declared: usize, limit: usize },
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes a [`TelemetryMessage`] into a byte vector including the 24-byte
/// header.
///
/// The sequence number is **not** set by this function – pass a value from a
/// [`crate::protocol::SequenceCounter`].
///
/// # Errors
///
/// Returns [`ProtocolError::PayloadTooLarge`] if the payload exceeds
/// [`MAX_PAYLOAD_SIZE`].
///
/// # Examples
///
/// ```rust
/// use mirror_core::protocol::{decode_message, encode_message, TelemetryMessage};
///
/// let msg = TelemetryMessage::Ping(42);
/// let bytes = encode_message(&msg, 0, 0).unwrap();
/// let (decoded, consumed) = decode_message(&bytes).unwrap();
/// assert_eq!(decoded, msg);
/// assert_eq!(consumed, bytes.len());
/// ```
pub fn encode_message(
    msg: &TelemetryMessage,
    sequence_number: u64,
    timestamp_us: u64,
) -> Result<Vec<u8>, ProtocolError> {
    let payload = encode_payload(msg);
    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(ProtocolError::PayloadTooLarge {
            declared: payload.len(),
            limit: MAX_PAYLOAD_SIZE,
        });
    }
    let payload_len = payload.len() as u32;

    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    buf.push(PROTOCOL_VERSION);
    buf.push(msg.message_type() as u8);
    buf.push(0x00); // reserved
    buf.push(0x00); // reserved
    buf.extend_from_slice(&payload_len.to_be_bytes());
    buf.extend_from_slice(&sequence_number.to_be_bytes());
    buf.extend_from_slice(&timestamp_us.to_be_bytes());
    buf.extend_from_slice(&payload);
    Ok(buf)
}

/// Encodes a [`TelemetryMessage`] using the current system time as the
/// timestamp.
///
/// # Errors
///
/// See [`encode_message`].
pub fn encode_message_now(
    msg: &TelemetryMessage,
    sequence_number: u64,
) -> Result<Vec<u8>, ProtocolError> {
    let timestamp_us = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros() as u64;
    encode_message(msg, sequence_number, timestamp_us)
}

/// Decodes one [`TelemetryMessage`] from the beginning of `bytes`.
///
/// Returns the decoded message and the total number of bytes consumed
/// (header + payload), so a stream reader can drain its buffer.
///
/// # Errors
///
/// Returns [`ProtocolError::InsufficientData`] while `bytes` holds only part
/// of a message (header or payload); stream readers treat that as "read
/// more".  Any other error means the stream is corrupt.
pub fn decode_message(bytes: &[u8]) -> Result<(TelemetryMessage, usize), ProtocolError> {
    decode_frame(bytes).map(|(_, msg, consumed)| (msg, consumed))
}

/// Like [`decode_message`], but also returns the decoded header so that a
/// receiver can check sequence numbers and timestamps.
///
/// # Errors
///
/// See [`decode_message`].
pub fn decode_frame(
    bytes: &[u8],
) -> Result<(MessageHeader, TelemetryMessage, usize), ProtocolError> {
    let header = decode_header(bytes)?;
    let total_needed = HEADER_SIZE + header.payload_length as usize;
    if bytes.len() < total_needed {
        return Err(ProtocolError::InsufficientData {
            needed: total_needed,
            available: bytes.len(),
        });
    }

    let payload = &bytes[HEADER_SIZE..total_needed];
    let msg = decode_payload(header.message_type, payload)?;
    Ok((header, msg, total_needed))
}

fn decode_header(bytes: &[u8]) -> Result<MessageHeader, ProtocolError> {
    if bytes.len() < HEADER_SIZE {
        return Err(ProtocolError::InsufficientData {
            needed: HEADER_SIZE,
            available: bytes.len(),
        });
    }

    let version = bytes[0];
    if version != PROTOCOL_VERSION {
        return Err(ProtocolError::UnsupportedVersion(version));
    }

    let message_type = MessageType::try_from(bytes[1])
        .map_err(|_| ProtocolError::UnknownMessageType(bytes[1]))?;

    // bytes[2..4] are reserved – ignored on decode

    let payload_length = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    if payload_length as usize > MAX_PAYLOAD_SIZE {
        return Err(ProtocolError::PayloadTooLarge {
            declared: payload_length as usize,
            limit: MAX_PAYLOAD_SIZE,
        });
    }
    let mut seq = [0u8; 8];
    seq.copy_from_slice(&bytes[8..16]);
    let mut ts = [0u8; 8];
    ts.copy_from_slice(&bytes[16..24]);
    Ok(MessageHeader {
        version,
        message_type,
        payload_length,
        sequence_number: u64::from_be_bytes(seq),
        timestamp_us: u64::from_be_bytes(ts),
    })
}

// ── Payload encoding ──────────────────────────────────────────────────────────

fn encode_payload(msg: &TelemetryMessage) -> Vec<u8> {
    let mut buf = Vec::new();
    match msg {
        TelemetryMessage::Hello(m) => encode_hello(&mut buf, m),
        TelemetryMessage::HelloAck(m) => encode_hello_ack(&mut buf, m),
        TelemetryMessage::Ping(token) => buf.extend_from_slice(&token.to_be_bytes()),
        TelemetryMessage::Pong(token) => buf.extend_from_slice(&token.to_be_bytes()),
        TelemetryMessage::Disconnect { reason } => buf.push(*reason as u8),
        TelemetryMessage::Error(m) => encode_error(&mut buf, m),
        TelemetryMessage::Announce(m) => encode_announce(&mut buf, m),
        TelemetryMessage::Update(m) => encode_update(&mut buf, m),
    }
    buf
}

fn encode_hello(buf: &mut Vec<u8>, m: &HelloMessage) {
    buf.extend_from_slice(m.client_id.as_bytes());
    buf.push(m.protocol_version);
    write_length_prefixed_string(buf, &m.client_name);
    write_length_prefixed_string(buf, &m.table);
}

fn encode_hello_ack(buf: &mut Vec<u8>, m: &HelloAckMessage) {
    buf.push(if m.accepted { 0x01 } else { 0x00 });
    buf.push(m.reject_reason as u8);
    write_length_prefixed_string(buf, &m.server_name);
}

fn encode_error(buf: &mut Vec<u8>, m: &ErrorMessage) {
    buf.push(m.error_code as u8);
    write_length_prefixed_string(buf, &m.description);
}

fn encode_announce(buf: &mut Vec<u8>, m: &AnnounceMessage) {
    buf.extend_from_slice(&m.channel_id.to_be_bytes());
    buf.push(kind_byte(m.kind));
    write_length_prefixed_string(buf, &m.name);
}

fn encode_update(buf: &mut Vec<u8>, m: &UpdateMessage) {
    buf.extend_from_slice(&m.channel_id.to_be_bytes());
    buf.push(kind_byte(m.value.kind()));
    match m.value {
        ChannelValue::Boolean(b) => buf.push(if b { 0x01 } else { 0x00 }),
        ChannelValue::Double(d) => buf.extend_from_slice(&d.to_bits().to_be_bytes()),
    }
}

fn kind_byte(kind: ValueKind) -> u8 {
    match kind {
        ValueKind::Boolean => KIND_BOOLEAN,
        ValueKind::Double => KIND_DOUBLE,
    }
}

// ── Payload decoding ──────────────────────────────────────────────────────────

fn decode_payload(msg_type: MessageType, payload: &[u8]) -> Result<TelemetryMessage, ProtocolError> {
    match msg_type {
        MessageType::Hello => decode_hello(payload).map(TelemetryMessage::Hello),
        MessageType::HelloAck => decode_hello_ack(payload).map(TelemetryMessage::HelloAck),
        MessageType::Ping => Ok(TelemetryMessage::Ping(read_u64(payload, 0)?)),
        MessageType::Pong => Ok(TelemetryMessage::Pong(read_u64(payload, 0)?)),
        MessageType::Disconnect => {
            require_len(payload, 1, "Disconnect")?;
            let reason = DisconnectReason::try_from(payload[0]).map_err(|_| {
                ProtocolError::MalformedPayload(format!("unknown disconnect reason: {}", payload[0]))
            })?;
            Ok(TelemetryMessage::Disconnect { reason })
        }
        MessageType::Error => decode_error(payload).map(TelemetryMessage::Error),
        MessageType::Announce => decode_announce(payload).map(TelemetryMessage::Announce),
        MessageType::Update => decode_update(payload).map(TelemetryMessage::Update),
    }
}

fn decode_hello(p: &[u8]) -> Result<HelloMessage, ProtocolError> {
    // 16 (uuid) + 1 (proto ver) + 2 (name_len) + 2 (table_len)
    require_len(p, 21, "Hello")?;
    let client_id = read_uuid(p, 0)?;
    let protocol_version = p[16];
    let (client_name, name_end) = read_length_prefixed_string(p, 17)?;
    let (table, _) = read_length_prefixed_string(p, name_end)?;
    Ok(HelloMessage {
        client_id,
        protocol_version,
        client_name,
        table,
    })
}

fn decode_hello_ack(p: &[u8]) -> Result<HelloAckMessage, ProtocolError> {
    // 1 (accepted) + 1 (reject) + 2 (name_len)
    require_len(p, 4, "HelloAck")?;
    let accepted = p[0] != 0;
    let reject_reason = RejectReason::try_from(p[1])
        .map_err(|_| ProtocolError::MalformedPayload(format!("unknown reject reason: {}", p[1])))?;
    let (server_name, _) = read_length_prefixed_string(p, 2)?;
    Ok(HelloAckMessage {
        accepted,
        reject_reason,
        server_name,
    })
}

fn decode_error(p: &[u8]) -> Result<ErrorMessage, ProtocolError> {
    require_len(p, 3, "Error")?;
    let error_code =
        ProtocolErrorCode::try_from(p[0]).unwrap_or(ProtocolErrorCode::InternalError);
    let (description, _) = read_length_prefixed_string(p, 1)?;
    Ok(ErrorMessage {
        error_code,
        description,
    })
}

fn decode_announce(p: &[u8]) -> Result<AnnounceMessage, ProtocolError> {
    // 2 (id) + 1 (kind) + 2 (name_len)
    require_len(p, 5, "Announce")?;
    let channel_id = u16::from_be_bytes([p[0], p[1]]);
    let kind = read_kind(p[2])?;
    let (name, _) = read_length_prefixed_string(p, 3)?;
    if name.is_empty() {
        return Err(ProtocolError::MalformedPayload(
            "Announce: empty channel name".to_string(),
        ));
    }
    Ok(AnnounceMessage {
        channel_id,
        kind,
        name,
    })
}

fn decode_update(p: &[u8]) -> Result<UpdateMessage, ProtocolError> {
    require_len(p, 3, "Update")?;
    let channel_id = u16::from_be_bytes([p[0], p[1]]);
    let value = match read_kind(p[2])? {
        ValueKind::Boolean => {
            require_len(p, 4, "Update.boolean")?;
            ChannelValue::Boolean(p[3] != 0)
        }
        ValueKind::Double => ChannelValue::Double(f64::from_bits(read_u64(p, 3)?)),
    };
    Ok(UpdateMessage { channel_id, value })
}

fn read_kind(byte: u8) -> Result<ValueKind, ProtocolError> {
    match byte {
        KIND_BOOLEAN => Ok(ValueKind::Boolean),
        KIND_DOUBLE => Ok(ValueKind::Double),
        other => Err(ProtocolError::MalformedPayload(format!(
            "unknown value kind: {other}"
        ))),
    }
}

// ── Low-level helpers ─────────────────────────────────────────────────────────

fn require_len(buf: &[u8], needed: usize, context: &str) -> Result<(), ProtocolError> {
    if buf.len() < needed {
        Err(ProtocolError::MalformedPayload(format!(
            "{context}: need {needed} bytes, got {}",
            buf.len()
        )))
    } else {
        Ok(())
    }
}

fn read_u64(buf: &[u8], offset: usize) -> Result<u64, ProtocolError> {
    let bytes: [u8; 8] = buf
        .get(offset..offset + 8)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| {
            ProtocolError::MalformedPayload(format!(
                "need 8 bytes at offset {offset}, got {}",
                buf.len().saturating_sub(offset)
            ))
        })?;
    Ok(u64::from_be_bytes(bytes))
}

fn read_uuid(buf: &[u8], offset: usize) -> Result<Uuid, ProtocolError> {
    let bytes: [u8; 16] = buf
        .get(offset..offset + 16)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| {
            ProtocolError::MalformedPayload(format!(
                "need 16 bytes for UUID at offset {offset}, got {}",
                buf.len().saturating_sub(offset)
            ))
        })?;
    Ok(Uuid::from_bytes(bytes))
}

/// Writes a 2-byte length prefix followed by the UTF-8 string bytes.
///
/// Strings longer than `u16::MAX` bytes are truncated at the last character
/// boundary that fits.
fn write_length_prefixed_string(buf: &mut Vec<u8>, s: &str) {
    let mut len = s.len().min(u16::MAX as usize);
    while !s.is_char_boundary(len) {
        len -= 1;
    }
    buf.extend_from_slice(&(len as u16).to_be_bytes());
    buf.extend_from_slice(&s.as_bytes()[..len]);
}

/// Reads a 2-byte length prefix and then that many UTF-8 bytes.
/// Returns the string and the offset of the byte after the string.
fn read_length_prefixed_string(buf: &[u8], offset: usize) -> Result<(String, usize), ProtocolError> {
    if buf.len() < offset + 2 {
        return Err(ProtocolError::MalformedPayload(format!(
            "need 2 bytes for string length at offset {offset}"
        )));
    }
    let len = u16::from_be_bytes([buf[offset], buf[offset + 1]]) as usize;
    let start = offset + 2;
    if buf.len() < start + len {
        return Err(ProtocolError::MalformedPayload(format!(
            "string of length {len} at offset {start} exceeds buffer"
        )));
    }
    let s = std::str::from_utf8(&buf[start..start + len])
        .map_err(|e| ProtocolError::MalformedPayload(format!("invalid UTF-8: {e}")))?
        .to_string();
    Ok((s, start + len))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(msg: &TelemetryMessage) -> TelemetryMessage {
        let encoded = encode_message(msg, 0, 0).expect("encode failed");
        let (decoded, consumed) = decode_message(&encoded).expect("decode failed");
        assert_eq!(consumed, encoded.len(), "consumed bytes should equal total encoded size");
        decoded
    }

    #[test]
    fn test_hello_round_trip() {
        let msg = TelemetryMessage::Hello(HelloMessage {
            client_id: Uuid::new_v4(),
            protocol_version: PROTOCOL_VERSION,
            client_name: "KeyboardMouseClient".to_string(),
            table: "KeyboardMouseEvents".to_string(),
        });
        assert_eq!(round_trip(&msg), msg);
    }

    #[test]
    fn test_hello_ack_rejected_round_trip() {
        let msg = TelemetryMessage::HelloAck(HelloAckMessage {
            accepted: false,
            reject_reason: RejectReason::InvalidTable,
            server_name: String::new(),
        });
        assert_eq!(round_trip(&msg), msg);
    }

    #[test]
    fn test_update_double_preserves_exact_bits() {
        let msg = TelemetryMessage::Update(UpdateMessage {
            channel_id: 21,
            value: ChannelValue::Double(-0.123_456_789),
        });
        assert_eq!(round_trip(&msg), msg);
    }

    #[test]
    fn test_update_boolean_payload_is_four_bytes() {
        // Arrange
        let msg = TelemetryMessage::Update(UpdateMessage {
            channel_id: 0x0102,
            value: ChannelValue::Boolean(true),
        });

        // Act
        let bytes = encode_message(&msg, 7, 0).unwrap();

        // Assert
        assert_eq!(bytes.len(), HEADER_SIZE + 4);
        assert_eq!(&bytes[HEADER_SIZE..], &[0x01, 0x02, KIND_BOOLEAN, 0x01]);
    }

    #[test]
    fn test_header_layout() {
        let bytes = encode_message(&TelemetryMessage::Pong(5), 0x0A0B, 0x0C0D).unwrap();
        assert_eq!(bytes[0], PROTOCOL_VERSION);
        assert_eq!(bytes[1], MessageType::Pong as u8);
        assert_eq!(&bytes[2..4], &[0, 0]);
        assert_eq!(&bytes[4..8], &8u32.to_be_bytes());
        assert_eq!(&bytes[8..16], &0x0A0Bu64.to_be_bytes());
        assert_eq!(&bytes[16..24], &0x0C0Du64.to_be_bytes());
    }

    #[test]
    fn test_decode_frame_returns_sequence_and_timestamp() {
        let bytes = encode_message(&TelemetryMessage::Ping(1), 41, 1_000_000).unwrap();

        let (header, msg, consumed) = decode_frame(&bytes).unwrap();

        assert_eq!(header.sequence_number, 41);
        assert_eq!(header.timestamp_us, 1_000_000);
        assert_eq!(header.message_type, MessageType::Ping);
        assert_eq!(header.payload_length, 8);
        assert_eq!(msg, TelemetryMessage::Ping(1));
        assert_eq!(consumed, bytes.len());
    }

    #[test]
    fn test_partial_header_is_insufficient_data() {
        let bytes = encode_message(&TelemetryMessage::Ping(1), 0, 0).unwrap();
        assert!(matches!(
            decode_message(&bytes[..10]),
            Err(ProtocolError::InsufficientData { needed: HEADER_SIZE, .. })
        ));
    }

    #[test]
    fn test_partial_payload_is_insufficient_data() {
        let bytes = encode_message(&TelemetryMessage::Ping(1), 0, 0).unwrap();
        assert_eq!(
            decode_message(&bytes[..HEADER_SIZE + 3]),
            Err(ProtocolError::InsufficientData {
                needed: HEADER_SIZE + 8,
                available: HEADER_SIZE + 3,
            })
        );
    }

    #[test]
    fn test_two_concatenated_messages_decode_in_order() {
        let mut stream = encode_message(&TelemetryMessage::Ping(1), 0, 0).unwrap();
        stream.extend(encode_message(&TelemetryMessage::Pong(2), 1, 0).unwrap());

        let (first, n) = decode_message(&stream).unwrap();
        let (second, _) = decode_message(&stream[n..]).unwrap();

        assert_eq!(first, TelemetryMessage::Ping(1));
        assert_eq!(second, TelemetryMessage::Pong(2));
    }

    #[test]
    fn test_wrong_version_is_rejected() {
        let mut bytes = encode_message(&TelemetryMessage::Ping(1), 0, 0).unwrap();
        bytes[0] = 0x09;
        assert_eq!(decode_message(&bytes), Err(ProtocolError::UnsupportedVersion(0x09)));
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let mut bytes = encode_message(&TelemetryMessage::Ping(1), 0, 0).unwrap();
        bytes[1] = 0xEE;
        assert_eq!(decode_message(&bytes), Err(ProtocolError::UnknownMessageType(0xEE)));
    }

    #[test]
    fn test_oversized_declared_payload_is_rejected() {
        let mut bytes = encode_message(&TelemetryMessage::Ping(1), 0, 0).unwrap();
        bytes[4..8].copy_from_slice(&(MAX_PAYLOAD_SIZE as u32 + 1).to_be_bytes());
        assert!(matches!(
            decode_message(&bytes),
            Err(ProtocolError::PayloadTooLarge { .. })
        ));
    }

    #[test]
    fn test_unknown_value_kind_is_malformed() {
        let msg = TelemetryMessage::Update(UpdateMessage {
            channel_id: 1,
            value: ChannelValue::Boolean(false),
        });
        let mut bytes = encode_message(&msg, 0, 0).unwrap();
        bytes[HEADER_SIZE + 2] = 0x7F;
        assert!(matches!(
            decode_message(&bytes),
            Err(ProtocolError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_announce_with_empty_name_is_malformed() {
        let msg = TelemetryMessage::Announce(AnnounceMessage {
            channel_id: 1,
            kind: ValueKind::Double,
            name: String::new(),
        });
        let bytes = encode_message(&msg, 0, 0).unwrap();
        assert!(matches!(
            decode_message(&bytes),
            Err(ProtocolError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_long_multibyte_string_truncates_on_char_boundary() {
        let mut buf = Vec::new();
        let name = "é".repeat(40_000);
        write_length_prefixed_string(&mut buf, &name);
        let (decoded, _) = read_length_prefixed_string(&buf, 0).unwrap();
        assert!(decoded.len() <= u16::MAX as usize);
        assert!(name.starts_with(&decoded));
    }
}
