//! Integration tests for the mirror-core telemetry codec.
//!
//! These tests encode a whole publisher session (handshake, channel
//! announcements, updates, disconnect) into one byte stream and decode it the
//! way a table server reads a TCP socket: in arbitrary chunks.

use mirror_core::{
    decode_message, encode_message,
    protocol::{
        messages::{
            AnnounceMessage, DisconnectReason, HelloMessage, UpdateMessage, PROTOCOL_VERSION,
        },
        sequence::{SequenceCounter, SequenceTracker},
        ProtocolError,
    },
    ChannelMap, ChannelValue, HidKeyCode, Modifier, MouseButton, TelemetryMessage, TrackedSet,
};
use uuid::Uuid;

fn session_messages() -> Vec<TelemetryMessage> {
    let tracked = TrackedSet::new(
        vec![HidKeyCode::KeyQ, HidKeyCode::KeyW],
        vec![Modifier::Ctrl],
        vec![MouseButton::Left],
    )
    .unwrap();
    let map = ChannelMap::new(&tracked);

    let mut messages = vec![TelemetryMessage::Hello(HelloMessage {
        client_id: Uuid::new_v4(),
        protocol_version: PROTOCOL_VERSION,
        client_name: "KeyboardMouseClient".to_string(),
        table: "KeyboardMouseEvents".to_string(),
    })];
    for channel in map.channels() {
        messages.push(TelemetryMessage::Announce(AnnounceMessage {
            channel_id: channel.id,
            kind: channel.kind,
            name: channel.name.clone(),
        }));
    }
    messages.push(TelemetryMessage::Update(UpdateMessage {
        channel_id: 0,
        value: ChannelValue::Boolean(true),
    }));
    messages.push(TelemetryMessage::Update(UpdateMessage {
        channel_id: map.len() as u16 - 3,
        value: ChannelValue::Double(0.2),
    }));
    messages.push(TelemetryMessage::Disconnect {
        reason: DisconnectReason::UserInitiated,
    });
    messages
}

fn encode_stream(messages: &[TelemetryMessage]) -> Vec<u8> {
    let counter = SequenceCounter::new();
    let mut stream = Vec::new();
    for msg in messages {
        stream.extend(encode_message(msg, counter.next(), 0).expect("encode must succeed"));
    }
    stream
}

/// Feeds `stream` to a decoder `chunk` bytes at a time.
fn decode_chunked(stream: &[u8], chunk: usize) -> Vec<TelemetryMessage> {
    let mut buf = Vec::new();
    let mut out = Vec::new();
    for piece in stream.chunks(chunk) {
        buf.extend_from_slice(piece);
        loop {
            match decode_message(&buf) {
                Ok((msg, consumed)) => {
                    buf.drain(..consumed);
                    out.push(msg);
                }
                Err(ProtocolError::InsufficientData { .. }) => break,
                Err(e) => panic!("unexpected decode error: {e}"),
            }
        }
    }
    assert!(buf.is_empty(), "no trailing bytes may remain");
    out
}

#[test]
fn test_session_survives_byte_at_a_time_delivery() {
    let messages = session_messages();
    let stream = encode_stream(&messages);

    assert_eq!(decode_chunked(&stream, 1), messages);
}

#[test]
fn test_session_survives_odd_sized_chunks() {
    let messages = session_messages();
    let stream = encode_stream(&messages);

    for chunk in [7, 23, 24, 25, 4096] {
        assert_eq!(decode_chunked(&stream, chunk), messages, "chunk size {chunk}");
    }
}

#[test]
fn test_announcements_cover_every_channel_name() {
    let names: Vec<String> = session_messages()
        .into_iter()
        .filter_map(|m| match m {
            TelemetryMessage::Announce(a) => Some(a.name),
            _ => None,
        })
        .collect();

    assert_eq!(
        names,
        vec![
            "key_q",
            "key_w",
            "key_ctrl",
            "btn_mouse_left",
            "mouse_speed_x",
            "mouse_speed_y",
            "scroll_wheel_speed",
        ]
    );
}

#[test]
fn test_sequence_numbers_have_no_gaps() {
    let stream = encode_stream(&session_messages());
    let mut tracker = SequenceTracker::new();
    let mut offset = 0;
    while offset < stream.len() {
        let seq = u64::from_be_bytes(stream[offset + 8..offset + 16].try_into().unwrap());
        tracker.observe(seq);
        let (_, consumed) = decode_message(&stream[offset..]).unwrap();
        offset += consumed;
    }
    assert_eq!(tracker.gaps(), 0);
}
