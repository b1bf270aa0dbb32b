//! Telemetry protocol: message types and the binary codec.

pub mod codec;
pub mod messages;
pub mod sequence;

pub use codec::{decode_frame, decode_message, encode_message, encode_message_now, ProtocolError};
pub use messages::*;
pub use sequence::{SequenceCounter, SequenceTracker};
