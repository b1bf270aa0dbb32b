//! Application layer for mirror-table.
//!
//! Knows *what* to do with each message a publisher sends (handshake,
//! validation, change detection) but leaves sockets and tasks to the
//! infrastructure layer.

pub mod session;

pub use session::{Session, SessionOutput, TableChange};
