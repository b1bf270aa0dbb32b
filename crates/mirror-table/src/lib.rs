//! mirror-table library crate.
//!
//! The receiving end of Input-Mirror: a TCP server that publishers connect
//! to, announce their channels on, and stream value updates into.
//!
//! # Architecture
//!
//! ```text
//! mirror-capture (publisher, binary frames over TCP)
//!         ↓
//! [mirror-table]
//!   ├── domain/           TableServerConfig, Table (latest value per channel)
//!   ├── application/      Session: handshake, validation, change detection
//!   └── infrastructure/
//!         └── server/     Accept loop and per-session tasks (tokio)
//! ```
//!
//! `domain` and `application` do no I/O, so the protocol rules are tested
//! without a socket.

/// Domain layer: pure types (no I/O).
pub mod domain;

/// Application layer: per-connection session logic.
pub mod application;

/// Infrastructure layer: TCP listener and session tasks.
pub mod infrastructure;
