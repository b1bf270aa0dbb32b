//! Infrastructure layer for mirror-table.
//!
//! Handles all I/O: the TCP listener, per-publisher session tasks, and frame
//! reading and writing.  What to do with each message is decided by the
//! application layer.

pub mod server;

pub use server::{bind, run_server, serve};
