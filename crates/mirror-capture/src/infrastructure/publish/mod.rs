//! Publication sinks.
//!
//! [`tcp::TcpPublisher`] is the only production implementation of the
//! application layer's `Publisher` trait.  It speaks the `mirror_core`
//! telemetry protocol to a `mirror-table` server.

pub mod tcp;

pub use tcp::{PublisherIdentity, TcpPublisher};
