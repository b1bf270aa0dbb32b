//! Storage infrastructure: configuration file persistence.
//!
//! The `config` sub-module reads the TOML configuration file from the
//! platform-appropriate directory (or an explicit path), supplies defaults
//! when the file does not exist yet, and validates what it loads.

pub mod config;
