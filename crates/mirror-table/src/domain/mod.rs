//! Domain layer for mirror-table.
//!
//! Pure types with no I/O, networking, or async runtime: the server
//! configuration and the channel table each publisher writes into.

pub mod config;
pub mod table;

pub use config::TableServerConfig;
pub use table::{Table, TableEntry, TableError, ValueChange};
