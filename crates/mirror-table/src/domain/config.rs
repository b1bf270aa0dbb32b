//! Table server configuration.
//!
//! [`TableServerConfig`] holds every runtime setting.  `main.rs` fills it from
//! CLI arguments; tests use the defaults or build one by hand.

use std::net::{Ipv4Addr, SocketAddr};

use mirror_core::protocol::DEFAULT_TABLE_PORT;

/// All runtime configuration for the table server.
///
/// Built once at startup and shared across session tasks behind an `Arc`.
///
/// # Example
///
/// ```rust
/// use mirror_table::domain::TableServerConfig;
///
/// let cfg = TableServerConfig::default();
/// assert_eq!(cfg.bind_addr.port(), 24810);
/// ```
#[derive(Debug, Clone)]
pub struct TableServerConfig {
    /// Address the TCP listener binds to.
    pub bind_addr: SocketAddr,

    /// Name reported to publishers in `HelloAck`.
    pub server_name: String,

    /// When set, publishers asking for any other table are rejected.
    pub only_table: Option<String>,
}

impl Default for TableServerConfig {
    /// | Field        | Default         |
    /// |--------------|-----------------|
    /// | bind_addr    | `0.0.0.0:24810` |
    /// | server_name  | `mirror-table`  |
    /// | only_table   | none            |
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_TABLE_PORT)),
            server_name: "mirror-table".to_string(),
            only_table: None,
        }
    }
}

impl TableServerConfig {
    /// Whether a publisher may write `table`.
    pub fn accepts_table(&self, table: &str) -> bool {
        !table.trim().is_empty() && self.only_table.as_deref().map_or(true, |only| only == table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_port_matches_protocol_default() {
        // Arrange / Act
        let cfg = TableServerConfig::default();
        // Assert
        assert_eq!(cfg.bind_addr.port(), 24810);
        assert!(cfg.bind_addr.ip().is_unspecified());
    }

    #[test]
    fn test_any_named_table_is_accepted_by_default() {
        let cfg = TableServerConfig::default();
        assert!(cfg.accepts_table("KeyboardMouseEvents"));
        assert!(!cfg.accepts_table("  "));
    }

    #[test]
    fn test_only_table_restricts_names() {
        let cfg = TableServerConfig {
            only_table: Some("KeyboardMouseEvents".to_string()),
            ..TableServerConfig::default()
        };
        assert!(cfg.accepts_table("KeyboardMouseEvents"));
        assert!(!cfg.accepts_table("Other"));
    }
}
