//! Input-Mirror table server entry point.
//!
//! Accepts publisher connections over TCP, keeps the latest value of every
//! announced channel, and reports each change, either as a log line or as
//! one JSON object per line on stdout.
//!
//! # Usage
//!
//! ```text
//! mirror-table [OPTIONS]
//!
//! Options:
//!   --bind <IP>       Address to listen on [default: 0.0.0.0]
//!   --port <PORT>     TCP port [default: 24810]
//!   --name <NAME>     Server name sent in HelloAck [default: mirror-table]
//!   --table <NAME>    Only accept publishers writing this table
//!   --json            Print changes as JSON lines on stdout
//! ```
//!
//! | Variable             | Default        |
//! |----------------------|----------------|
//! | `MIRROR_TABLE_BIND`  | `0.0.0.0`      |
//! | `MIRROR_TABLE_PORT`  | `24810`        |
//! | `MIRROR_TABLE_NAME`  | `mirror-table` |
//!
//! # Example output with `--json`
//!
//! ```text
//! {"session":"6f1c...","client":"KeyboardMouseClient","table":"KeyboardMouseEvents","channel":"key_q","value":true,"previous":false}
//! ```

use std::net::{IpAddr, SocketAddr};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use mirror_core::protocol::DEFAULT_TABLE_PORT;
use mirror_table::application::TableChange;
use mirror_table::domain::TableServerConfig;
use mirror_table::infrastructure::run_server;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Receives Input-Mirror channel updates and reports value changes.
#[derive(Debug, Parser)]
#[command(name = "mirror-table", version)]
struct Cli {
    /// IP address to listen on.
    ///
    /// `0.0.0.0` accepts publishers from any interface, `127.0.0.1` only
    /// local ones.
    #[arg(long, default_value = "0.0.0.0", env = "MIRROR_TABLE_BIND")]
    bind: IpAddr,

    /// TCP port to listen on.
    #[arg(long, default_value_t = DEFAULT_TABLE_PORT, env = "MIRROR_TABLE_PORT")]
    port: u16,

    /// Server name reported to publishers.
    #[arg(long, default_value = "mirror-table", env = "MIRROR_TABLE_NAME")]
    name: String,

    /// Reject publishers that write any other table.
    #[arg(long)]
    table: Option<String>,

    /// Print each change as a JSON line on stdout instead of logging it.
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn to_server_config(&self) -> TableServerConfig {
        TableServerConfig {
            bind_addr: SocketAddr::new(self.bind, self.port),
            server_name: self.name.clone(),
            only_table: self.table.clone(),
        }
    }
}

/// Formats one change for `--json` output.
fn change_to_json(change: &TableChange) -> anyhow::Result<String> {
    serde_json::to_string(change).context("failed to serialize change")
}

/// Drains `rx` until every sender is gone.
async fn report_changes(mut rx: mpsc::Receiver<TableChange>, json: bool) {
    while let Some(change) = rx.recv().await {
        if json {
            match change_to_json(&change) {
                Ok(line) => println!("{line}"),
                Err(e) => error!("{e:#}"),
            }
        } else {
            let previous = change
                .previous
                .map(|v| v.to_string())
                .unwrap_or_else(|| "-".to_string());
            info!(
                "{}/{}: {} {} -> {}",
                change.client, change.table, change.channel, previous, change.value
            );
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so `--json` output on stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.to_server_config();
    info!(
        "mirror-table starting on {} as {:?}",
        config.bind_addr, config.server_name
    );

    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl-C; shutting down");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => error!("failed to listen for Ctrl-C: {e}"),
        }
    });

    let (tx, rx) = mpsc::channel(1024);
    let reporter = tokio::spawn(report_changes(rx, cli.json));

    run_server(config, tx, running).await?;

    // Every sender is gone once the server returns, so the reporter drains and ends.
    if let Err(e) = reporter.await {
        error!("change reporter failed: {e}");
    }
    info!("mirror-table stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
