//! Input-Mirror capture application entry point.
//!
//! Watches the local keyboard and mouse and mirrors their state into a remote
//! table as named channels.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load + validate config (TOML, then CLI overrides)
//!  └─ TcpPublisher::connect   -- handshake, announce channels
//!  └─ InputSource::start      -- OS hook / evdev threads
//!  └─ run_loop                -- drain events, decay, render, 60 Hz
//!       └─ until Ctrl-C or the input source dies
//! ```
//!
//! # Usage
//!
//! ```text
//! mirror-capture [OPTIONS]
//!
//! Options:
//!   --config <PATH>          Config file [default: platform config dir]
//!   --server <HOST>          Table server address
//!   --port <PORT>            Table server port
//!   --table <NAME>           Table to publish into
//!   --tick-rate <HZ>         Ticks per second
//!   --no-status              Do not draw the status block
//!   --write-default-config   Write the effective config and exit
//! ```

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use mirror_capture::application::tick::{run_loop, LoopExit, StatusSink};
use mirror_capture::application::translate_input::EventTranslator;
use mirror_capture::infrastructure::input_capture::platform_input_source;
use mirror_capture::infrastructure::publish::{PublisherIdentity, TcpPublisher};
use mirror_capture::infrastructure::status::{NoStatus, TerminalStatus};
use mirror_capture::infrastructure::storage::config::{
    config_file_path, load_config_from, save_config_to, AppConfig,
};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Mirrors keyboard and mouse state to a remote table.
#[derive(Debug, Parser)]
#[command(name = "mirror-capture", version)]
struct Cli {
    /// Config file to use instead of the platform default.
    #[arg(long, env = "MIRROR_CONFIG")]
    config: Option<PathBuf>,

    /// Table server host name or IP address.
    #[arg(long, env = "MIRROR_SERVER")]
    server: Option<String>,

    /// Table server TCP port.
    #[arg(long, env = "MIRROR_PORT")]
    port: Option<u16>,

    /// Table the channels are published into.
    #[arg(long)]
    table: Option<String>,

    /// Ticks per second.
    #[arg(long)]
    tick_rate: Option<u32>,

    /// Do not draw the live status block.
    #[arg(long)]
    no_status: bool,

    /// Write the effective configuration to the config path and exit.
    #[arg(long)]
    write_default_config: bool,
}

impl Cli {
    /// Applies command-line overrides on top of the file config.
    fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(server) = &self.server {
            config.publish.server_address = server.clone();
        }
        if let Some(port) = self.port {
            config.publish.port = port;
        }
        if let Some(table) = &self.table {
            config.publish.table = table.clone();
        }
        if let Some(rate) = self.tick_rate {
            config.runtime.tick_rate_hz = rate;
        }
        if self.no_status {
            config.runtime.show_status = false;
        }
    }
}

/// Says goodbye to the table server; a failure is only worth a warning.
async fn close_publisher(publisher: &TcpPublisher) {
    if let Err(e) = publisher.close().await {
        warn!("failed to close table connection cleanly: {e}");
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => config_file_path().context("no --config given and no platform config dir")?,
    };
    let mut config = load_config_from(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    cli.apply_overrides(&mut config);

    if cli.write_default_config {
        save_config_to(&config_path, &config)
            .with_context(|| format!("failed to write {}", config_path.display()))?;
        println!("wrote {}", config_path.display());
        return Ok(());
    }

    // Logs go to stderr so they do not fight with the status block on stdout.
    // `RUST_LOG` wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.runtime.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = config
        .translator_settings()
        .context("invalid configuration")?;
    let toggle_key = settings.toggle_key;
    let mut translator = EventTranslator::new(settings, Instant::now());

    // ── Publication sink ──────────────────────────────────────────────────────
    let endpoint = config.server_endpoint();
    let identity = PublisherIdentity {
        client_name: config.publish.client_name.clone(),
        table: config.publish.table.clone(),
    };
    let publisher = TcpPublisher::connect(
        &endpoint,
        &identity,
        translator.channels(),
        config.connect_timeout(),
    )
    .await
    .with_context(|| format!("failed to connect to table server at {endpoint}"))?;
    if let Err(e) = translator.publish_all(&publisher).await {
        warn!("failed to publish initial state: {e}");
    }

    // ── Input source ──────────────────────────────────────────────────────────
    let source = platform_input_source().context("no input source for this platform")?;
    let events = match source.start() {
        Ok(rx) => rx,
        Err(e) => {
            error!("input capture failed to start: {e}");
            close_publisher(&publisher).await;
            return Err(e).context("failed to start input capture");
        }
    };

    let mut status: Box<dyn StatusSink> = if config.runtime.show_status {
        Box::new(TerminalStatus::stdout(toggle_key))
    } else {
        Box::new(NoStatus)
    };

    info!(
        "mirroring {} channels to {endpoint} ({}); press Ctrl-C to exit",
        translator.channels().len(),
        publisher.server_name()
    );

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };
    let exit = run_loop(
        &mut translator,
        &events,
        &publisher,
        status.as_mut(),
        config.tick_interval(),
        shutdown,
    )
    .await;

    source.stop();
    close_publisher(&publisher).await;

    match exit {
        LoopExit::Shutdown => {
            info!("mirror-capture stopped");
            Ok(())
        }
        LoopExit::SourceClosed => bail!("input source stopped unexpectedly"),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
