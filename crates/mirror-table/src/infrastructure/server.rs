//! TCP table server: accept loop and per-publisher session tasks.
//!
//! 1. Binds a TCP listener on the configured address.
//! 2. Accepts publisher connections, one Tokio task each.
//! 3. Decodes frames from each stream, feeds them to a [`Session`], writes
//!    the replies, and forwards value changes to the change channel.
//! 4. Stops when the `running` flag is cleared; open sessions are sent
//!    `Disconnect { ServerShutdown }`.
//!
//! TCP is a stream protocol, so each session keeps a receive buffer and
//! decodes in a loop until [`ProtocolError::InsufficientData`] asks for more.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use mirror_core::protocol::{
    decode_frame, encode_message_now, DisconnectReason, ErrorMessage, ProtocolErrorCode,
    SequenceCounter,
};
use mirror_core::{ProtocolError, TelemetryMessage};

use crate::application::{Session, TableChange};
use crate::domain::TableServerConfig;

/// How often blocked accepts and reads wake up to check the `running` flag.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

// ── Public API ────────────────────────────────────────────────────────────────

/// Binds the listener for `addr`.
///
/// # Errors
///
/// Fails if the port is in use or the process may not bind it.
pub async fn bind(addr: SocketAddr) -> anyhow::Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind table server on {addr}"))
}

/// Binds `config.bind_addr` and serves until `running` is cleared.
///
/// # Errors
///
/// See [`bind`].
pub async fn run_server(
    config: TableServerConfig,
    changes: mpsc::Sender<TableChange>,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let listener = bind(config.bind_addr).await?;
    serve(listener, config, changes, running).await
}

/// Accepts publishers on `listener` until `running` is cleared, then waits
/// for every open session to say goodbye.
///
/// Each connection gets its own task, so a slow publisher never delays the
/// others.
///
/// # Errors
///
/// Only if the listener's local address cannot be read; accept errors are
/// logged and the loop continues.
pub async fn serve(
    listener: TcpListener,
    config: TableServerConfig,
    changes: mpsc::Sender<TableChange>,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let local = listener
        .local_addr()
        .context("failed to read listener address")?;
    info!("table server {:?} listening on {local}", config.server_name);

    let config = Arc::new(config);
    let mut sessions = JoinSet::new();

    while running.load(Ordering::Relaxed) {
        match timeout(POLL_INTERVAL, listener.accept()).await {
            Ok(Ok((stream, peer_addr))) => {
                info!("publisher connected from {peer_addr}");
                let cfg = Arc::clone(&config);
                let tx = changes.clone();
                let flag = Arc::clone(&running);
                sessions.spawn(async move {
                    handle_publisher(stream, peer_addr, cfg, tx, flag).await;
                });
            }
            Ok(Err(e)) => error!("accept error: {e}"),
            // No connection within the poll interval; reap finished sessions.
            Err(_) => {
                while let Ok(Some(_)) = timeout(Duration::ZERO, sessions.join_next()).await {}
            }
        }
    }

    info!("shutdown flag set; waiting for {} session(s)", sessions.len());
    while sessions.join_next().await.is_some() {}
    Ok(())
}

// ── Per-session handler ───────────────────────────────────────────────────────

/// Entry point of each session task: runs [`run_session`] and logs the
/// outcome.
async fn handle_publisher(
    stream: TcpStream,
    peer_addr: SocketAddr,
    config: Arc<TableServerConfig>,
    changes: mpsc::Sender<TableChange>,
    running: Arc<AtomicBool>,
) {
    match run_session(stream, peer_addr, &config, &changes, &running).await {
        Ok(()) => info!("session {peer_addr} closed"),
        Err(e) => warn!("session {peer_addr} closed with error: {e:#}"),
    }
}

async fn run_session(
    stream: TcpStream,
    peer_addr: SocketAddr,
    config: &TableServerConfig,
    changes: &mpsc::Sender<TableChange>,
    running: &AtomicBool,
) -> anyhow::Result<()> {
    stream.set_nodelay(true).context("failed to set TCP_NODELAY")?;
    let (mut read_half, mut write_half) = stream.into_split();
    let sequence = SequenceCounter::new();
    let mut session = Session::new();

    let mut recv_buf: Vec<u8> = Vec::with_capacity(4096);
    let mut read_tmp = vec![0u8; 4096];

    loop {
        if !running.load(Ordering::Relaxed) {
            let bye = TelemetryMessage::Disconnect {
                reason: DisconnectReason::ServerShutdown,
            };
            write_frame(&mut write_half, &sequence, &bye).await?;
            let _ = write_half.shutdown().await;
            return Ok(());
        }

        let n = match timeout(POLL_INTERVAL, read_half.read(&mut read_tmp)).await {
            Err(_) => continue,
            Ok(Ok(0)) => {
                debug!("session {peer_addr}: connection closed (EOF)");
                return Ok(());
            }
            Ok(Ok(n)) => n,
            Ok(Err(e)) => return Err(e).context("read from publisher failed"),
        };
        recv_buf.extend_from_slice(&read_tmp[..n]);

        loop {
            let (header, message, consumed) = match decode_frame(&recv_buf) {
                Ok(frame) => frame,
                Err(ProtocolError::InsufficientData { .. }) => break,
                Err(e) => {
                    let reply = TelemetryMessage::Error(ErrorMessage {
                        error_code: ProtocolErrorCode::InvalidMessage,
                        description: e.to_string(),
                    });
                    // The stream is unsalvageable; the error reply is best effort.
                    let _ = write_frame(&mut write_half, &sequence, &reply).await;
                    return Err(e).context("undecodable frame from publisher");
                }
            };
            recv_buf.drain(..consumed);
            debug!(
                "session {peer_addr}: {:?} seq={}",
                message.message_type(),
                header.sequence_number
            );

            let out = session.handle(config, message, header.sequence_number);
            if out.skipped > 0 {
                warn!(
                    "session {peer_addr}: {} frame(s) missing before seq {} ({} total)",
                    out.skipped,
                    header.sequence_number,
                    session.sequence_gaps()
                );
            }
            for reply in &out.replies {
                match reply {
                    TelemetryMessage::HelloAck(ack) if ack.accepted => info!(
                        "session {peer_addr}: {:?} writes table {:?}",
                        session.client_name().unwrap_or_default(),
                        session.table().map(|t| t.name()).unwrap_or_default()
                    ),
                    TelemetryMessage::HelloAck(ack) => {
                        warn!("session {peer_addr}: rejected ({:?})", ack.reject_reason)
                    }
                    TelemetryMessage::Error(e) => {
                        warn!("session {peer_addr}: {:?}: {}", e.error_code, e.description)
                    }
                    _ => {}
                }
                write_frame(&mut write_half, &sequence, reply).await?;
            }
            for change in out.changes {
                if changes.send(change).await.is_err() {
                    debug!("change receiver dropped; value not forwarded");
                }
            }
            if out.close {
                let _ = write_half.shutdown().await;
                return Ok(());
            }
        }
    }
}

async fn write_frame(
    writer: &mut OwnedWriteHalf,
    sequence: &SequenceCounter,
    message: &TelemetryMessage,
) -> anyhow::Result<()> {
    let bytes = encode_message_now(message, sequence.next())
        .with_context(|| format!("failed to encode {:?}", message.message_type()))?;
    writer
        .write_all(&bytes)
        .await
        .context("write to publisher failed")
}

// ── Tests ─────────────────────────────────────────────────────────────────────
