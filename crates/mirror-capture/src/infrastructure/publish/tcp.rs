//! TCP publisher: writes channel updates to a table server.
//!
//! # Session
//!
//! 1. `Hello` → `HelloAck`.  A rejection, an unexpected reply, or no reply
//!    within the connect timeout fails [`TcpPublisher::connect`].
//! 2. One `Announce` per channel, in channel id order.
//! 3. One `Update` per [`Publisher::publish`]; frames sit in a `BufWriter`
//!    until [`Publisher::flush`].
//! 4. `Disconnect` on [`TcpPublisher::close`].
//!
//! After the handshake a background task keeps reading the socket so that an
//! `Error` from the server is logged and a closed connection is noticed
//! before the next write.
//!
//! # Reconnecting
//!
//! A lost session is not fatal.  Publishes fail fast with
//! [`PublishError::Closed`] while [`Publisher::restore`] re-runs steps 1 and 2,
//! at most once per backoff delay.  The delay starts at
//! [`DEFAULT_RECONNECT_INITIAL`] and doubles per failed attempt up to
//! [`DEFAULT_RECONNECT_MAX`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

use mirror_core::protocol::{
    encode_message_now, AnnounceMessage, DisconnectReason, HelloMessage, SequenceCounter,
    UpdateMessage, PROTOCOL_VERSION,
};
use mirror_core::{decode_message, Channel, ChannelMap, ChannelValue, ProtocolError, TelemetryMessage};

use crate::application::translate_input::{LinkStatus, PublishError, Publisher};

/// First delay between reconnect attempts.
pub const DEFAULT_RECONNECT_INITIAL: Duration = Duration::from_millis(250);

/// Longest delay between reconnect attempts.
pub const DEFAULT_RECONNECT_MAX: Duration = Duration::from_secs(5);

/// Who this publisher is and which table it writes.
#[derive(Debug, Clone)]
pub struct PublisherIdentity {
    pub client_name: String,
    pub table: String,
}

/// One handshaken connection.
struct Session {
    writer: BufWriter<OwnedWriteHalf>,
    sequence: SequenceCounter,
    /// Set by the reader task when the server goes away.
    lost: Arc<AtomicBool>,
    reader: JoinHandle<()>,
}

impl Session {
    fn is_alive(&self) -> bool {
        !self.lost.load(Ordering::SeqCst)
    }

    async fn write(&mut self, msg: &TelemetryMessage) -> Result<(), PublishError> {
        write_frame(&mut self.writer, &self.sequence, msg).await
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

/// Current session, if any, and when the next reconnect may be tried.
struct Link {
    session: Option<Session>,
    next_attempt: Instant,
    delay: Duration,
}

impl Link {
    /// Session that is still usable, dropping one the server has closed.
    fn live(&mut self) -> Option<&mut Session> {
        if self.session.as_ref().is_some_and(|s| !s.is_alive()) {
            self.session = None;
        }
        self.session.as_mut()
    }
}

/// [`Publisher`] over TCP that re-opens its session when the server goes
/// away.
pub struct TcpPublisher {
    addr: String,
    identity: PublisherIdentity,
    announces: Vec<AnnounceMessage>,
    connect_timeout: Duration,
    reconnect_initial: Duration,
    reconnect_max: Duration,
    link: Mutex<Link>,
    /// Set by [`TcpPublisher::close`]; no reconnects after that.
    closed: AtomicBool,
    server_name: String,
}

impl TcpPublisher {
    /// Connects to `addr`, performs the handshake, and announces `channels`.
    ///
    /// # Errors
    ///
    /// - [`PublishError::Timeout`] if connecting or the handshake takes longer
    ///   than `connect_timeout`.
    /// - [`PublishError::Handshake`] if the server rejects the session.
    /// - [`PublishError::Io`] / [`PublishError::Protocol`] for socket or
    ///   framing failures.
    pub async fn connect(
        addr: &str,
        identity: &PublisherIdentity,
        channels: &ChannelMap,
        connect_timeout: Duration,
    ) -> Result<Self, PublishError> {
        let announces: Vec<AnnounceMessage> = channels
            .channels()
            .iter()
            .map(|channel| AnnounceMessage {
                channel_id: channel.id,
                kind: channel.kind,
                name: channel.name.clone(),
            })
            .collect();
        let (session, server_name) =
            open_session(addr, identity, &announces, connect_timeout).await?;
        info!(
            "connected to table server {server_name:?} at {addr}; announced {} channels",
            announces.len()
        );

        Ok(Self {
            addr: addr.to_string(),
            identity: identity.clone(),
            announces,
            connect_timeout,
            reconnect_initial: DEFAULT_RECONNECT_INITIAL,
            reconnect_max: DEFAULT_RECONNECT_MAX,
            link: Mutex::new(Link {
                session: Some(session),
                next_attempt: Instant::now(),
                delay: DEFAULT_RECONNECT_INITIAL,
            }),
            closed: AtomicBool::new(false),
            server_name,
        })
    }

    /// Overrides the reconnect delays.
    pub fn with_reconnect_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.reconnect_initial = initial;
        self.reconnect_max = max.max(initial);
        self.link.get_mut().delay = initial;
        self
    }

    /// Name the server reported in its first `HelloAck`.
    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    /// Sends `Disconnect` and shuts the socket down.  The publisher stays
    /// closed afterwards.
    ///
    /// # Errors
    ///
    /// Returns the write error, if any.  The background reader is stopped
    /// either way.
    pub async fn close(&self) -> Result<(), PublishError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let Some(mut session) = self.link.lock().await.session.take() else {
            return Ok(());
        };
        session.reader.abort();
        if !session.is_alive() {
            return Ok(());
        }
        let bye = TelemetryMessage::Disconnect {
            reason: DisconnectReason::UserInitiated,
        };
        session.write(&bye).await?;
        session.writer.flush().await?;
        session.writer.shutdown().await?;
        Ok(())
    }
}

/// Marks `session` lost when a write fails, so the next restore replaces it.
fn mark_failed<T>(session: &Session, result: Result<T, PublishError>) -> Result<T, PublishError> {
    if let Err(e) = &result {
        if session.lost.swap(true, Ordering::SeqCst) {
            debug!("write to lost table session failed: {e}");
        } else {
            warn!("write to table server failed: {e}; will reconnect");
        }
    }
    result
}

#[async_trait]
impl Publisher for TcpPublisher {
    async fn publish(&self, channel: &Channel, value: ChannelValue) -> Result<(), PublishError> {
        let update = TelemetryMessage::Update(UpdateMessage {
            channel_id: channel.id,
            value,
        });
        let mut link = self.link.lock().await;
        let session = link.live().ok_or(PublishError::Closed)?;
        let result = session.write(&update).await;
        mark_failed(session, result)
    }

    async fn flush(&self) -> Result<(), PublishError> {
        let mut link = self.link.lock().await;
        let session = link.live().ok_or(PublishError::Closed)?;
        let result = session.writer.flush().await.map_err(PublishError::from);
        mark_failed(session, result)
    }

    async fn restore(&self, now: Instant) -> LinkStatus {
        if self.closed.load(Ordering::SeqCst) {
            return LinkStatus::Down;
        }
        let mut link = self.link.lock().await;
        if link.live().is_some() {
            return LinkStatus::Up;
        }
        if now < link.next_attempt {
            return LinkStatus::Down;
        }
        match open_session(&self.addr, &self.identity, &self.announces, self.connect_timeout).await
        {
            Ok((session, server_name)) => {
                info!("reconnected to table server {server_name:?} at {}", self.addr);
                link.session = Some(session);
                link.delay = self.reconnect_initial;
                LinkStatus::Restored
            }
            Err(e) => {
                warn!(
                    "reconnect to table server at {} failed: {e}; retrying in {:?}",
                    self.addr, link.delay
                );
                link.next_attempt = now + link.delay;
                link.delay = (link.delay * 2).min(self.reconnect_max);
                LinkStatus::Down
            }
        }
    }
}

/// Connects, handshakes, and announces every channel.  Returns the session
/// and the server's name.
async fn open_session(
    addr: &str,
    identity: &PublisherIdentity,
    announces: &[AnnounceMessage],
    connect_timeout: Duration,
) -> Result<(Session, String), PublishError> {
    let stream = timeout(connect_timeout, TcpStream::connect(addr))
        .await
        .map_err(|_| PublishError::Timeout(connect_timeout))??;
    stream.set_nodelay(true)?;
    let (mut read_half, write_half) = stream.into_split();
    let mut writer = BufWriter::new(write_half);
    let sequence = SequenceCounter::new();

    let hello = TelemetryMessage::Hello(HelloMessage {
        client_id: Uuid::new_v4(),
        protocol_version: PROTOCOL_VERSION,
        client_name: identity.client_name.clone(),
        table: identity.table.clone(),
    });
    write_frame(&mut writer, &sequence, &hello).await?;
    writer.flush().await?;

    let mut recv_buf = Vec::with_capacity(4096);
    let reply = timeout(connect_timeout, read_message(&mut read_half, &mut recv_buf))
        .await
        .map_err(|_| PublishError::Timeout(connect_timeout))??;
    let server_name = match reply {
        TelemetryMessage::HelloAck(ack) if ack.accepted => ack.server_name,
        TelemetryMessage::HelloAck(ack) => {
            return Err(PublishError::Handshake(format!(
                "server rejected session: {:?}",
                ack.reject_reason
            )))
        }
        TelemetryMessage::Error(e) => return Err(PublishError::Handshake(e.description)),
        other => {
            return Err(PublishError::Handshake(format!(
                "expected HelloAck, got {:?}",
                other.message_type()
            )))
        }
    };

    for announce in announces {
        write_frame(&mut writer, &sequence, &TelemetryMessage::Announce(announce.clone())).await?;
    }
    writer.flush().await?;

    let lost = Arc::new(AtomicBool::new(false));
    let reader = tokio::spawn(watch_server(read_half, recv_buf, Arc::clone(&lost)));
    Ok((
        Session {
            writer,
            sequence,
            lost,
            reader,
        },
        server_name,
    ))
}

async fn write_frame(
    writer: &mut BufWriter<OwnedWriteHalf>,
    sequence: &SequenceCounter,
    msg: &TelemetryMessage,
) -> Result<(), PublishError> {
    let bytes = encode_message_now(msg, sequence.next())?;
    writer.write_all(&bytes).await?;
    Ok(())
}

/// Reads until one complete message is buffered, then decodes it.
///
/// Bytes beyond that message stay in `recv_buf`.
async fn read_message(
    read_half: &mut OwnedReadHalf,
    recv_buf: &mut Vec<u8>,
) -> Result<TelemetryMessage, PublishError> {
    let mut read_tmp = [0u8; 1024];
    loop {
        match decode_message(recv_buf) {
            Ok((msg, consumed)) => {
                recv_buf.drain(..consumed);
                return Ok(msg);
            }
            Err(ProtocolError::InsufficientData { .. }) => {}
            Err(e) => return Err(e.into()),
        }
        let n = read_half.read(&mut read_tmp).await?;
        if n == 0 {
            return Err(PublishError::Closed);
        }
        recv_buf.extend_from_slice(&read_tmp[..n]);
    }
}

/// Logs what the server sends after the handshake and flags the session as
/// lost when the server goes away.
async fn watch_server(mut read_half: OwnedReadHalf, mut recv_buf: Vec<u8>, lost: Arc<AtomicBool>) {
    loop {
        match read_message(&mut read_half, &mut recv_buf).await {
            Ok(TelemetryMessage::Error(e)) => {
                warn!("table server reported {:?}: {}", e.error_code, e.description);
            }
            Ok(TelemetryMessage::Disconnect { reason }) => {
                warn!("table server disconnected: {reason:?}");
                break;
            }
            Ok(other) => debug!("ignoring {:?} from table server", other.message_type()),
            Err(PublishError::Closed) => {
                warn!("table server closed the connection");
                break;
            }
            Err(e) => {
                warn!("reading from table server failed: {e}");
                break;
            }
        }
    }
    lost.store(true, Ordering::SeqCst);
}
