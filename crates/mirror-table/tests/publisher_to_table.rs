//! End-to-end tests: the capture-side `TcpPublisher` talking to a live table
//! server on a loopback port.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use mirror_capture::application::tick::run_tick;
use mirror_capture::application::translate_input::{EventTranslator, PublishError};
use mirror_capture::infrastructure::input_capture::RawInputEvent;
use mirror_capture::infrastructure::publish::{PublisherIdentity, TcpPublisher};
use mirror_capture::infrastructure::status::NoStatus;
use mirror_capture::infrastructure::storage::config::AppConfig;
use mirror_core::{ChannelValue, HidKeyCode};
use mirror_table::application::TableChange;
use mirror_table::domain::TableServerConfig;
use mirror_table::infrastructure::{bind, serve};

struct Server {
    addr: SocketAddr,
    changes: mpsc::Receiver<TableChange>,
    running: Arc<AtomicBool>,
}

impl Drop for Server {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
    }
}

async fn start_server(config: TableServerConfig) -> Server {
    start_server_on("127.0.0.1:0".parse().unwrap(), config).await.0
}

/// Serves on `addr`; the handle resolves once the listener is closed.
async fn start_server_on(
    addr: SocketAddr,
    config: TableServerConfig,
) -> (Server, JoinHandle<anyhow::Result<()>>) {
    let listener = bind(addr).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::channel(256);
    let running = Arc::new(AtomicBool::new(true));
    let handle = tokio::spawn(serve(listener, config, tx, Arc::clone(&running)));
    let server = Server {
        addr,
        changes: rx,
        running,
    };
    (server, handle)
}

fn identity(table: &str) -> PublisherIdentity {
    PublisherIdentity {
        client_name: "KeyboardMouseClient".to_string(),
        table: table.to_string(),
    }
}

fn translator() -> EventTranslator {
    EventTranslator::new(
        AppConfig::default().translator_settings().unwrap(),
        Instant::now(),
    )
}

async fn next_change(server: &mut Server) -> TableChange {
    timeout(Duration::from_secs(2), server.changes.recv())
        .await
        .expect("no change within 2 s")
        .expect("change channel closed")
}

#[tokio::test]
async fn test_initial_state_then_key_press_reach_the_table() {
    // Arrange
    let mut server = start_server(TableServerConfig::default()).await;
    let mut translator = translator();
    let publisher = TcpPublisher::connect(
        &server.addr.to_string(),
        &identity("KeyboardMouseEvents"),
        translator.channels(),
        Duration::from_secs(2),
    )
    .await
    .unwrap();

    // Act
    translator.publish_all(&publisher).await.unwrap();
    let mut initial = Vec::new();
    for _ in 0..translator.channels().len() {
        initial.push(next_change(&mut server).await);
    }
    translator
        .handle_event(
            &RawInputEvent::KeyDown {
                key: HidKeyCode::KeyQ,
                at: Instant::now(),
            },
            &publisher,
        )
        .await
        .unwrap();
    let pressed = next_change(&mut server).await;

    // Assert
    assert_eq!(publisher.server_name(), "mirror-table");
    assert!(initial.iter().all(|c| c.previous.is_none()));
    assert_eq!(initial[0].channel, "key_q");
    assert_eq!(initial.last().unwrap().channel, "scroll_wheel_speed");
    assert_eq!(pressed.channel, "key_q");
    assert_eq!(pressed.value, ChannelValue::Boolean(true));
    assert_eq!(pressed.previous, Some(ChannelValue::Boolean(false)));
    assert_eq!(pressed.table, "KeyboardMouseEvents");

    publisher.close().await.unwrap();
}

#[tokio::test]
async fn test_restricted_server_rejects_other_tables() {
    let server = start_server(TableServerConfig {
        only_table: Some("KeyboardMouseEvents".to_string()),
        ..TableServerConfig::default()
    })
    .await;
    let translator = translator();

    let result = TcpPublisher::connect(
        &server.addr.to_string(),
        &identity("SomethingElse"),
        translator.channels(),
        Duration::from_secs(2),
    )
    .await;

    assert!(matches!(result, Err(PublishError::Handshake(_))));
}

#[tokio::test]
async fn test_two_publishers_get_separate_tables() {
    // Arrange
    let mut server = start_server(TableServerConfig::default()).await;
    let mut first = translator();
    let mut second = translator();
    let a = TcpPublisher::connect(
        &server.addr.to_string(),
        &identity("A"),
        first.channels(),
        Duration::from_secs(2),
    )
    .await
    .unwrap();
    let b = TcpPublisher::connect(
        &server.addr.to_string(),
        &identity("B"),
        second.channels(),
        Duration::from_secs(2),
    )
    .await
    .unwrap();

    // Act: the same key pressed on both
    let press = RawInputEvent::KeyDown {
        key: HidKeyCode::KeyW,
        at: Instant::now(),
    };
    first.handle_event(&press, &a).await.unwrap();
    second.handle_event(&press, &b).await.unwrap();
    let mut tables = vec![
        next_change(&mut server).await,
        next_change(&mut server).await,
    ];
    tables.sort_by(|x, y| x.table.cmp(&y.table));

    // Assert: each session reports a fresh change with no shared history
    assert_eq!(tables[0].table, "A");
    assert_eq!(tables[1].table, "B");
    assert!(tables.iter().all(|c| c.channel == "key_w" && c.previous.is_none()));
    assert_ne!(tables[0].session, tables[1].session);

    a.close().await.unwrap();
    b.close().await.unwrap();
}

#[tokio::test]
async fn test_publisher_resyncs_a_restarted_server() {
    // Arrange: initial state reaches the first server
    let (mut first, first_task) = start_server_on(
        "127.0.0.1:0".parse().unwrap(),
        TableServerConfig::default(),
    )
    .await;
    let addr = first.addr;
    let mut translator = translator();
    let publisher = TcpPublisher::connect(
        &addr.to_string(),
        &identity("KeyboardMouseEvents"),
        translator.channels(),
        Duration::from_secs(2),
    )
    .await
    .unwrap()
    .with_reconnect_backoff(Duration::from_millis(20), Duration::from_millis(100));
    translator.publish_all(&publisher).await.unwrap();
    for _ in 0..translator.channels().len() {
        next_change(&mut first).await;
    }

    // Act: stop the server, press Q while it is gone, then start it again
    first.running.store(false, Ordering::Relaxed);
    first_task.await.unwrap().unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    let (events_tx, events) = std::sync::mpsc::channel();
    events_tx
        .send(RawInputEvent::KeyDown {
            key: HidKeyCode::KeyQ,
            at: Instant::now(),
        })
        .unwrap();
    let down = run_tick(&mut translator, &events, &publisher, &mut NoStatus, Instant::now()).await;

    let (mut second, _second_task) = start_server_on(addr, TableServerConfig::default()).await;
    let mut restored = false;
    for _ in 0..50 {
        let report =
            run_tick(&mut translator, &events, &publisher, &mut NoStatus, Instant::now()).await;
        if report.restored {
            restored = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let mut resync = Vec::new();
    for _ in 0..translator.channels().len() {
        resync.push(next_change(&mut second).await);
    }

    // Assert
    assert!(!down.restored);
    assert_eq!(down.failures, 1, "the key press could not be sent");
    assert!(restored, "publisher never reconnected");
    let key_q = resync.iter().find(|c| c.channel == "key_q").unwrap();
    assert_eq!(key_q.value, ChannelValue::Boolean(true));
    assert_eq!(key_q.previous, None);
    assert!(resync.iter().all(|c| c.table == "KeyboardMouseEvents"));

    publisher.close().await.unwrap();
}
