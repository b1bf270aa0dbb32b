//! EventTranslator: turns raw input events into published channel values.
//!
//! This use case is the heart of the capture application.  It receives raw
//! events from the input source, applies them to the [`InputStateStore`]
//! (subject to the [`CaptureModeController`] gate), and forwards every changed
//! value to a [`Publisher`].
//!
//! # Architecture
//!
//! The translator depends only on the `Publisher` trait and on domain types
//! from `mirror_core`.  The concrete TCP publisher is injected per call, so
//! the whole translation pipeline is unit-testable with a recording double.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};

use mirror_core::domain::normalize::elapsed_ms;
use mirror_core::{
    CaptureMode, CaptureModeController, Channel, ChannelMap, ChannelValue, ContinuousSignal,
    DiscreteId, HidKeyCode, IdleDecay, InputSnapshot, InputStateStore, Modifier, ModeTransition,
    ProtocolError, SignalLimits, StateError, TrackedSet,
};

use crate::infrastructure::input_capture::{MouseButton as RawMouseButton, RawInputEvent};

/// Error raised by a publication sink.
///
/// Publish failures are transient from the translator's point of view: the
/// tick loop logs them and carries on with the next event.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("handshake failed: {0}")]
    Handshake(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("connection closed")]
    Closed,
}

/// Error type for the translate-input use case.
#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("publish failed: {0}")]
    Publish(#[from] PublishError),
    #[error(transparent)]
    State(#[from] StateError),
}

impl TranslateError {
    /// The publisher's link is down, as opposed to a failure worth a warning
    /// of its own.
    pub fn is_link_down(&self) -> bool {
        matches!(self, TranslateError::Publish(PublishError::Closed))
    }
}

/// State of a publisher's link after [`Publisher::restore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    /// The link was already up.
    Up,
    /// A new session was just opened.  The remote side holds no values for it
    /// yet.
    Restored,
    /// Still down.  Publishes fail with [`PublishError::Closed`].
    Down,
}

/// Sink for channel values.
///
/// Infrastructure implementations write to the telemetry link; test
/// implementations record calls.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Queues `value` for `channel`.
    async fn publish(&self, channel: &Channel, value: ChannelValue) -> Result<(), PublishError>;

    /// Pushes queued values out to the remote side.
    async fn flush(&self) -> Result<(), PublishError>;

    /// Re-opens a lost link if a retry is due at `now`.
    ///
    /// Sinks that cannot lose their link are always up.
    async fn restore(&self, _now: Instant) -> LinkStatus {
        LinkStatus::Up
    }
}

/// Startup settings for [`EventTranslator`].
#[derive(Debug, Clone)]
pub struct TranslatorSettings {
    pub tracked: TrackedSet,
    /// Pause/resume key.  Never tracked.
    pub toggle_key: HidKeyCode,
    pub limits: SignalLimits,
    pub idle_threshold: Duration,
}

/// Previous pointer sample, for velocity computation.
#[derive(Debug, Clone, Copy)]
struct PointerSample {
    x: f64,
    y: f64,
    at: Instant,
}

/// The translate-input use case.
///
/// Owns the whole mutable input context: store, capture mode, idle decay, and
/// the motion history used to turn positions into velocities.
pub struct EventTranslator {
    store: InputStateStore,
    mode: CaptureModeController,
    decay: IdleDecay,
    channels: ChannelMap,
    limits: SignalLimits,
    toggle_key: HidKeyCode,
    last_pointer: Option<PointerSample>,
    last_scroll: Option<Instant>,
    /// Start of capture or the latest resume.  A first scroll is measured
    /// from here.
    capture_started: Instant,
}

impl EventTranslator {
    /// Creates a translator whose capture window opens at `started_at`.
    pub fn new(settings: TranslatorSettings, started_at: Instant) -> Self {
        Self {
            store: InputStateStore::new(&settings.tracked),
            mode: CaptureModeController::new(),
            decay: IdleDecay::new(settings.idle_threshold),
            channels: ChannelMap::new(&settings.tracked),
            limits: settings.limits,
            toggle_key: settings.toggle_key,
            last_pointer: None,
            last_scroll: None,
            capture_started: started_at,
        }
    }

    /// Fixed channel table, for the publisher's announcement.
    pub fn channels(&self) -> &ChannelMap {
        &self.channels
    }

    pub fn mode(&self) -> CaptureMode {
        self.mode.mode()
    }

    pub fn snapshot(&self) -> InputSnapshot {
        self.store.snapshot()
    }

    /// Publishes the current value of every channel, in channel id order.
    ///
    /// Used after connecting and after every reconnect so the remote table
    /// starts from the current store rather than from whatever an earlier
    /// session left behind.
    ///
    /// # Errors
    ///
    /// Returns the first publish failure; the remaining channels are still
    /// attempted.
    pub async fn publish_all(&self, publisher: &dyn Publisher) -> Result<(), TranslateError> {
        let snapshot = self.store.snapshot();
        let mut values = Vec::with_capacity(self.channels.len());
        for (id, pressed) in snapshot.discrete() {
            if let Some(channel) = self.channels.discrete(*id) {
                values.push((channel, ChannelValue::Boolean(*pressed)));
            }
        }
        for signal in ContinuousSignal::ALL {
            values.push((
                self.channels.continuous(signal),
                ChannelValue::Double(snapshot.continuous(signal)),
            ));
        }
        send_each(publisher, values).await
    }

    /// Handles one raw input event.
    ///
    /// Every value the event changes is published and flushed before this
    /// returns.  Identifiers outside the tracked set are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`TranslateError::Publish`] if the publisher fails.  The store
    /// has already been updated when that happens.
    pub async fn handle_event(
        &mut self,
        event: &RawInputEvent,
        publisher: &dyn Publisher,
    ) -> Result<(), TranslateError> {
        match *event {
            RawInputEvent::KeyDown { key, at } => {
                if key == self.toggle_key {
                    return self.toggle_capture(at, publisher).await;
                }
                self.handle_key(key, true, publisher).await
            }
            RawInputEvent::KeyUp { key, .. } => {
                if key == self.toggle_key {
                    return Ok(());
                }
                self.handle_key(key, false, publisher).await
            }
            RawInputEvent::MouseButtonDown { button, .. } => {
                self.handle_button(button, true, publisher).await
            }
            RawInputEvent::MouseButtonUp { button, .. } => {
                self.handle_button(button, false, publisher).await
            }
            RawInputEvent::MouseMove { x, y, at } => self.handle_pointer(x, y, at, publisher).await,
            RawInputEvent::MouseWheel { delta, at } => {
                self.handle_scroll(delta, at, publisher).await
            }
        }
    }

    /// Zeroes and publishes continuous signals that have gone idle.
    ///
    /// Runs once per tick whether or not any event arrived.
    ///
    /// # Errors
    ///
    /// Returns the first publish failure.
    pub async fn run_idle_decay(
        &mut self,
        now: Instant,
        publisher: &dyn Publisher,
    ) -> Result<(), TranslateError> {
        let zeroed = self.decay.tick(&mut self.store, now);
        if zeroed.is_empty() {
            return Ok(());
        }
        debug!("idle decay zeroed {zeroed:?}");
        let values = zeroed
            .into_iter()
            .map(|signal| (self.channels.continuous(signal), ChannelValue::Double(0.0)))
            .collect();
        send_each(publisher, values).await
    }

    // ── Private event handlers ────────────────────────────────────────────────

    async fn toggle_capture(
        &mut self,
        at: Instant,
        publisher: &dyn Publisher,
    ) -> Result<(), TranslateError> {
        match self.mode.toggle(&mut self.store, at) {
            ModeTransition::Paused => {
                info!("capture paused");
                self.last_pointer = None;
                self.last_scroll = None;
                let values = self
                    .channels
                    .channels()
                    .iter()
                    .map(|channel| (channel, ChannelValue::neutral(channel.kind)))
                    .collect();
                send_each(publisher, values).await
            }
            ModeTransition::Resumed => {
                info!("capture resumed");
                self.capture_started = at;
                Ok(())
            }
        }
    }

    async fn handle_key(
        &mut self,
        key: HidKeyCode,
        pressed: bool,
        publisher: &dyn Publisher,
    ) -> Result<(), TranslateError> {
        let id = match Modifier::from_hid(key) {
            Some(modifier) => DiscreteId::Modifier(modifier),
            None => DiscreteId::Key(key),
        };
        self.handle_discrete(id, pressed, publisher).await
    }

    async fn handle_button(
        &mut self,
        button: RawMouseButton,
        pressed: bool,
        publisher: &dyn Publisher,
    ) -> Result<(), TranslateError> {
        match button.tracked() {
            Some(button) => {
                self.handle_discrete(DiscreteId::Button(button), pressed, publisher)
                    .await
            }
            None => Ok(()),
        }
    }

    async fn handle_discrete(
        &mut self,
        id: DiscreteId,
        pressed: bool,
        publisher: &dyn Publisher,
    ) -> Result<(), TranslateError> {
        if !self.mode.is_enabled() {
            return Ok(());
        }
        let Some(channel) = self.channels.discrete(id) else {
            return Ok(());
        };
        self.store.set_discrete(id, pressed)?;
        debug!("{} = {pressed}", channel.name);
        send(publisher, channel, ChannelValue::Boolean(pressed)).await?;
        Ok(())
    }

    async fn handle_pointer(
        &mut self,
        x: f64,
        y: f64,
        at: Instant,
        publisher: &dyn Publisher,
    ) -> Result<(), TranslateError> {
        if !self.mode.is_enabled() {
            return Ok(());
        }
        // Positions are absolute, so the first move after start or resume has
        // nothing to diff against and only primes the history.
        let Some(previous) = self.last_pointer.replace(PointerSample { x, y, at }) else {
            return Ok(());
        };

        let ms = elapsed_ms(previous.at, at);
        let (Some(vx), Some(vy)) = (
            self.limits.pointer(x - previous.x, ms),
            self.limits.pointer(y - previous.y, ms),
        ) else {
            return Ok(());
        };

        self.store
            .set_continuous(ContinuousSignal::PointerVelocityX, vx, at);
        self.store
            .set_continuous(ContinuousSignal::PointerVelocityY, vy, at);
        let values = vec![
            (
                self.channels.continuous(ContinuousSignal::PointerVelocityX),
                ChannelValue::Double(self.store.continuous(ContinuousSignal::PointerVelocityX)),
            ),
            (
                self.channels.continuous(ContinuousSignal::PointerVelocityY),
                ChannelValue::Double(self.store.continuous(ContinuousSignal::PointerVelocityY)),
            ),
        ];
        send_each(publisher, values).await
    }

    async fn handle_scroll(
        &mut self,
        delta: f64,
        at: Instant,
        publisher: &dyn Publisher,
    ) -> Result<(), TranslateError> {
        if !self.mode.is_enabled() {
            return Ok(());
        }
        let previous = self.last_scroll.replace(at).unwrap_or(self.capture_started);
        let Some(value) = self.limits.scroll(delta, elapsed_ms(previous, at)) else {
            return Ok(());
        };

        self.store
            .set_continuous(ContinuousSignal::ScrollVelocity, value, at);
        let channel = self.channels.continuous(ContinuousSignal::ScrollVelocity);
        let stored = self.store.continuous(ContinuousSignal::ScrollVelocity);
        send(publisher, channel, ChannelValue::Double(stored)).await?;
        Ok(())
    }
}

async fn send(
    publisher: &dyn Publisher,
    channel: &Channel,
    value: ChannelValue,
) -> Result<(), PublishError> {
    publisher.publish(channel, value).await?;
    publisher.flush().await
}

/// Sends every value in order, continuing past failures, and reports the
/// first failure.
async fn send_each(
    publisher: &dyn Publisher,
    values: Vec<(&Channel, ChannelValue)>,
) -> Result<(), TranslateError> {
    let mut first_error = None;
    for (channel, value) in values {
        if let Err(e) = send(publisher, channel, value).await {
            first_error.get_or_insert(e);
        }
    }
    match first_error {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirror_core::MouseButton;
    use std::sync::Mutex;

    // ── Test doubles ──────────────────────────────────────────────────────────

    #[derive(Default)]
    struct RecordingPublisher {
        published: Mutex<Vec<(String, ChannelValue)>>,
        flushes: Mutex<usize>,
        should_fail: bool,
    }

    impl RecordingPublisher {
        fn failing() -> Self {
            Self {
                should_fail: true,
                ..Self::default()
            }
        }

        fn values_for(&self, name: &str) -> Vec<ChannelValue> {
            self.published
                .lock()
                .unwrap()
                .iter()
                .filter(|(n, _)| n == name)
                .map(|(_, v)| *v)
                .collect()
        }

        fn take(&self) -> Vec<(String, ChannelValue)> {
            std::mem::take(&mut *self.published.lock().unwrap())
        }
    }

    #[async_trait]
    impl Publisher for RecordingPublisher {
        async fn publish(
            &self,
            channel: &Channel,
            value: ChannelValue,
        ) -> Result<(), PublishError> {
            if self.should_fail {
                return Err(PublishError::Closed);
            }
            self.published
                .lock()
                .unwrap()
                .push((channel.name.clone(), value));
            Ok(())
        }

        async fn flush(&self) -> Result<(), PublishError> {
            *self.flushes.lock().unwrap() += 1;
            Ok(())
        }
    }

    fn make_translator() -> EventTranslator {
        make_translator_started(Instant::now())
    }

    fn make_translator_started(started_at: Instant) -> EventTranslator {
        let tracked = TrackedSet::new(
            vec![HidKeyCode::KeyQ, HidKeyCode::KeyW],
            Modifier::ALL.to_vec(),
            MouseButton::ALL.to_vec(),
        )
        .unwrap();
        let settings = TranslatorSettings {
            tracked,
            toggle_key: HidKeyCode::KeyP,
            limits: SignalLimits::default(),
            idle_threshold: Duration::from_millis(100),
        };
        EventTranslator::new(settings, started_at)
    }

    fn ms(base: Instant, offset: u64) -> Instant {
        base + Duration::from_millis(offset)
    }

    fn double(value: ChannelValue) -> f64 {
        match value {
            ChannelValue::Double(d) => d,
            ChannelValue::Boolean(b) => panic!("expected double, got {b}"),
        }
    }

    // ── Discrete signals ──────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_key_press_and_release_publish_in_order() {
        // Arrange
        let mut tr = make_translator();
        let publisher = RecordingPublisher::default();
        let at = Instant::now();

        // Act
        tr.handle_event(&RawInputEvent::KeyDown { key: HidKeyCode::KeyQ, at }, &publisher)
            .await
            .unwrap();
        tr.handle_event(&RawInputEvent::KeyUp { key: HidKeyCode::KeyQ, at }, &publisher)
            .await
            .unwrap();

        // Assert
        assert_eq!(
            publisher.values_for("key_q"),
            vec![ChannelValue::Boolean(true), ChannelValue::Boolean(false)]
        );
        assert_eq!(
            tr.snapshot().pressed(DiscreteId::Key(HidKeyCode::KeyQ)),
            Some(false)
        );
        assert_eq!(*publisher.flushes.lock().unwrap(), 2, "one flush per publish");
    }

    #[tokio::test]
    async fn test_untracked_key_is_ignored() {
        let mut tr = make_translator();
        let publisher = RecordingPublisher::default();

        tr.handle_event(
            &RawInputEvent::KeyDown { key: HidKeyCode::KeyZ, at: Instant::now() },
            &publisher,
        )
        .await
        .unwrap();

        assert!(publisher.take().is_empty());
        assert!(tr.snapshot().is_neutral());
    }

    #[tokio::test]
    async fn test_left_and_right_modifiers_share_one_channel() {
        // Arrange
        let mut tr = make_translator();
        let publisher = RecordingPublisher::default();
        let at = Instant::now();

        // Act – last event wins
        tr.handle_event(&RawInputEvent::KeyDown { key: HidKeyCode::ControlLeft, at }, &publisher)
            .await
            .unwrap();
        tr.handle_event(&RawInputEvent::KeyUp { key: HidKeyCode::ControlRight, at }, &publisher)
            .await
            .unwrap();

        // Assert
        assert_eq!(
            publisher.values_for("key_ctrl"),
            vec![ChannelValue::Boolean(true), ChannelValue::Boolean(false)]
        );
    }

    #[tokio::test]
    async fn test_mouse_buttons_publish_and_extra_buttons_are_ignored() {
        let mut tr = make_translator();
        let publisher = RecordingPublisher::default();
        let at = Instant::now();

        tr.handle_event(
            &RawInputEvent::MouseButtonDown { button: RawMouseButton::Right, at },
            &publisher,
        )
        .await
        .unwrap();
        tr.handle_event(
            &RawInputEvent::MouseButtonDown { button: RawMouseButton::X1, at },
            &publisher,
        )
        .await
        .unwrap();

        assert_eq!(
            publisher.take(),
            vec![("btn_mouse_right".to_string(), ChannelValue::Boolean(true))]
        );
    }

    // ── Continuous signals ────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_pointer_velocity_from_two_moves() {
        // Arrange
        let mut tr = make_translator();
        let publisher = RecordingPublisher::default();
        let t0 = Instant::now();

        // Act
        tr.handle_event(&RawInputEvent::MouseMove { x: 100.0, y: 100.0, at: t0 }, &publisher)
            .await
            .unwrap();
        tr.handle_event(
            &RawInputEvent::MouseMove { x: 110.0, y: 100.0, at: ms(t0, 50) },
            &publisher,
        )
        .await
        .unwrap();

        // Assert – 10 px in 50 ms = 200 px/s, over a max of 1000
        let published = publisher.take();
        assert_eq!(published.len(), 2, "first move only primes the history");
        assert_eq!(published[0].0, "mouse_speed_x");
        assert!((double(published[0].1) - 0.2).abs() < 1e-9);
        assert_eq!(published[1], ("mouse_speed_y".to_string(), ChannelValue::Double(0.0)));
    }

    #[tokio::test]
    async fn test_pointer_move_with_zero_elapsed_is_skipped() {
        let mut tr = make_translator();
        let publisher = RecordingPublisher::default();
        let t0 = Instant::now();

        tr.handle_event(&RawInputEvent::MouseMove { x: 0.0, y: 0.0, at: t0 }, &publisher)
            .await
            .unwrap();
        tr.handle_event(&RawInputEvent::MouseMove { x: 50.0, y: 0.0, at: t0 }, &publisher)
            .await
            .unwrap();

        assert!(publisher.take().is_empty());
        assert_eq!(tr.snapshot().continuous(ContinuousSignal::PointerVelocityX), 0.0);
    }

    #[tokio::test]
    async fn test_scroll_velocity_is_clamped() {
        // Arrange
        let t0 = Instant::now();
        let mut tr = make_translator_started(t0);
        let publisher = RecordingPublisher::default();
        tr.handle_event(&RawInputEvent::MouseWheel { delta: 1.0, at: ms(t0, 1000) }, &publisher)
            .await
            .unwrap();
        publisher.take();

        // Act – 2 notches in 20 ms = 100 notches/s, far above the max of 10
        tr.handle_event(&RawInputEvent::MouseWheel { delta: 2.0, at: ms(t0, 1020) }, &publisher)
            .await
            .unwrap();

        // Assert
        assert_eq!(
            publisher.take(),
            vec![("scroll_wheel_speed".to_string(), ChannelValue::Double(1.0))]
        );
    }

    #[tokio::test]
    async fn test_first_scroll_is_measured_from_capture_start() {
        // Arrange
        let t0 = Instant::now();
        let mut tr = make_translator_started(t0);
        let publisher = RecordingPublisher::default();

        // Act – one notch 500 ms after start = 2 notches/s
        tr.handle_event(&RawInputEvent::MouseWheel { delta: 1.0, at: ms(t0, 500) }, &publisher)
            .await
            .unwrap();

        // Assert
        let values = publisher.values_for("scroll_wheel_speed");
        assert_eq!(values.len(), 1);
        assert!((double(values[0]) - 0.2).abs() < 1e-9);
        assert!((tr.snapshot().continuous(ContinuousSignal::ScrollVelocity) - 0.2).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_first_scroll_after_resume_is_measured_from_resume() {
        // Arrange
        let t0 = Instant::now();
        let mut tr = make_translator_started(t0);
        let publisher = RecordingPublisher::default();
        tr.handle_event(&RawInputEvent::MouseWheel { delta: 1.0, at: ms(t0, 100) }, &publisher)
            .await
            .unwrap();
        for offset in [200, 300] {
            tr.handle_event(
                &RawInputEvent::KeyDown { key: HidKeyCode::KeyP, at: ms(t0, offset) },
                &publisher,
            )
            .await
            .unwrap();
        }
        publisher.take();

        // Act – 1 notch 400 ms after resuming = 2.5 notches/s
        tr.handle_event(&RawInputEvent::MouseWheel { delta: -1.0, at: ms(t0, 700) }, &publisher)
            .await
            .unwrap();

        // Assert
        assert_eq!(tr.mode(), CaptureMode::Enabled);
        let values = publisher.values_for("scroll_wheel_speed");
        assert_eq!(values.len(), 1);
        assert!((double(values[0]) + 0.25).abs() < 1e-9);
    }

    // ── Capture mode ──────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_toggle_publishes_neutral_for_every_channel() {
        // Arrange
        let mut tr = make_translator();
        let publisher = RecordingPublisher::default();
        let t0 = Instant::now();
        tr.handle_event(&RawInputEvent::KeyDown { key: HidKeyCode::KeyW, at: t0 }, &publisher)
            .await
            .unwrap();
        tr.handle_event(&RawInputEvent::MouseMove { x: 0.0, y: 0.0, at: t0 }, &publisher)
            .await
            .unwrap();
        tr.handle_event(
            &RawInputEvent::MouseMove { x: 25.0, y: 0.0, at: ms(t0, 50) },
            &publisher,
        )
        .await
        .unwrap();
        publisher.take();

        // Act
        tr.handle_event(
            &RawInputEvent::KeyDown { key: HidKeyCode::KeyP, at: ms(t0, 60) },
            &publisher,
        )
        .await
        .unwrap();

        // Assert
        let published = publisher.take();
        assert_eq!(tr.mode(), CaptureMode::Paused);
        assert_eq!(published.len(), tr.channels().len());
        for (name, value) in &published {
            assert_eq!(*value, ChannelValue::neutral(value.kind()), "{name}");
        }
        assert!(tr.snapshot().is_neutral());
    }

    #[tokio::test]
    async fn test_events_are_ignored_while_paused() {
        // Arrange
        let mut tr = make_translator();
        let publisher = RecordingPublisher::default();
        let t0 = Instant::now();
        tr.handle_event(&RawInputEvent::KeyDown { key: HidKeyCode::KeyP, at: t0 }, &publisher)
            .await
            .unwrap();
        publisher.take();

        // Act – one event of every kind except the toggle
        let events = [
            RawInputEvent::KeyDown { key: HidKeyCode::KeyQ, at: ms(t0, 10) },
            RawInputEvent::KeyUp { key: HidKeyCode::KeyW, at: ms(t0, 20) },
            RawInputEvent::MouseButtonDown { button: RawMouseButton::Left, at: ms(t0, 30) },
            RawInputEvent::MouseButtonUp { button: RawMouseButton::Right, at: ms(t0, 40) },
            RawInputEvent::MouseMove { x: 0.0, y: 0.0, at: ms(t0, 50) },
            RawInputEvent::MouseMove { x: 40.0, y: -40.0, at: ms(t0, 60) },
            RawInputEvent::MouseWheel { delta: 1.0, at: ms(t0, 70) },
            RawInputEvent::MouseWheel { delta: 3.0, at: ms(t0, 80) },
        ];
        for event in &events {
            tr.handle_event(event, &publisher).await.unwrap();
        }

        // Assert
        assert!(publisher.take().is_empty());
        assert_eq!(tr.mode(), CaptureMode::Paused);
        assert!(tr.snapshot().is_neutral());
    }

    #[tokio::test]
    async fn test_resume_restores_nothing_and_first_move_only_primes() {
        // Arrange
        let mut tr = make_translator();
        let publisher = RecordingPublisher::default();
        let t0 = Instant::now();
        tr.handle_event(&RawInputEvent::MouseMove { x: 0.0, y: 0.0, at: t0 }, &publisher)
            .await
            .unwrap();
        tr.handle_event(&RawInputEvent::KeyDown { key: HidKeyCode::KeyP, at: ms(t0, 10) }, &publisher)
            .await
            .unwrap();
        tr.handle_event(&RawInputEvent::KeyUp { key: HidKeyCode::KeyP, at: ms(t0, 20) }, &publisher)
            .await
            .unwrap();
        tr.handle_event(&RawInputEvent::KeyDown { key: HidKeyCode::KeyP, at: ms(t0, 30) }, &publisher)
            .await
            .unwrap();
        publisher.take();

        // Act
        tr.handle_event(
            &RawInputEvent::MouseMove { x: 500.0, y: 0.0, at: ms(t0, 40) },
            &publisher,
        )
        .await
        .unwrap();

        // Assert
        assert_eq!(tr.mode(), CaptureMode::Enabled);
        assert!(publisher.take().is_empty());
        assert!(tr.snapshot().is_neutral());
    }

    #[tokio::test]
    async fn test_toggle_key_release_is_not_published() {
        let mut tr = make_translator();
        let publisher = RecordingPublisher::default();

        tr.handle_event(
            &RawInputEvent::KeyUp { key: HidKeyCode::KeyP, at: Instant::now() },
            &publisher,
        )
        .await
        .unwrap();

        assert!(publisher.take().is_empty());
        assert_eq!(tr.mode(), CaptureMode::Enabled);
    }

    // ── Idle decay ────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_idle_decay_publishes_zero_once() {
        // Arrange
        let mut tr = make_translator();
        let publisher = RecordingPublisher::default();
        let t0 = Instant::now();
        tr.handle_event(&RawInputEvent::MouseMove { x: 0.0, y: 0.0, at: t0 }, &publisher)
            .await
            .unwrap();
        tr.handle_event(
            &RawInputEvent::MouseMove { x: 10.0, y: 0.0, at: ms(t0, 50) },
            &publisher,
        )
        .await
        .unwrap();
        publisher.take();

        // Act
        tr.run_idle_decay(ms(t0, 100), &publisher).await.unwrap();
        let before_threshold = publisher.take();
        tr.run_idle_decay(ms(t0, 200), &publisher).await.unwrap();
        let decayed = publisher.take();
        tr.run_idle_decay(ms(t0, 300), &publisher).await.unwrap();
        let again = publisher.take();

        // Assert
        assert!(before_threshold.is_empty());
        assert_eq!(
            decayed,
            vec![("mouse_speed_x".to_string(), ChannelValue::Double(0.0))]
        );
        assert!(again.is_empty());
    }

    // ── Failures ──────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_publish_failure_is_reported_after_state_update() {
        let mut tr = make_translator();
        let publisher = RecordingPublisher::failing();

        let result = tr
            .handle_event(
                &RawInputEvent::KeyDown { key: HidKeyCode::KeyQ, at: Instant::now() },
                &publisher,
            )
            .await;

        assert!(matches!(result, Err(TranslateError::Publish(PublishError::Closed))));
        assert_eq!(
            tr.snapshot().pressed(DiscreteId::Key(HidKeyCode::KeyQ)),
            Some(true)
        );
    }

    #[tokio::test]
    async fn test_pause_still_resets_when_publishing_fails() {
        let mut tr = make_translator();
        let ok = RecordingPublisher::default();
        let failing = RecordingPublisher::failing();
        let at = Instant::now();
        tr.handle_event(&RawInputEvent::KeyDown { key: HidKeyCode::KeyW, at }, &ok)
            .await
            .unwrap();

        let result = tr
            .handle_event(&RawInputEvent::KeyDown { key: HidKeyCode::KeyP, at }, &failing)
            .await;

        assert!(result.is_err());
        assert_eq!(tr.mode(), CaptureMode::Paused);
        assert!(tr.snapshot().is_neutral());
    }

    #[tokio::test]
    async fn test_publish_all_sends_every_channel_in_id_order() {
        let tr = make_translator();
        let publisher = RecordingPublisher::default();

        tr.publish_all(&publisher).await.unwrap();

        let names: Vec<String> = publisher.take().into_iter().map(|(n, _)| n).collect();
        let expected: Vec<String> = tr.channels().channels().iter().map(|c| c.name.clone()).collect();
        assert_eq!(names, expected);
    }
}
