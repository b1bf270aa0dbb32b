//! Mock input source for unit testing.
//!
//! Allows tests to inject synthetic [`RawInputEvent`]s without requiring
//! OS hooks or device access.

use std::sync::{
    mpsc::{self, Sender},
    Arc, Mutex,
};

use super::{CaptureError, InputSource, RawInputEvent};

/// A mock implementation of [`InputSource`] that allows tests to inject events.
///
/// Cloning shares the underlying channel, so a test can keep one handle for
/// injection while the other is boxed into the application.
#[derive(Clone, Default)]
pub struct MockInputSource {
    sender: Arc<Mutex<Option<Sender<RawInputEvent>>>>,
    start_error: Arc<Mutex<Option<CaptureError>>>,
}

impl MockInputSource {
    /// Creates a new mock input source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `start()` fail with `error`.
    pub fn fail_start_with(&self, error: CaptureError) {
        *self.start_error.lock().expect("lock poisoned") = Some(error);
    }

    /// Injects a synthetic event, as if captured from hardware.
    ///
    /// Panics if `start()` has not been called or if `stop()` has been called.
    pub fn inject_event(&self, event: RawInputEvent) {
        let guard = self.sender.lock().expect("lock poisoned");
        match guard.as_ref() {
            Some(sender) => sender
                .send(event)
                .expect("receiver has been dropped; call start() first"),
            None => panic!("MockInputSource::inject_event called before start()"),
        }
    }

    /// Returns `true` between `start()` and `stop()`.
    pub fn is_running(&self) -> bool {
        self.sender.lock().expect("lock poisoned").is_some()
    }
}

impl InputSource for MockInputSource {
    fn start(&self) -> Result<mpsc::Receiver<RawInputEvent>, CaptureError> {
        if let Some(error) = self.start_error.lock().expect("lock poisoned").take() {
            return Err(error);
        }
        let (tx, rx) = mpsc::channel();
        *self.sender.lock().expect("lock poisoned") = Some(tx);
        Ok(rx)
    }

    fn stop(&self) {
        // Drop the sender to close the channel
        *self.sender.lock().expect("lock poisoned") = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::input_capture::MouseButton;
    use mirror_core::HidKeyCode;
    use std::time::Instant;

    #[test]
    fn test_mock_input_source_starts_and_receives_events() {
        // Arrange
        let source = MockInputSource::new();
        let rx = source.start().expect("start should succeed");
        let at = Instant::now();

        // Act
        source.inject_event(RawInputEvent::KeyDown {
            key: HidKeyCode::KeyQ,
            at,
        });

        // Assert
        let event = rx.recv().expect("should receive event");
        assert_eq!(
            event,
            RawInputEvent::KeyDown {
                key: HidKeyCode::KeyQ,
                at
            }
        );
    }

    #[test]
    fn test_mock_input_source_stop_closes_channel() {
        // Arrange
        let source = MockInputSource::new();
        let rx = source.start().expect("start should succeed");

        // Act
        source.stop();

        // Assert – channel should be disconnected
        assert!(rx.recv().is_err(), "channel should be closed after stop()");
        assert!(!source.is_running());
    }

    #[test]
    fn test_mock_input_source_preserves_event_order() {
        // Arrange
        let source = MockInputSource::new();
        let rx = source.start().expect("start should succeed");
        let at = Instant::now();

        // Act
        source.inject_event(RawInputEvent::MouseMove { x: 100.0, y: 200.0, at });
        source.inject_event(RawInputEvent::MouseButtonDown {
            button: MouseButton::Left,
            at,
        });
        source.inject_event(RawInputEvent::MouseWheel { delta: 1.0, at });

        // Assert
        let received: Vec<RawInputEvent> = rx.try_iter().collect();
        assert!(matches!(received[0], RawInputEvent::MouseMove { .. }));
        assert!(matches!(
            received[1],
            RawInputEvent::MouseButtonDown { button: MouseButton::Left, .. }
        ));
        assert!(matches!(received[2], RawInputEvent::MouseWheel { .. }));
    }

    #[test]
    fn test_mock_input_source_can_fail_start() {
        let source = MockInputSource::new();
        source.fail_start_with(CaptureError::NoDevices);

        assert!(matches!(source.start(), Err(CaptureError::NoDevices)));
        assert!(source.start().is_ok(), "failure is one-shot");
    }
}
