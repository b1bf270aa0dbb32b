//! Linux evdev input source.
//!
//! Reads input events directly from `/dev/input/event*`, which works under
//! X11, Wayland, and on a bare console.  Every device that reports keyboard
//! keys, mouse buttons, or relative motion gets its own blocking reader
//! thread.
//!
//! Mice report relative motion (`REL_X`/`REL_Y`), but the translator expects
//! absolute positions.  Motion from all devices is accumulated into one
//! shared virtual pointer position, emitted once per `SYN_REPORT`.
//!
//! ## Permissions
//!
//! The process must run as a user in the `input` group (or as root).  When no
//! device can be opened, [`EvdevInputSource::start`] fails with
//! [`CaptureError::NoDevices`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Instant;

use evdev::{Device, Key, RelativeAxisType};
use tracing::{debug, info, warn};

use mirror_core::keymap::linux_evdev::{evdev_button, EvdevButton};
use mirror_core::keymap::KeyMapper;
use mirror_core::HidKeyCode;

use super::{CaptureError, InputSource, MouseButton, RawInputEvent};

const EV_SYN: u16 = 0x00;
const EV_KEY: u16 = 0x01;
const EV_REL: u16 = 0x02;

const REL_X: u16 = 0x00;
const REL_Y: u16 = 0x01;
const REL_WHEEL: u16 = 0x08;

const KEY_RELEASE: i32 = 0;
const KEY_PRESS: i32 = 1;

/// Accumulated pointer position shared by all device readers.
type VirtualPointer = Arc<Mutex<(f64, f64)>>;

/// evdev-backed [`InputSource`].
///
/// Reader threads block in the kernel until the next event arrives, so after
/// [`stop`](InputSource::stop) each one exits on its device's next event.
#[derive(Default)]
pub struct EvdevInputSource {
    running: Arc<AtomicBool>,
}

impl EvdevInputSource {
    pub fn new() -> Self {
        Self::default()
    }
}

fn is_capture_device(device: &Device) -> bool {
    let has_keys = device
        .supported_keys()
        .is_some_and(|keys| keys.contains(Key::KEY_A) || keys.contains(Key::BTN_LEFT));
    let has_motion = device
        .supported_relative_axes()
        .is_some_and(|axes| axes.contains(RelativeAxisType::REL_X));
    has_keys || has_motion
}

impl InputSource for EvdevInputSource {
    fn start(&self) -> Result<mpsc::Receiver<RawInputEvent>, CaptureError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(CaptureError::AlreadyStarted);
        }

        let devices: Vec<_> = evdev::enumerate()
            .filter(|(_, device)| is_capture_device(device))
            .collect();
        if devices.is_empty() {
            self.running.store(false, Ordering::SeqCst);
            return Err(CaptureError::NoDevices);
        }

        let (tx, rx) = mpsc::channel();
        let pointer: VirtualPointer = Arc::new(Mutex::new((0.0, 0.0)));
        for (index, (path, device)) in devices.into_iter().enumerate() {
            let name = device.name().unwrap_or("unnamed").to_string();
            info!("capturing from {} ({name})", path.display());

            let tx = tx.clone();
            let running = Arc::clone(&self.running);
            let decoder = EvdevDecoder::new(Arc::clone(&pointer));
            thread::Builder::new()
                .name(format!("mirror-evdev-{index}"))
                .spawn(move || read_device(device, decoder, tx, running))
                .map_err(|e| {
                    self.running.store(false, Ordering::SeqCst);
                    CaptureError::ThreadSpawn(e.to_string())
                })?;
        }
        Ok(rx)
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

fn read_device(
    mut device: Device,
    mut decoder: EvdevDecoder,
    tx: Sender<RawInputEvent>,
    running: Arc<AtomicBool>,
) {
    while running.load(Ordering::SeqCst) {
        let events = match device.fetch_events() {
            Ok(events) => events,
            Err(e) => {
                warn!("evdev read failed, dropping device: {e}");
                return;
            }
        };
        for event in events {
            let at = Instant::now();
            if let Some(raw) = decoder.feed(event.event_type().0, event.code(), event.value(), at) {
                if tx.send(raw).is_err() {
                    debug!("event receiver dropped; evdev reader exiting");
                    return;
                }
            }
        }
    }
}

/// Turns raw `(type, code, value)` triples into [`RawInputEvent`]s.
pub(crate) struct EvdevDecoder {
    pointer: VirtualPointer,
    pending_dx: i32,
    pending_dy: i32,
}

impl EvdevDecoder {
    pub(crate) fn new(pointer: VirtualPointer) -> Self {
        Self {
            pointer,
            pending_dx: 0,
            pending_dy: 0,
        }
    }

    pub(crate) fn feed(&mut self, ty: u16, code: u16, value: i32, at: Instant) -> Option<RawInputEvent> {
        match ty {
            EV_KEY => self.key(code, value, at),
            EV_REL => match code {
                REL_X => {
                    self.pending_dx += value;
                    None
                }
                REL_Y => {
                    self.pending_dy += value;
                    None
                }
                REL_WHEEL => Some(RawInputEvent::MouseWheel {
                    delta: f64::from(value),
                    at,
                }),
                _ => None,
            },
            EV_SYN => self.flush_motion(at),
            _ => None,
        }
    }

    fn key(&self, code: u16, value: i32, at: Instant) -> Option<RawInputEvent> {
        // value 2 is auto-repeat
        let pressed = match value {
            KEY_PRESS => true,
            KEY_RELEASE => false,
            _ => return None,
        };
        if let Some(button) = evdev_button(code) {
            let button = match button {
                EvdevButton::Left => MouseButton::Left,
                EvdevButton::Right => MouseButton::Right,
                EvdevButton::Middle => MouseButton::Middle,
                EvdevButton::Side => MouseButton::X1,
                EvdevButton::Extra => MouseButton::X2,
            };
            return Some(if pressed {
                RawInputEvent::MouseButtonDown { button, at }
            } else {
                RawInputEvent::MouseButtonUp { button, at }
            });
        }
        let key = KeyMapper::linux_evdev_to_hid(code);
        if key == HidKeyCode::Unknown {
            return None;
        }
        Some(if pressed {
            RawInputEvent::KeyDown { key, at }
        } else {
            RawInputEvent::KeyUp { key, at }
        })
    }

    fn flush_motion(&mut self, at: Instant) -> Option<RawInputEvent> {
        if self.pending_dx == 0 && self.pending_dy == 0 {
            return None;
        }
        let (dx, dy) = (self.pending_dx, self.pending_dy);
        self.pending_dx = 0;
        self.pending_dy = 0;

        let mut pos = self.pointer.lock().ok()?;
        pos.0 += f64::from(dx);
        pos.1 += f64::from(dy);
        Some(RawInputEvent::MouseMove {
            x: pos.0,
            y: pos.1,
            at,
        })
    }
}
