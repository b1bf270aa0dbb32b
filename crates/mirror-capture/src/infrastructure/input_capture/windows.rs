//! Windows low-level keyboard and mouse hook implementation.
//!
//! This module installs WH_KEYBOARD_LL and WH_MOUSE_LL hooks using the
//! Windows API. Both hooks share a dedicated Win32 message-loop thread.
//! Hook installation happens on that thread and its outcome is reported back
//! to [`WindowsInputCaptureService::start`], so a failed install surfaces as a
//! startup error instead of a silent, event-less capture.
//!
//! Hooks only observe: every event is forwarded to the next hook in the chain.
//!
//! # Safety
//!
//! This module uses `unsafe` code exclusively for Windows API FFI calls.
//! All `unsafe` blocks are annotated with `// SAFETY:` comments.

#![cfg(target_os = "windows")]

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::Mutex;
use std::thread;
use std::time::Instant;

use tracing::{debug, info, warn};
use windows::Win32::Foundation::{LPARAM, LRESULT, WPARAM};
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, DispatchMessageW, GetMessageW, PostThreadMessageW, SetWindowsHookExW,
    UnhookWindowsHookEx, HC_ACTION, HHOOK, KBDLLHOOKSTRUCT, MSG, MSLLHOOKSTRUCT, WH_KEYBOARD_LL,
    WH_MOUSE_LL, WM_KEYDOWN, WM_KEYUP, WM_LBUTTONDOWN, WM_LBUTTONUP, WM_MBUTTONDOWN,
    WM_MBUTTONUP, WM_MOUSEMOVE, WM_MOUSEWHEEL, WM_QUIT, WM_RBUTTONDOWN, WM_RBUTTONUP,
    WM_SYSKEYDOWN, WM_SYSKEYUP, WM_XBUTTONDOWN, WM_XBUTTONUP, XBUTTON1,
};

use mirror_core::keymap::KeyMapper;

use super::{CaptureError, InputSource, MouseButton, RawInputEvent};

/// One wheel notch, in `mouseData` units.
const WHEEL_DELTA: f64 = 120.0;

/// Sender used by hook callbacks.  Hook procedures have no user-data pointer,
/// so the channel has to live in a static.
static EVENT_SENDER: Mutex<Option<Sender<RawInputEvent>>> = Mutex::new(None);

/// Per-VK "currently down" flags, used to drop key auto-repeat.
#[allow(clippy::declare_interior_mutable_const)]
const KEY_UP: AtomicBool = AtomicBool::new(false);
static KEY_DOWN: [AtomicBool; 256] = [KEY_UP; 256];

/// Windows low-level input capture service.
pub struct WindowsInputCaptureService {
    /// Id of the hook message-loop thread; 0 when not running.
    thread_id: AtomicU32,
}

impl WindowsInputCaptureService {
    /// Creates a new (unstarted) service instance.
    pub fn new() -> Self {
        Self {
            thread_id: AtomicU32::new(0),
        }
    }
}

impl Default for WindowsInputCaptureService {
    fn default() -> Self {
        Self::new()
    }
}

impl InputSource for WindowsInputCaptureService {
    fn start(&self) -> Result<mpsc::Receiver<RawInputEvent>, CaptureError> {
        if self.thread_id.load(Ordering::SeqCst) != 0 {
            return Err(CaptureError::AlreadyStarted);
        }

        let (tx, rx) = mpsc::channel::<RawInputEvent>();
        {
            let mut slot = EVENT_SENDER
                .lock()
                .map_err(|_| CaptureError::KeyboardHookInstallFailed("sender lock poisoned".into()))?;
            if slot.is_some() {
                return Err(CaptureError::AlreadyStarted);
            }
            *slot = Some(tx);
        }
        for flag in &KEY_DOWN {
            flag.store(false, Ordering::Relaxed);
        }

        let (ready_tx, ready_rx) = mpsc::channel::<Result<u32, CaptureError>>();
        thread::Builder::new()
            .name("mirror-hook-loop".to_string())
            .spawn(move || run_hook_message_loop(ready_tx))
            .map_err(|e| {
                clear_sender();
                CaptureError::ThreadSpawn(e.to_string())
            })?;

        let ready = ready_rx.recv().unwrap_or_else(|_| {
            Err(CaptureError::KeyboardHookInstallFailed(
                "hook thread exited before reporting".to_string(),
            ))
        });
        match ready {
            Ok(thread_id) => {
                self.thread_id.store(thread_id, Ordering::SeqCst);
                info!("low-level keyboard and mouse hooks installed");
                Ok(rx)
            }
            Err(e) => {
                clear_sender();
                Err(e)
            }
        }
    }

    fn stop(&self) {
        let thread_id = self.thread_id.swap(0, Ordering::SeqCst);
        if thread_id == 0 {
            return;
        }
        // SAFETY: Posting WM_QUIT to a thread id we created; the call only
        // fails if that thread has already exited.
        let posted = unsafe { PostThreadMessageW(thread_id, WM_QUIT, WPARAM(0), LPARAM(0)) };
        if let Err(e) = posted {
            warn!("failed to post WM_QUIT to hook thread: {e}");
        }
        clear_sender();
    }
}

fn clear_sender() {
    if let Ok(mut slot) = EVENT_SENDER.lock() {
        *slot = None;
    }
}

fn send_event(event: RawInputEvent) {
    if let Ok(guard) = EVENT_SENDER.lock() {
        if let Some(sender) = guard.as_ref() {
            // Ignore send errors (receiver dropped during shutdown).
            let _ = sender.send(event);
        }
    }
}

/// Entry point for the dedicated Win32 message loop thread.
fn run_hook_message_loop(ready: Sender<Result<u32, CaptureError>>) {
    // SAFETY: SetWindowsHookExW requires the calling thread to pump messages;
    // both hooks are installed before entering the loop below.
    let kbd_hook: HHOOK = match unsafe {
        SetWindowsHookExW(WH_KEYBOARD_LL, Some(keyboard_hook_proc), None, 0)
    } {
        Ok(hook) => hook,
        Err(e) => {
            let _ = ready.send(Err(CaptureError::KeyboardHookInstallFailed(e.to_string())));
            return;
        }
    };
    let mouse_hook: HHOOK = match unsafe {
        SetWindowsHookExW(WH_MOUSE_LL, Some(mouse_hook_proc), None, 0)
    } {
        Ok(hook) => hook,
        Err(e) => {
            // SAFETY: kbd_hook was installed above on this thread.
            unsafe {
                let _ = UnhookWindowsHookEx(kbd_hook);
            }
            let _ = ready.send(Err(CaptureError::MouseHookInstallFailed(e.to_string())));
            return;
        }
    };

    // SAFETY: GetCurrentThreadId has no preconditions.
    let thread_id = unsafe { GetCurrentThreadId() };
    let _ = ready.send(Ok(thread_id));

    // Win32 message loop – blocks until WM_QUIT is posted
    let mut msg = MSG::default();
    // SAFETY: Standard Win32 GetMessage/DispatchMessage loop pattern.
    unsafe {
        while GetMessageW(&mut msg, None, 0, 0).as_bool() {
            DispatchMessageW(&msg);
        }
        let _ = UnhookWindowsHookEx(kbd_hook);
        let _ = UnhookWindowsHookEx(mouse_hook);
    }
    debug!("hook message loop exited");
}

/// Low-level keyboard hook callback.
///
/// # Safety
///
/// This function is called by Windows from the hook message loop thread.
/// It must return quickly (< ~300ms) to avoid hook removal by the OS.
unsafe extern "system" fn keyboard_hook_proc(
    n_code: i32,
    w_param: WPARAM,
    l_param: LPARAM,
) -> LRESULT {
    if n_code == HC_ACTION as i32 {
        // SAFETY: l_param points to a KBDLLHOOKSTRUCT when n_code == HC_ACTION.
        let kbs = &*(l_param.0 as *const KBDLLHOOKSTRUCT);
        let vk = (kbs.vkCode & 0xFF) as u8;
        let at = Instant::now();

        match w_param.0 as u32 {
            WM_KEYDOWN | WM_SYSKEYDOWN => {
                // swap returns the previous state: true means auto-repeat
                if !KEY_DOWN[vk as usize].swap(true, Ordering::Relaxed) {
                    send_event(RawInputEvent::KeyDown {
                        key: KeyMapper::windows_vk_to_hid(vk),
                        at,
                    });
                }
            }
            WM_KEYUP | WM_SYSKEYUP => {
                KEY_DOWN[vk as usize].store(false, Ordering::Relaxed);
                send_event(RawInputEvent::KeyUp {
                    key: KeyMapper::windows_vk_to_hid(vk),
                    at,
                });
            }
            _ => {}
        }
    }

    // SAFETY: Forward the event to the next hook in the chain.
    CallNextHookEx(None, n_code, w_param, l_param)
}

/// Low-level mouse hook callback.
///
/// # Safety
///
/// Called by Windows from the hook message loop thread; must return quickly.
unsafe extern "system" fn mouse_hook_proc(
    n_code: i32,
    w_param: WPARAM,
    l_param: LPARAM,
) -> LRESULT {
    if n_code == HC_ACTION as i32 {
        // SAFETY: l_param points to a MSLLHOOKSTRUCT when n_code == HC_ACTION.
        let mhs = &*(l_param.0 as *const MSLLHOOKSTRUCT);
        let at = Instant::now();
        let high_word = (mhs.mouseData >> 16) as u16;

        let event = match w_param.0 as u32 {
            WM_MOUSEMOVE => Some(RawInputEvent::MouseMove {
                x: f64::from(mhs.pt.x),
                y: f64::from(mhs.pt.y),
                at,
            }),
            WM_LBUTTONDOWN => Some(button_down(MouseButton::Left, at)),
            WM_LBUTTONUP => Some(button_up(MouseButton::Left, at)),
            WM_RBUTTONDOWN => Some(button_down(MouseButton::Right, at)),
            WM_RBUTTONUP => Some(button_up(MouseButton::Right, at)),
            WM_MBUTTONDOWN => Some(button_down(MouseButton::Middle, at)),
            WM_MBUTTONUP => Some(button_up(MouseButton::Middle, at)),
            WM_XBUTTONDOWN => Some(button_down(x_button(high_word), at)),
            WM_XBUTTONUP => Some(button_up(x_button(high_word), at)),
            WM_MOUSEWHEEL => Some(RawInputEvent::MouseWheel {
                delta: f64::from(high_word as i16) / WHEEL_DELTA,
                at,
            }),
            _ => None,
        };
        if let Some(event) = event {
            send_event(event);
        }
    }

    // SAFETY: Forward to the next hook in the chain.
    CallNextHookEx(None, n_code, w_param, l_param)
}

fn button_down(button: MouseButton, at: Instant) -> RawInputEvent {
    RawInputEvent::MouseButtonDown { button, at }
}

fn button_up(button: MouseButton, at: Instant) -> RawInputEvent {
    RawInputEvent::MouseButtonUp { button, at }
}

fn x_button(high_word: u16) -> MouseButton {
    if high_word == XBUTTON1 {
        MouseButton::X1
    } else {
        MouseButton::X2
    }
}
