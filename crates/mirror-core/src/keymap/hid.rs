//! USB HID Usage IDs (page 0x07, Keyboard/Keypad page).
//!
//! This is the canonical, platform-neutral key representation inside
//! Input-Mirror.  Platform-specific codes (Windows VK codes, Linux evdev key
//! codes) are translated to HID at the capture boundary, so everything past the
//! input source only ever sees a [`HidKeyCode`].
//!
//! Reference: USB HID Usage Tables 1.3, Section 10 (Keyboard/Keypad page 0x07).
//!
//! # What is a HID Usage ID? (for beginners)
//!
//! The **USB Human Interface Device (HID)** standard assigns a number to every
//! physical key position.  For example `KeyA` is 0x04 and `Enter` is 0x28.
//! Because the numbers describe positions rather than characters, they are the
//! same on every operating system, which is exactly what a cross-platform
//! capture tool needs.
//!
//! # Key names
//!
//! Configuration files and channel names refer to keys by a short lowercase
//! name (`"q"`, `"1"`, `"space"`, `"page_up"`).  [`HidKeyCode::name`] and
//! [`HidKeyCode::from_name`] convert between the two.  Modifier keys have no
//! key name: they are tracked through the ctrl/alt/shift modifier set instead.

use serde::{Deserialize, Serialize};

/// USB HID Usage ID for keyboard keys (page 0x07).
///
/// Only the keys a capture source can meaningfully report are listed.
/// [`HidKeyCode::Unknown`] stands in for every other key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum HidKeyCode {
    // Letters (HID 0x04–0x1D)
    KeyA = 0x04,
    KeyB = 0x05,
    KeyC = 0x06,
    KeyD = 0x07,
    KeyE = 0x08,
    KeyF = 0x09,
    KeyG = 0x0A,
    KeyH = 0x0B,
    KeyI = 0x0C,
    KeyJ = 0x0D,
    KeyK = 0x0E,
    KeyL = 0x0F,
    KeyM = 0x10,
    KeyN = 0x11,
    KeyO = 0x12,
    KeyP = 0x13,
    KeyQ = 0x14,
    KeyR = 0x15,
    KeyS = 0x16,
    KeyT = 0x17,
    KeyU = 0x18,
    KeyV = 0x19,
    KeyW = 0x1A,
    KeyX = 0x1B,
    KeyY = 0x1C,
    KeyZ = 0x1D,

    // Digits (HID 0x1E–0x27)
    Digit1 = 0x1E,
    Digit2 = 0x1F,
    Digit3 = 0x20,
    Digit4 = 0x21,
    Digit5 = 0x22,
    Digit6 = 0x23,
    Digit7 = 0x24,
    Digit8 = 0x25,
    Digit9 = 0x26,
    Digit0 = 0x27,

    // Control and punctuation keys (HID 0x28–0x39)
    Enter = 0x28,
    Escape = 0x29,
    Backspace = 0x2A,
    Tab = 0x2B,
    Space = 0x2C,
    Minus = 0x2D,
    Equal = 0x2E,
    BracketLeft = 0x2F,
    BracketRight = 0x30,
    Backslash = 0x31,
    Semicolon = 0x33,
    Quote = 0x34,
    Backquote = 0x35,
    Comma = 0x36,
    Period = 0x37,
    Slash = 0x38,
    CapsLock = 0x39,

    // Function keys (HID 0x3A–0x45)
    F1 = 0x3A,
    F2 = 0x3B,
    F3 = 0x3C,
    F4 = 0x3D,
    F5 = 0x3E,
    F6 = 0x3F,
    F7 = 0x40,
    F8 = 0x41,
    F9 = 0x42,
    F10 = 0x43,
    F11 = 0x44,
    F12 = 0x45,

    // Navigation cluster (HID 0x49–0x52)
    Insert = 0x49,
    Home = 0x4A,
    PageUp = 0x4B,
    Delete = 0x4C,
    End = 0x4D,
    PageDown = 0x4E,
    ArrowRight = 0x4F,
    ArrowLeft = 0x50,
    ArrowDown = 0x51,
    ArrowUp = 0x52,

    // Modifiers (HID 0xE0–0xE7)
    ControlLeft = 0xE0,
    ShiftLeft = 0xE1,
    AltLeft = 0xE2,
    MetaLeft = 0xE3,
    ControlRight = 0xE4,
    ShiftRight = 0xE5,
    AltRight = 0xE6,
    MetaRight = 0xE7,

    /// Any key without a mapping.
    Unknown = 0x0000,
}

/// Key name table used for configuration and channel naming.
///
/// Order matches the enum declaration; modifiers and `Unknown` are absent.
const KEY_NAMES: &[(HidKeyCode, &str)] = &[
    (HidKeyCode::KeyA, "a"),
    (HidKeyCode::KeyB, "b"),
    (HidKeyCode::KeyC, "c"),
    (HidKeyCode::KeyD, "d"),
    (HidKeyCode::KeyE, "e"),
    (HidKeyCode::KeyF, "f"),
    (HidKeyCode::KeyG, "g"),
    (HidKeyCode::KeyH, "h"),
    (HidKeyCode::KeyI, "i"),
    (HidKeyCode::KeyJ, "j"),
    (HidKeyCode::KeyK, "k"),
    (HidKeyCode::KeyL, "l"),
    (HidKeyCode::KeyM, "m"),
    (HidKeyCode::KeyN, "n"),
    (HidKeyCode::KeyO, "o"),
    (HidKeyCode::KeyP, "p"),
    (HidKeyCode::KeyQ, "q"),
    (HidKeyCode::KeyR, "r"),
    (HidKeyCode::KeyS, "s"),
    (HidKeyCode::KeyT, "t"),
    (HidKeyCode::KeyU, "u"),
    (HidKeyCode::KeyV, "v"),
    (HidKeyCode::KeyW, "w"),
    (HidKeyCode::KeyX, "x"),
    (HidKeyCode::KeyY, "y"),
    (HidKeyCode::KeyZ, "z"),
    (HidKeyCode::Digit1, "1"),
    (HidKeyCode::Digit2, "2"),
    (HidKeyCode::Digit3, "3"),
    (HidKeyCode::Digit4, "4"),
    (HidKeyCode::Digit5, "5"),
    (HidKeyCode::Digit6, "6"),
    (HidKeyCode::Digit7, "7"),
    (HidKeyCode::Digit8, "8"),
    (HidKeyCode::Digit9, "9"),
    (HidKeyCode::Digit0, "0"),
    (HidKeyCode::Enter, "enter"),
    (HidKeyCode::Escape, "escape"),
    (HidKeyCode::Backspace, "backspace"),
    (HidKeyCode::Tab, "tab"),
    (HidKeyCode::Space, "space"),
    (HidKeyCode::Minus, "minus"),
    (HidKeyCode::Equal, "equal"),
    (HidKeyCode::BracketLeft, "bracket_left"),
    (HidKeyCode::BracketRight, "bracket_right"),
    (HidKeyCode::Backslash, "backslash"),
    (HidKeyCode::Semicolon, "semicolon"),
    (HidKeyCode::Quote, "quote"),
    (HidKeyCode::Backquote, "backquote"),
    (HidKeyCode::Comma, "comma"),
    (HidKeyCode::Period, "period"),
    (HidKeyCode::Slash, "slash"),
    (HidKeyCode::CapsLock, "caps_lock"),
    (HidKeyCode::F1, "f1"),
    (HidKeyCode::F2, "f2"),
    (HidKeyCode::F3, "f3"),
    (HidKeyCode::F4, "f4"),
    (HidKeyCode::F5, "f5"),
    (HidKeyCode::F6, "f6"),
    (HidKeyCode::F7, "f7"),
    (HidKeyCode::F8, "f8"),
    (HidKeyCode::F9, "f9"),
    (HidKeyCode::F10, "f10"),
    (HidKeyCode::F11, "f11"),
    (HidKeyCode::F12, "f12"),
    (HidKeyCode::Insert, "insert"),
    (HidKeyCode::Home, "home"),
    (HidKeyCode::PageUp, "page_up"),
    (HidKeyCode::Delete, "delete"),
    (HidKeyCode::End, "end"),
    (HidKeyCode::PageDown, "page_down"),
    (HidKeyCode::ArrowRight, "right"),
    (HidKeyCode::ArrowLeft, "left"),
    (HidKeyCode::ArrowDown, "down"),
    (HidKeyCode::ArrowUp, "up"),
];

impl HidKeyCode {
    /// Returns the configuration/channel name of this key.
    ///
    /// Returns `None` for modifiers and [`HidKeyCode::Unknown`].
    pub fn name(self) -> Option<&'static str> {
        KEY_NAMES
            .iter()
            .find(|(code, _)| *code == self)
            .map(|(_, name)| *name)
    }

    /// Looks up a key by its configuration name.
    ///
    /// Matching is case-insensitive and ignores surrounding whitespace, so the
    /// uppercase key string `"QWERT"` used by older configs splits cleanly into
    /// single-letter names.
    pub fn from_name(name: &str) -> Option<HidKeyCode> {
        let wanted = name.trim().to_ascii_lowercase();
        KEY_NAMES
            .iter()
            .find(|(_, n)| *n == wanted)
            .map(|(code, _)| *code)
    }

    /// Returns `true` for the eight modifier keys (HID 0xE0–0xE7).
    pub fn is_modifier(self) -> bool {
        (self as u16) >= 0xE0 && (self as u16) <= 0xE7
    }
}
