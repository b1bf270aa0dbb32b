//! Linux evdev key code to USB HID Usage ID translation.
//!
//! Linux reports keyboard keys as `EV_KEY` events whose code is one of the
//! `KEY_*` constants in `<linux/input-event-codes.h>`.  The codes are stable
//! kernel ABI, so the table is written against the raw numbers rather than any
//! binding crate's constant names.
//!
//! Mouse buttons (`BTN_LEFT` = 0x110 and up) share the `EV_KEY` event type but
//! are not keyboard keys; see [`evdev_button`].

use super::hid::HidKeyCode;

/// `BTN_LEFT` from `<linux/input-event-codes.h>`.
pub const BTN_LEFT: u16 = 0x110;
/// `BTN_RIGHT`.
pub const BTN_RIGHT: u16 = 0x111;
/// `BTN_MIDDLE`.
pub const BTN_MIDDLE: u16 = 0x112;
/// `BTN_SIDE`.
pub const BTN_SIDE: u16 = 0x113;
/// `BTN_EXTRA`.
pub const BTN_EXTRA: u16 = 0x114;

/// Physical mouse buttons as reported by evdev.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvdevButton {
    Left,
    Right,
    Middle,
    Side,
    Extra,
}

/// Classifies an `EV_KEY` code as a mouse button, if it is one.
pub fn evdev_button(code: u16) -> Option<EvdevButton> {
    match code {
        BTN_LEFT => Some(EvdevButton::Left),
        BTN_RIGHT => Some(EvdevButton::Right),
        BTN_MIDDLE => Some(EvdevButton::Middle),
        BTN_SIDE => Some(EvdevButton::Side),
        BTN_EXTRA => Some(EvdevButton::Extra),
        _ => None,
    }
}

/// Translates an evdev `KEY_*` code to a HID Usage ID.
///
/// Returns [`HidKeyCode::Unknown`] for codes without a mapping, including all
/// `BTN_*` codes.
pub fn evdev_to_hid(code: u16) -> HidKeyCode {
    use HidKeyCode::*;
    match code {
        1 => Escape,
        2 => Digit1,
        3 => Digit2,
        4 => Digit3,
        5 => Digit4,
        6 => Digit5,
        7 => Digit6,
        8 => Digit7,
        9 => Digit8,
        10 => Digit9,
        11 => Digit0,
        12 => Minus,
        13 => Equal,
        14 => Backspace,
        15 => Tab,
        16 => KeyQ,
        17 => KeyW,
        18 => KeyE,
        19 => KeyR,
        20 => KeyT,
        21 => KeyY,
        22 => KeyU,
        23 => KeyI,
        24 => KeyO,
        25 => KeyP,
        26 => BracketLeft,
        27 => BracketRight,
        28 => Enter,
        29 => ControlLeft,
        30 => KeyA,
        31 => KeyS,
        32 => KeyD,
        33 => KeyF,
        34 => KeyG,
        35 => KeyH,
        36 => KeyJ,
        37 => KeyK,
        38 => KeyL,
        39 => Semicolon,
        40 => Quote,
        41 => Backquote,
        42 => ShiftLeft,
        43 => Backslash,
        44 => KeyZ,
        45 => KeyX,
        46 => KeyC,
        47 => KeyV,
        48 => KeyB,
        49 => KeyN,
        50 => KeyM,
        51 => Comma,
        52 => Period,
        53 => Slash,
        54 => ShiftRight,
        56 => AltLeft,
        57 => Space,
        58 => CapsLock,
        59 => F1,
        60 => F2,
        61 => F3,
        62 => F4,
        63 => F5,
        64 => F6,
        65 => F7,
        66 => F8,
        67 => F9,
        68 => F10,
        87 => F11,
        88 => F12,
        97 => ControlRight,
        100 => AltRight,
        102 => Home,
        103 => ArrowUp,
        104 => PageUp,
        105 => ArrowLeft,
        106 => ArrowRight,
        107 => End,
        108 => ArrowDown,
        109 => PageDown,
        110 => Insert,
        111 => Delete,
        125 => MetaLeft,
        126 => MetaRight,
        _ => Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qwerty_top_row_maps_in_order() {
        let expected = [
            HidKeyCode::KeyQ,
            HidKeyCode::KeyW,
            HidKeyCode::KeyE,
            HidKeyCode::KeyR,
            HidKeyCode::KeyT,
        ];
        for (offset, hid) in expected.iter().enumerate() {
            assert_eq!(evdev_to_hid(16 + offset as u16), *hid);
        }
    }

    #[test]
    fn test_digit_row_maps_one_through_zero() {
        assert_eq!(evdev_to_hid(2), HidKeyCode::Digit1);
        assert_eq!(evdev_to_hid(10), HidKeyCode::Digit9);
        assert_eq!(evdev_to_hid(11), HidKeyCode::Digit0);
    }

    #[test]
    fn test_modifiers_map_to_sided_hid_codes() {
        assert_eq!(evdev_to_hid(29), HidKeyCode::ControlLeft);
        assert_eq!(evdev_to_hid(97), HidKeyCode::ControlRight);
        assert_eq!(evdev_to_hid(42), HidKeyCode::ShiftLeft);
        assert_eq!(evdev_to_hid(100), HidKeyCode::AltRight);
    }

    #[test]
    fn test_button_codes_are_not_keys() {
        assert_eq!(evdev_to_hid(BTN_LEFT), HidKeyCode::Unknown);
        assert_eq!(evdev_button(BTN_LEFT), Some(EvdevButton::Left));
        assert_eq!(evdev_button(BTN_MIDDLE), Some(EvdevButton::Middle));
        assert_eq!(evdev_button(16), None);
    }
}
