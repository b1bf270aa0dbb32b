//! Windows Virtual Key (VK) code to USB HID Usage ID translation.
//!
//! The low-level keyboard hook (`WH_KEYBOARD_LL`) reports `vkCode` values from
//! `<winuser.h>`.  Those are translated here, once, at the capture boundary.
//!
//! Reference: https://learn.microsoft.com/windows/win32/inputdev/virtual-key-codes

use super::hid::HidKeyCode;

/// Translates a Windows Virtual Key code to a HID Usage ID.
///
/// Returns [`HidKeyCode::Unknown`] for VK codes without a mapping (mouse button
/// VKs, media keys, IME keys, ...).
pub fn vk_to_hid(vk: u8) -> HidKeyCode {
    VK_TO_HID_TABLE[vk as usize]
}

/// VK → HID table indexed by VK code (0x00–0xFF).
const VK_TO_HID_TABLE: [HidKeyCode; 256] = {
    use HidKeyCode::*;
    let mut t = [Unknown; 256];

    // Letters: VK_A..VK_Z are ASCII 'A'..'Z'
    t[0x41] = KeyA;
    t[0x42] = KeyB;
    t[0x43] = KeyC;
    t[0x44] = KeyD;
    t[0x45] = KeyE;
    t[0x46] = KeyF;
    t[0x47] = KeyG;
    t[0x48] = KeyH;
    t[0x49] = KeyI;
    t[0x4A] = KeyJ;
    t[0x4B] = KeyK;
    t[0x4C] = KeyL;
    t[0x4D] = KeyM;
    t[0x4E] = KeyN;
    t[0x4F] = KeyO;
    t[0x50] = KeyP;
    t[0x51] = KeyQ;
    t[0x52] = KeyR;
    t[0x53] = KeyS;
    t[0x54] = KeyT;
    t[0x55] = KeyU;
    t[0x56] = KeyV;
    t[0x57] = KeyW;
    t[0x58] = KeyX;
    t[0x59] = KeyY;
    t[0x5A] = KeyZ;

    // Digit row: VK_0..VK_9 are ASCII '0'..'9'
    t[0x30] = Digit0;
    t[0x31] = Digit1;
    t[0x32] = Digit2;
    t[0x33] = Digit3;
    t[0x34] = Digit4;
    t[0x35] = Digit5;
    t[0x36] = Digit6;
    t[0x37] = Digit7;
    t[0x38] = Digit8;
    t[0x39] = Digit9;

    t[0x0D] = Enter; // VK_RETURN
    t[0x1B] = Escape; // VK_ESCAPE
    t[0x08] = Backspace; // VK_BACK
    t[0x09] = Tab; // VK_TAB
    t[0x20] = Space; // VK_SPACE
    t[0x14] = CapsLock; // VK_CAPITAL

    t[0xBD] = Minus; // VK_OEM_MINUS
    t[0xBB] = Equal; // VK_OEM_PLUS
    t[0xDB] = BracketLeft; // VK_OEM_4
    t[0xDD] = BracketRight; // VK_OEM_6
    t[0xDC] = Backslash; // VK_OEM_5
    t[0xBA] = Semicolon; // VK_OEM_1
    t[0xDE] = Quote; // VK_OEM_7
    t[0xC0] = Backquote; // VK_OEM_3
    t[0xBC] = Comma; // VK_OEM_COMMA
    t[0xBE] = Period; // VK_OEM_PERIOD
    t[0xBF] = Slash; // VK_OEM_2

    t[0x70] = F1;
    t[0x71] = F2;
    t[0x72] = F3;
    t[0x73] = F4;
    t[0x74] = F5;
    t[0x75] = F6;
    t[0x76] = F7;
    t[0x77] = F8;
    t[0x78] = F9;
    t[0x79] = F10;
    t[0x7A] = F11;
    t[0x7B] = F12;

    t[0x2D] = Insert; // VK_INSERT
    t[0x24] = Home; // VK_HOME
    t[0x21] = PageUp; // VK_PRIOR
    t[0x2E] = Delete; // VK_DELETE
    t[0x23] = End; // VK_END
    t[0x22] = PageDown; // VK_NEXT
    t[0x25] = ArrowLeft;
    t[0x26] = ArrowUp;
    t[0x27] = ArrowRight;
    t[0x28] = ArrowDown;

    // The LL hook reports sided modifier VKs; the generic VK_SHIFT/CONTROL/MENU
    // codes only appear from injected input and are folded onto the left key.
    t[0xA0] = ShiftLeft; // VK_LSHIFT
    t[0xA1] = ShiftRight; // VK_RSHIFT
    t[0xA2] = ControlLeft; // VK_LCONTROL
    t[0xA3] = ControlRight; // VK_RCONTROL
    t[0xA4] = AltLeft; // VK_LMENU
    t[0xA5] = AltRight; // VK_RMENU
    t[0x5B] = MetaLeft; // VK_LWIN
    t[0x5C] = MetaRight; // VK_RWIN
    t[0x10] = ShiftLeft; // VK_SHIFT
    t[0x11] = ControlLeft; // VK_CONTROL
    t[0x12] = AltLeft; // VK_MENU

    t
};
