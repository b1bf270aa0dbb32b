//! Key code translation tables.
//!
//! The canonical representation is USB HID Usage IDs (page 0x07, Keyboard/Keypad).
//! Platform-specific codes are translated to HID at the capture boundary.

pub mod hid;
pub mod linux_evdev;
pub mod windows_vk;

pub use hid::HidKeyCode;

/// Unified entry point for the platform → HID translation directions.
pub struct KeyMapper;

impl KeyMapper {
    /// Translates a Windows Virtual Key code to a [`HidKeyCode`].
    ///
    /// Returns [`HidKeyCode::Unknown`] if no mapping exists for `vk`.
    pub fn windows_vk_to_hid(vk: u8) -> HidKeyCode {
        windows_vk::vk_to_hid(vk)
    }

    /// Translates a Linux evdev `KEY_*` code to a [`HidKeyCode`].
    ///
    /// Returns [`HidKeyCode::Unknown`] if no mapping exists for `code`.
    pub fn linux_evdev_to_hid(code: u16) -> HidKeyCode {
        linux_evdev::evdev_to_hid(code)
    }
}
