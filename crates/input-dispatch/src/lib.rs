//! Input-event dispatch at the host's trusted tap.
//!
//! [`InputDispatcher`] is the whole surface the rest of the engine sees:
//! synchronous, small, and swappable. The macOS backend posts CGEvents at
//! the HID tap; [`RecordingDispatcher`] captures the stream for tests.

pub mod keymap;
pub mod recording;

#[cfg(target_os = "macos")]
pub mod macos;

use bitflags::bitflags;

use axdriver_core_types::{DriverError, Point};

pub use keymap::{keycode, lookup_key, KeyStroke};
pub use recording::{InputEvent, RecordingDispatcher};

#[cfg(target_os = "macos")]
pub use macos::TrustedDispatcher;

/// Mouse button selection.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl Default for MouseButton {
    fn default() -> Self {
        MouseButton::Left
    }
}

bitflags! {
    /// Keyboard modifier flags, bit-compatible with the host event flags.
    pub struct Modifiers: u64 {
        const SHIFT = 1 << 17;
        const CONTROL = 1 << 18;
        const OPTION = 1 << 19;
        const COMMAND = 1 << 20;
    }
}

impl Default for Modifiers {
    fn default() -> Self {
        Modifiers::empty()
    }
}

/// Synchronous dispatcher over the host's trusted input-event API.
///
/// Implementations post one event per call, stamped with host uptime, in
/// program order. Creation failure surfaces [`DriverError::EventCreationFailed`];
/// there is no retry at this layer.
pub trait InputDispatcher: Send + Sync {
    /// Move the visible cursor (display-level warp, not just the logical
    /// pointer).
    fn mouse_move(&self, to: Point) -> Result<(), DriverError>;

    fn mouse_down(&self, at: Point, button: MouseButton) -> Result<(), DriverError>;

    fn mouse_up(&self, at: Point, button: MouseButton) -> Result<(), DriverError>;

    /// Drag event toward `to` with `button` held.
    fn mouse_drag(&self, to: Point, button: MouseButton) -> Result<(), DriverError>;

    /// Pixel-unit scroll at the current pointer position. Positive `wheel_y`
    /// moves content down ("natural scrolling" wheel convention).
    fn scroll(&self, wheel_y: f64, wheel_x: f64) -> Result<(), DriverError>;

    fn key_down(&self, keycode: u16, modifiers: Modifiers) -> Result<(), DriverError>;

    fn key_up(&self, keycode: u16, modifiers: Modifiers) -> Result<(), DriverError>;

    /// Down/up pair carrying a Unicode string payload instead of a virtual
    /// keycode, for characters outside the key map.
    fn key_unicode(&self, text: &str) -> Result<(), DriverError>;
}

/// Reject coordinates the host cannot represent.
pub fn validate_point(p: Point) -> Result<(), DriverError> {
    if p.x.is_finite() && p.y.is_finite() {
        Ok(())
    } else {
        Err(DriverError::InvalidCoordinates { x: p.x, y: p.y })
    }
}

/// Virtual keycodes are 7-bit on the host.
pub fn validate_keycode(keycode: u16) -> Result<(), DriverError> {
    if keycode < 128 {
        Ok(())
    } else {
        Err(DriverError::InvalidKeyCode(keycode))
    }
}
