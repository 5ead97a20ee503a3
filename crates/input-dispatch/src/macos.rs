//! CGEvent backend posting at the HID tap.
//!
//! Events posted here carry the HID-system source state, so receiving
//! applications observe them as trusted hardware input. Mouse moves also
//! warp the display cursor; posting the event alone moves only the logical
//! pointer.

use core_graphics::display::CGDisplay;
use core_graphics::event::{
    CGEvent, CGEventFlags, CGEventTapLocation, CGEventType, CGMouseButton, ScrollEventUnit,
};
use core_graphics::event_source::{CGEventSource, CGEventSourceStateID};
use core_graphics::geometry::CGPoint;
use foreign_types::ForeignType;
use tracing::trace;

use axdriver_core_types::{DriverError, Point};

use crate::{validate_keycode, validate_point, InputDispatcher, Modifiers, MouseButton};

#[link(name = "CoreGraphics", kind = "framework")]
extern "C" {
    fn CGEventSetTimestamp(event: core_graphics::sys::CGEventRef, timestamp: u64);
}

/// Host uptime in nanoseconds, from the mach timebase.
///
/// The multiplication runs in 128 bits: `mach_absolute_time * numer`
/// overflows u64 after a few weeks of uptime on timebases where
/// `numer > 1`.
fn uptime_nanos() -> u64 {
    let mut timebase = libc::mach_timebase_info { numer: 0, denom: 0 };
    unsafe { libc::mach_timebase_info(&mut timebase) };
    let ticks = unsafe { libc::mach_absolute_time() } as u128;
    let nanos = ticks * timebase.numer as u128 / timebase.denom.max(1) as u128;
    nanos as u64
}

/// Dispatcher posting real CGEvents at the HID tap.
#[derive(Default)]
pub struct TrustedDispatcher;

impl TrustedDispatcher {
    pub fn new() -> Self {
        Self
    }

    fn source(&self) -> Result<CGEventSource, DriverError> {
        CGEventSource::new(CGEventSourceStateID::HIDSystemState)
            .map_err(|_| DriverError::EventCreationFailed)
    }

    fn post(&self, event: CGEvent) {
        unsafe { CGEventSetTimestamp(event.as_ptr(), uptime_nanos()) };
        event.post(CGEventTapLocation::HID);
    }

    fn mouse_event(
        &self,
        event_type: CGEventType,
        at: Point,
        button: CGMouseButton,
    ) -> Result<(), DriverError> {
        validate_point(at)?;
        let source = self.source()?;
        let event = CGEvent::new_mouse_event(
            source,
            event_type,
            CGPoint::new(at.x, at.y),
            button,
        )
        .map_err(|_| DriverError::EventCreationFailed)?;
        self.post(event);
        Ok(())
    }
}

fn cg_button(button: MouseButton) -> CGMouseButton {
    match button {
        MouseButton::Left => CGMouseButton::Left,
        MouseButton::Right => CGMouseButton::Right,
        MouseButton::Middle => CGMouseButton::Center,
    }
}

fn down_type(button: MouseButton) -> CGEventType {
    match button {
        MouseButton::Left => CGEventType::LeftMouseDown,
        MouseButton::Right => CGEventType::RightMouseDown,
        MouseButton::Middle => CGEventType::OtherMouseDown,
    }
}

fn up_type(button: MouseButton) -> CGEventType {
    match button {
        MouseButton::Left => CGEventType::LeftMouseUp,
        MouseButton::Right => CGEventType::RightMouseUp,
        MouseButton::Middle => CGEventType::OtherMouseUp,
    }
}

fn drag_type(button: MouseButton) -> CGEventType {
    match button {
        MouseButton::Left => CGEventType::LeftMouseDragged,
        MouseButton::Right => CGEventType::RightMouseDragged,
        MouseButton::Middle => CGEventType::OtherMouseDragged,
    }
}

impl InputDispatcher for TrustedDispatcher {
    fn mouse_move(&self, to: Point) -> Result<(), DriverError> {
        self.mouse_event(CGEventType::MouseMoved, to, CGMouseButton::Left)?;
        // Posting alone moves the logical pointer; the warp moves the
        // visible cursor.
        CGDisplay::warp_mouse_cursor_position(CGPoint::new(to.x, to.y))
            .map_err(|_| DriverError::EventCreationFailed)?;
        Ok(())
    }

    fn mouse_down(&self, at: Point, button: MouseButton) -> Result<(), DriverError> {
        trace!(x = at.x, y = at.y, ?button, "mouse down");
        self.mouse_event(down_type(button), at, cg_button(button))
    }

    fn mouse_up(&self, at: Point, button: MouseButton) -> Result<(), DriverError> {
        self.mouse_event(up_type(button), at, cg_button(button))
    }

    fn mouse_drag(&self, to: Point, button: MouseButton) -> Result<(), DriverError> {
        self.mouse_event(drag_type(button), to, cg_button(button))
    }

    fn scroll(&self, wheel_y: f64, wheel_x: f64) -> Result<(), DriverError> {
        let source = self.source()?;
        let event = CGEvent::new_scroll_event(
            source,
            ScrollEventUnit::PIXEL,
            2,
            wheel_y.round() as i32,
            wheel_x.round() as i32,
            0,
        )
        .map_err(|_| DriverError::EventCreationFailed)?;
        self.post(event);
        Ok(())
    }

    fn key_down(&self, keycode: u16, modifiers: Modifiers) -> Result<(), DriverError> {
        validate_keycode(keycode)?;
        let source = self.source()?;
        let event = CGEvent::new_keyboard_event(source, keycode, true)
            .map_err(|_| DriverError::EventCreationFailed)?;
        if !modifiers.is_empty() {
            event.set_flags(CGEventFlags::from_bits_truncate(modifiers.bits()));
        }
        self.post(event);
        Ok(())
    }

    fn key_up(&self, keycode: u16, modifiers: Modifiers) -> Result<(), DriverError> {
        validate_keycode(keycode)?;
        let source = self.source()?;
        let event = CGEvent::new_keyboard_event(source, keycode, false)
            .map_err(|_| DriverError::EventCreationFailed)?;
        if !modifiers.is_empty() {
            event.set_flags(CGEventFlags::from_bits_truncate(modifiers.bits()));
        }
        self.post(event);
        Ok(())
    }

    fn key_unicode(&self, text: &str) -> Result<(), DriverError> {
        let source = self.source()?;
        for keydown in [true, false] {
            let event = CGEvent::new_keyboard_event(source.clone(), 0, keydown)
                .map_err(|_| DriverError::EventCreationFailed)?;
            event.set_string(text);
            self.post(event);
        }
        Ok(())
    }
}
