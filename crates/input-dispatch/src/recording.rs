//! Recording dispatcher for tests.

use parking_lot::Mutex;

use axdriver_core_types::{DriverError, Point};

use crate::{validate_keycode, validate_point, InputDispatcher, Modifiers, MouseButton};

/// One recorded event, in dispatch order.
#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    MouseMove { to: Point },
    MouseDown { at: Point, button: MouseButton },
    MouseUp { at: Point, button: MouseButton },
    MouseDrag { to: Point, button: MouseButton },
    Scroll { wheel_y: f64, wheel_x: f64 },
    KeyDown { keycode: u16, modifiers: Modifiers },
    KeyUp { keycode: u16, modifiers: Modifiers },
    KeyUnicode { text: String },
}

/// Dispatcher that records the event stream instead of posting it.
#[derive(Default)]
pub struct RecordingDispatcher {
    events: Mutex<Vec<InputEvent>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<InputEvent> {
        self.events.lock().clone()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }

    pub fn key_events(&self) -> Vec<InputEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| {
                matches!(
                    e,
                    InputEvent::KeyDown { .. }
                        | InputEvent::KeyUp { .. }
                        | InputEvent::KeyUnicode { .. }
                )
            })
            .cloned()
            .collect()
    }

    pub fn scroll_events(&self) -> Vec<(f64, f64)> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                InputEvent::Scroll { wheel_y, wheel_x } => Some((*wheel_y, *wheel_x)),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: InputEvent) -> Result<(), DriverError> {
        self.events.lock().push(event);
        Ok(())
    }
}

impl InputDispatcher for RecordingDispatcher {
    fn mouse_move(&self, to: Point) -> Result<(), DriverError> {
        validate_point(to)?;
        self.push(InputEvent::MouseMove { to })
    }

    fn mouse_down(&self, at: Point, button: MouseButton) -> Result<(), DriverError> {
        validate_point(at)?;
        self.push(InputEvent::MouseDown { at, button })
    }

    fn mouse_up(&self, at: Point, button: MouseButton) -> Result<(), DriverError> {
        validate_point(at)?;
        self.push(InputEvent::MouseUp { at, button })
    }

    fn mouse_drag(&self, to: Point, button: MouseButton) -> Result<(), DriverError> {
        validate_point(to)?;
        self.push(InputEvent::MouseDrag { to, button })
    }

    fn scroll(&self, wheel_y: f64, wheel_x: f64) -> Result<(), DriverError> {
        self.push(InputEvent::Scroll { wheel_y, wheel_x })
    }

    fn key_down(&self, keycode: u16, modifiers: Modifiers) -> Result<(), DriverError> {
        validate_keycode(keycode)?;
        self.push(InputEvent::KeyDown { keycode, modifiers })
    }

    fn key_up(&self, keycode: u16, modifiers: Modifiers) -> Result<(), DriverError> {
        validate_keycode(keycode)?;
        self.push(InputEvent::KeyUp { keycode, modifiers })
    }

    fn key_unicode(&self, text: &str) -> Result<(), DriverError> {
        self.push(InputEvent::KeyUnicode {
            text: text.to_string(),
        })
    }
}
