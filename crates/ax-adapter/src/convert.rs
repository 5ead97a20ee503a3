//! Coordinate conversion between the engine's top-left origin and
//! collaborators that use bottom-left-origin geometry.

use axdriver_core_types::{Point, Rect};

/// Flip a top-left-origin point to bottom-left origin using the primary
/// display frame. Returns the input unchanged when no display is available.
pub fn to_bottom_left(point: Point, primary_display: Option<Rect>) -> Point {
    match primary_display {
        Some(display) => Point::new(point.x, display.height - point.y),
        None => point,
    }
}

/// Inverse of [`to_bottom_left`]; the flip is an involution.
pub fn to_top_left(point: Point, primary_display: Option<Rect>) -> Point {
    to_bottom_left(point, primary_display)
}
