//! Viewport and scroll-container annotations computed post-traversal.

use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Rect, Size};

/// Why an element is (or is not) inside its viewport.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityReason {
    FullyVisible,
    PartiallyVisible,
    AboveViewport,
    BelowViewport,
    LeftOfViewport,
    RightOfViewport,
    OutsideWindow,
    ZeroSize,
    NoScrollContainer,
    Unknown,
}

/// Scroll direction in content terms: `Down` means the viewport must move
/// toward content that is currently below it.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollDirection {
    Up,
    Down,
    Left,
    Right,
}

/// How far the element's center must travel to reach the viewport center.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScrollDelta {
    pub direction: ScrollDirection,
    pub estimated_pixels: f64,
}

/// Viewport annotation for one element.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VisibilityInfo {
    pub in_viewport: bool,

    /// Fraction of the element's area inside the viewport, in `[0, 1]`.
    pub percent_visible: f64,

    pub reason: VisibilityReason,

    /// Present exactly when `reason` is not `FullyVisible`/`ZeroSize`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_scroll: Option<ScrollDelta>,
}

impl VisibilityInfo {
    pub fn fully_visible() -> Self {
        Self {
            in_viewport: true,
            percent_visible: 1.0,
            reason: VisibilityReason::FullyVisible,
            requires_scroll: None,
        }
    }

    pub fn zero_size() -> Self {
        Self {
            in_viewport: false,
            percent_visible: 0.0,
            reason: VisibilityReason::ZeroSize,
            requires_scroll: None,
        }
    }
}

/// Nearest scrollable ancestor of an element.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScrollContainerInfo {
    pub role: String,

    /// The container's on-screen frame; this is the element's viewport.
    pub visible_frame: Rect,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_size: Option<Size>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub scroll_position: Option<Point>,

    pub can_scroll_up: bool,
    pub can_scroll_down: bool,
    pub can_scroll_left: bool,
    pub can_scroll_right: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_serializes_snake_case() {
        let json = serde_json::to_string(&VisibilityReason::BelowViewport).unwrap();
        assert_eq!(json, "\"below_viewport\"");
    }

    #[test]
    fn fully_visible_has_no_scroll_delta() {
        let v = VisibilityInfo::fully_visible();
        assert!(v.in_viewport);
        assert!(v.requires_scroll.is_none());
        let json = serde_json::to_value(&v).unwrap();
        assert!(json.get("requires_scroll").is_none());
    }
}
