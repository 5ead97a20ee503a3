//! The element snapshot produced by the tree walker.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::{Point, Rect, Size};
use crate::visibility::{ScrollContainerInfo, VisibilityInfo};

/// Opaque handle to the underlying host UI element.
///
/// The handle is shared with the host: the same logical element may be
/// handed back as distinct wrappers on separate reads, so `identity()` must
/// come from the host's own identity function, never from wrapper pointer
/// equality.
pub trait NodeHandle: fmt::Debug + Send + Sync {
    /// Host-level identity hash, stable across wrapper instances.
    fn identity(&self) -> u64;

    /// Downcast support for adapter backends.
    fn as_any(&self) -> &(dyn Any + Send + Sync);
}

/// Cheaply cloneable reference to a host UI element.
pub type NodeRef = Arc<dyn NodeHandle>;

/// Correlation id for one logical action.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ActionId(pub String);

impl ActionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for ActionId {
    fn default() -> Self {
        Self::new()
    }
}

/// A running application as reported by the workspace API.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunningApp {
    pub pid: i32,
    pub name: String,
    pub bundle_id: Option<String>,
    /// Regular activation policy (shows in the Dock, owns windows).
    pub regular: bool,
    pub frontmost: bool,
    pub hidden: bool,
}

/// One UI element, captured at discovery time.
///
/// Elements live only as long as the query result that holds them and go
/// stale as soon as the underlying UI changes; the action layer re-queries
/// before acting on anything older than a few hundred milliseconds.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Element {
    /// Host handle kept so later actions can operate on the same node.
    #[serde(skip)]
    pub node: Option<NodeRef>,

    /// Owning process id, used for application activation.
    #[serde(skip)]
    pub pid: Option<i32>,

    /// Discovery instant; the action layer re-queries elements older than a
    /// few hundred milliseconds.
    #[serde(skip)]
    pub captured_at: Option<std::time::Instant>,

    pub title: Option<String>,

    #[serde(rename = "accessibility_description")]
    pub description: Option<String>,

    /// Normalized role; never empty.
    pub role: String,

    pub subrole: Option<String>,

    pub value: Option<String>,

    /// Top-left corner in top-left-origin screen coordinates.
    pub position: Point,

    pub size: Size,

    /// Roles from the root down to this node, inclusive.
    pub path: Vec<String>,

    /// 0 = root.
    pub depth: usize,

    /// Accessibility identifier; unique within its window at an instant but
    /// not stable across application states.
    pub identifier: Option<String>,

    /// Index among the parent's ordered children; `None` for hit-test roots.
    pub sibling_index: Option<usize>,

    /// Populated only when the owning process exposes web-view attributes.
    pub dom_identifier: Option<String>,

    pub dom_class_list: Vec<String>,

    /// Role string only; holding the parent element would create a cycle.
    pub parent_role: Option<String>,

    /// Serialized `@…` reference, filled by the search engine.
    #[serde(rename = "ref")]
    pub reference: Option<String>,

    /// Viewport annotation, computed post-traversal.
    pub visibility: Option<VisibilityInfo>,

    pub scroll_container: Option<ScrollContainerInfo>,
}

impl Element {
    /// A bare element with only the required role; everything else defaults.
    pub fn with_role(role: impl Into<String>) -> Self {
        let role = role.into();
        Self {
            node: None,
            pid: None,
            captured_at: None,
            title: None,
            description: None,
            path: vec![role.clone()],
            role,
            subrole: None,
            value: None,
            position: Point::default(),
            size: Size::default(),
            depth: 0,
            identifier: None,
            sibling_index: None,
            dom_identifier: None,
            dom_class_list: Vec::new(),
            parent_role: None,
            reference: None,
            visibility: None,
            scroll_container: None,
        }
    }

    /// Screen-space bounding rectangle.
    pub fn frame(&self) -> Rect {
        Rect::from_origin_size(self.position, self.size)
    }

    pub fn center(&self) -> Point {
        self.frame().center()
    }

    pub fn has_size(&self) -> bool {
        !self.size.is_zero()
    }

    /// Snapshot label: title, else description, else value.
    pub fn label(&self) -> Option<&str> {
        self.title
            .as_deref()
            .or(self.description.as_deref())
            .or(self.value.as_deref())
    }

    /// Short human-readable description for error messages and logs.
    pub fn describe(&self) -> String {
        match self.label() {
            Some(label) => format!("{} \"{}\"", self.role, label),
            None => self.role.clone(),
        }
    }

    /// Host identity of the underlying node, when the handle is present.
    pub fn node_identity(&self) -> Option<u64> {
        self.node.as_ref().map(|n| n.identity())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_falls_back_in_order() {
        let mut e = Element::with_role("AXButton");
        assert_eq!(e.label(), None);
        e.value = Some("3".into());
        assert_eq!(e.label(), Some("3"));
        e.description = Some("counter".into());
        assert_eq!(e.label(), Some("counter"));
        e.title = Some("Count".into());
        assert_eq!(e.label(), Some("Count"));
    }

    #[test]
    fn wire_shape_uses_spec_field_names() {
        let mut e = Element::with_role("AXButton");
        e.description = Some("primary action".into());
        e.reference = Some("@ref:Button-0-Toolbar".into());
        let json = serde_json::to_value(&e).unwrap();
        assert!(json.get("accessibility_description").is_some());
        assert!(json.get("ref").is_some());
        assert!(json.get("node").is_none());
        assert_eq!(json["path"][0], "AXButton");
    }

    #[test]
    fn frame_combines_position_and_size() {
        let mut e = Element::with_role("AXImage");
        e.position = Point::new(10.0, 20.0);
        e.size = Size::new(100.0, 50.0);
        assert_eq!(e.center(), Point::new(60.0, 45.0));
    }
}
