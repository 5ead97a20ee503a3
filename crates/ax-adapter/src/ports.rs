//! Port traits consumed by the element engine.
//!
//! The accessibility API is fundamentally an attribute-by-string lookup of
//! dynamically typed values. The port narrows that to a handful of typed
//! reads returning `Option`; no unchecked casts propagate past the adapter.
//! All reads are best-effort except where a `Result` signals a host
//! rejection the caller must see.

use axdriver_core_types::{DriverError, NodeRef, Point, Rect, RunningApp, Size};

/// Well-known attribute names.
pub mod attr {
    pub const ROLE: &str = "AXRole";
    pub const SUBROLE: &str = "AXSubrole";
    pub const TITLE: &str = "AXTitle";
    pub const DESCRIPTION: &str = "AXDescription";
    pub const VALUE: &str = "AXValue";
    pub const POSITION: &str = "AXPosition";
    pub const SIZE: &str = "AXSize";
    pub const IDENTIFIER: &str = "AXIdentifier";
    pub const DOM_IDENTIFIER: &str = "AXDOMIdentifier";
    pub const DOM_CLASS_LIST: &str = "AXDOMClassList";
    pub const CHILDREN: &str = "AXChildren";
    pub const PARENT: &str = "AXParent";
    pub const WINDOWS: &str = "AXWindows";
    pub const FOCUSED: &str = "AXFocused";
    pub const ORIENTATION: &str = "AXOrientation";
}

/// Well-known action names.
pub mod action {
    pub const PRESS: &str = "AXPress";
    pub const SHOW_MENU: &str = "AXShowMenu";
    pub const SCROLL_TO_VISIBLE: &str = "AXScrollToVisible";
}

/// Well-known role strings.
pub mod role {
    pub const APPLICATION: &str = "AXApplication";
    pub const WINDOW: &str = "AXWindow";
    pub const SCROLL_AREA: &str = "AXScrollArea";
    pub const WEB_AREA: &str = "AXWebArea";
    pub const TABLE: &str = "AXTable";
    pub const LIST: &str = "AXList";
    pub const SCROLL_BAR: &str = "AXScrollBar";
}

/// Synchronous view of the host accessibility API.
///
/// Implementations are read-mostly; only `perform_action`, the setters, and
/// the trust prompt mutate anything, and those mutations belong to the host.
pub trait AxPort: Send + Sync {
    /// Whether this process holds the accessibility grant, optionally
    /// prompting the user.
    fn is_trusted(&self, prompt: bool) -> bool;

    fn string_attribute(&self, node: &NodeRef, attribute: &str) -> Option<String>;

    fn string_list_attribute(&self, node: &NodeRef, attribute: &str) -> Option<Vec<String>>;

    fn number_attribute(&self, node: &NodeRef, attribute: &str) -> Option<f64>;

    fn point_attribute(&self, node: &NodeRef, attribute: &str) -> Option<Point>;

    fn size_attribute(&self, node: &NodeRef, attribute: &str) -> Option<Size>;

    /// Ordered children list; empty on read failure.
    fn children(&self, node: &NodeRef) -> Vec<NodeRef>;

    fn parent(&self, node: &NodeRef) -> Option<NodeRef>;

    /// A node-list attribute such as `AXWindows`.
    fn node_list_attribute(&self, node: &NodeRef, attribute: &str) -> Vec<NodeRef>;

    /// Actions the node advertises.
    fn action_names(&self, node: &NodeRef) -> Vec<String>;

    fn perform_action(&self, node: &NodeRef, action: &str) -> Result<(), DriverError>;

    fn set_string_attribute(
        &self,
        node: &NodeRef,
        attribute: &str,
        value: &str,
    ) -> Result<(), DriverError>;

    fn set_focused(&self, node: &NodeRef, focused: bool) -> Result<(), DriverError>;

    /// Application root element for a process id.
    fn application_root(&self, pid: i32) -> Option<NodeRef>;

    /// System-wide hit test at top-left-origin screen coordinates.
    fn element_at(&self, x: f64, y: f64) -> Option<NodeRef>;

    /// The element currently holding keyboard focus, system-wide.
    fn focused_node(&self) -> Option<NodeRef>;

    /// Process id owning a node.
    fn pid_of(&self, node: &NodeRef) -> Option<i32>;
}

/// Synchronous view of the workspace API.
pub trait WorkspacePort: Send + Sync {
    /// All running applications, regardless of activation policy.
    fn running_applications(&self) -> Vec<RunningApp>;

    /// Bring an application to the foreground by process id.
    fn activate(&self, pid: i32) -> Result<(), DriverError>;

    fn frontmost_application(&self) -> Option<RunningApp>;

    /// Bounds of the primary display, when one exists.
    fn primary_display_frame(&self) -> Option<Rect>;
}
