//! In-memory accessibility tree implementing the adapter ports.
//!
//! Tests build a forest of fake nodes, then drive the real walker, query
//! engine, viewport analyzer, and action layer against it. The fake mirrors
//! host behavior where the engine depends on it: ordered children, identity
//! hashes stable across separate handle reads, hit testing, a working
//! `AXScrollToVisible`, and silent value-set rejection for stubborn fields.

use std::any::Any;
use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::RwLock;

use axdriver_core_types::{DriverError, NodeHandle, NodeRef, Point, Rect, RunningApp, Size};

use crate::ports::{action, attr, role, AxPort, WorkspacePort};

const SCROLLABLE_ROLES: [&str; 4] = [
    role::SCROLL_AREA,
    role::WEB_AREA,
    role::TABLE,
    role::LIST,
];

/// Dynamically typed attribute storage, like the host's CFTypeRef values.
#[derive(Clone, Debug)]
pub enum AttrValue {
    Str(String),
    List(Vec<String>),
    Num(f64),
    Point(Point),
    Size(Size),
    Bool(bool),
}

#[derive(Clone, Debug, Default)]
struct NodeData {
    parent: Option<usize>,
    children: Vec<usize>,
    attrs: HashMap<String, AttrValue>,
    actions: Vec<String>,
    pid: i32,
    removed: bool,
}

#[derive(Default)]
struct TreeState {
    nodes: Vec<NodeData>,
    trusted: bool,
    apps: Vec<RunningApp>,
    app_roots: HashMap<i32, usize>,
    focused: Option<usize>,
    display: Option<Rect>,
    performed: Vec<(usize, String)>,
    value_sets: Vec<(usize, String, String)>,
    rejected_value_sets: HashSet<usize>,
    activations: Vec<i32>,
}

/// Builder for one fake node.
#[derive(Clone, Debug)]
pub struct NodeSpec {
    attrs: HashMap<String, AttrValue>,
    actions: Vec<String>,
}

impl NodeSpec {
    pub fn new(role: impl Into<String>) -> Self {
        let mut attrs = HashMap::new();
        attrs.insert(attr::ROLE.to_string(), AttrValue::Str(role.into()));
        Self {
            attrs,
            actions: Vec::new(),
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.attrs
            .insert(attr::TITLE.to_string(), AttrValue::Str(title.into()));
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.attrs.insert(
            attr::DESCRIPTION.to_string(),
            AttrValue::Str(description.into()),
        );
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.attrs
            .insert(attr::VALUE.to_string(), AttrValue::Str(value.into()));
        self
    }

    /// Numeric value, e.g. a scroll bar's `[0, 1]` position fraction.
    pub fn number_value(mut self, value: f64) -> Self {
        self.attrs
            .insert(attr::VALUE.to_string(), AttrValue::Num(value));
        self
    }

    pub fn subrole(mut self, subrole: impl Into<String>) -> Self {
        self.attrs
            .insert(attr::SUBROLE.to_string(), AttrValue::Str(subrole.into()));
        self
    }

    pub fn identifier(mut self, id: impl Into<String>) -> Self {
        self.attrs
            .insert(attr::IDENTIFIER.to_string(), AttrValue::Str(id.into()));
        self
    }

    pub fn dom_identifier(mut self, id: impl Into<String>) -> Self {
        self.attrs
            .insert(attr::DOM_IDENTIFIER.to_string(), AttrValue::Str(id.into()));
        self
    }

    pub fn dom_class_list(mut self, classes: &[&str]) -> Self {
        self.attrs.insert(
            attr::DOM_CLASS_LIST.to_string(),
            AttrValue::List(classes.iter().map(|c| c.to_string()).collect()),
        );
        self
    }

    pub fn orientation(mut self, orientation: impl Into<String>) -> Self {
        self.attrs.insert(
            attr::ORIENTATION.to_string(),
            AttrValue::Str(orientation.into()),
        );
        self
    }

    pub fn frame(mut self, x: f64, y: f64, width: f64, height: f64) -> Self {
        self.attrs
            .insert(attr::POSITION.to_string(), AttrValue::Point(Point::new(x, y)));
        self.attrs.insert(
            attr::SIZE.to_string(),
            AttrValue::Size(Size::new(width, height)),
        );
        self
    }

    /// Drop the position/size attributes entirely (unreadable geometry).
    pub fn no_geometry(mut self) -> Self {
        self.attrs.remove(attr::POSITION);
        self.attrs.remove(attr::SIZE);
        self
    }

    /// Drop the role attribute to simulate an unreadable node.
    pub fn broken_role(mut self) -> Self {
        self.attrs.remove(attr::ROLE);
        self
    }

    pub fn action(mut self, name: impl Into<String>) -> Self {
        self.actions.push(name.into());
        self
    }
}

#[derive(Debug)]
struct FakeNode {
    id: usize,
}

impl NodeHandle for FakeNode {
    fn identity(&self) -> u64 {
        self.id as u64
    }

    fn as_any(&self) -> &(dyn Any + Send + Sync) {
        self
    }
}

/// Shared, mutable fake accessibility forest.
#[derive(Clone)]
pub struct FakeAxTree {
    state: Arc<RwLock<TreeState>>,
}

impl Default for FakeAxTree {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeAxTree {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(TreeState {
                trusted: true,
                display: Some(Rect::new(0.0, 0.0, 1920.0, 1080.0)),
                ..TreeState::default()
            })),
        }
    }

    fn id_of(node: &NodeRef) -> usize {
        node.as_any()
            .downcast_ref::<FakeNode>()
            .map(|n| n.id)
            .expect("foreign node handle passed to FakeAxTree")
    }

    fn handle(id: usize) -> NodeRef {
        Arc::new(FakeNode { id })
    }

    pub fn set_trusted(&self, trusted: bool) {
        self.state.write().trusted = trusted;
    }

    pub fn set_display(&self, display: Option<Rect>) {
        self.state.write().display = display;
    }

    /// Register an application with a regular activation policy and return
    /// its root element.
    pub fn add_app(&self, name: &str, pid: i32) -> NodeRef {
        self.add_app_with_policy(name, pid, true)
    }

    pub fn add_app_with_policy(&self, name: &str, pid: i32, regular: bool) -> NodeRef {
        let mut state = self.state.write();
        let spec = NodeSpec::new(role::APPLICATION).title(name);
        let id = state.nodes.len();
        state.nodes.push(NodeData {
            parent: None,
            children: Vec::new(),
            attrs: spec.attrs,
            actions: spec.actions,
            pid,
            removed: false,
        });
        state.app_roots.insert(pid, id);
        let frontmost = state.apps.is_empty();
        state.apps.push(RunningApp {
            pid,
            name: name.to_string(),
            bundle_id: Some(format!("com.example.{}", name.to_lowercase())),
            regular,
            frontmost,
            hidden: false,
        });
        Self::handle(id)
    }

    pub fn add_child(&self, parent: &NodeRef, spec: NodeSpec) -> NodeRef {
        let parent_id = Self::id_of(parent);
        let mut state = self.state.write();
        let pid = state.nodes[parent_id].pid;
        let id = state.nodes.len();
        state.nodes.push(NodeData {
            parent: Some(parent_id),
            children: Vec::new(),
            attrs: spec.attrs,
            actions: spec.actions,
            pid,
            removed: false,
        });
        state.nodes[parent_id].children.push(id);
        Self::handle(id)
    }

    /// Remove a node (and subtree) from the tree, as if the UI replaced it.
    pub fn remove(&self, node: &NodeRef) {
        let id = Self::id_of(node);
        let mut state = self.state.write();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            state.nodes[current].removed = true;
            stack.extend(state.nodes[current].children.clone());
        }
        if let Some(parent) = state.nodes[id].parent {
            state.nodes[parent].children.retain(|&c| c != id);
        }
    }

    pub fn set_focused_node(&self, node: &NodeRef) {
        self.state.write().focused = Some(Self::id_of(node));
    }

    /// Translate a node and its whole subtree, as scrolling would.
    pub fn shift_subtree(&self, node: &NodeRef, dx: f64, dy: f64) {
        let id = Self::id_of(node);
        let mut state = self.state.write();
        shift_subtree_inner(&mut state, id, dx, dy);
    }

    /// Apply a wheel delta to the container that owns `node`, so tests that
    /// post scroll events observe content movement. Natural-scrolling
    /// convention: positive `wheel_y` moves content down.
    pub fn apply_wheel(&self, node: &NodeRef, wheel_x: f64, wheel_y: f64) {
        let id = Self::id_of(node);
        let mut state = self.state.write();
        if let Some(container) = nearest_scrollable(&state, id) {
            let children = state.nodes[container].children.clone();
            for child in children {
                shift_subtree_inner(&mut state, child, wheel_x, wheel_y);
            }
        }
    }

    /// Make value-set calls against this node succeed at the API level while
    /// leaving the stored value unchanged (some web fields do this).
    pub fn reject_value_sets(&self, node: &NodeRef) {
        let id = Self::id_of(node);
        self.state.write().rejected_value_sets.insert(id);
    }

    pub fn performed_actions(&self) -> Vec<(u64, String)> {
        self.state
            .read()
            .performed
            .iter()
            .map(|(id, name)| (*id as u64, name.clone()))
            .collect()
    }

    pub fn value_sets(&self) -> Vec<(u64, String, String)> {
        self.state
            .read()
            .value_sets
            .iter()
            .map(|(id, a, v)| (*id as u64, a.clone(), v.clone()))
            .collect()
    }

    pub fn activations(&self) -> Vec<i32> {
        self.state.read().activations.clone()
    }

    fn read_attr(&self, node: &NodeRef, attribute: &str) -> Option<AttrValue> {
        let id = Self::id_of(node);
        let state = self.state.read();
        if !state.trusted {
            return None;
        }
        let data = state.nodes.get(id)?;
        if data.removed {
            return None;
        }
        data.attrs.get(attribute).cloned()
    }
}

fn shift_subtree_inner(state: &mut TreeState, id: usize, dx: f64, dy: f64) {
    let mut stack = vec![id];
    while let Some(current) = stack.pop() {
        if let Some(AttrValue::Point(p)) = state.nodes[current].attrs.get(attr::POSITION).cloned() {
            state.nodes[current].attrs.insert(
                attr::POSITION.to_string(),
                AttrValue::Point(Point::new(p.x + dx, p.y + dy)),
            );
        }
        stack.extend(state.nodes[current].children.clone());
    }
}

fn nearest_scrollable(state: &TreeState, id: usize) -> Option<usize> {
    let mut current = Some(id);
    while let Some(node) = current {
        if let Some(AttrValue::Str(r)) = state.nodes[node].attrs.get(attr::ROLE) {
            if SCROLLABLE_ROLES.contains(&r.as_str()) {
                return Some(node);
            }
        }
        current = state.nodes[node].parent;
    }
    None
}

fn node_frame(state: &TreeState, id: usize) -> Option<Rect> {
    let data = state.nodes.get(id)?;
    let p = match data.attrs.get(attr::POSITION) {
        Some(AttrValue::Point(p)) => *p,
        _ => return None,
    };
    let s = match data.attrs.get(attr::SIZE) {
        Some(AttrValue::Size(s)) => *s,
        _ => return None,
    };
    Some(Rect::from_origin_size(p, s))
}

impl AxPort for FakeAxTree {
    fn is_trusted(&self, _prompt: bool) -> bool {
        self.state.read().trusted
    }

    fn string_attribute(&self, node: &NodeRef, attribute: &str) -> Option<String> {
        match self.read_attr(node, attribute)? {
            AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }

    fn string_list_attribute(&self, node: &NodeRef, attribute: &str) -> Option<Vec<String>> {
        match self.read_attr(node, attribute)? {
            AttrValue::List(list) => Some(list),
            _ => None,
        }
    }

    fn number_attribute(&self, node: &NodeRef, attribute: &str) -> Option<f64> {
        match self.read_attr(node, attribute)? {
            AttrValue::Num(n) => Some(n),
            _ => None,
        }
    }

    fn point_attribute(&self, node: &NodeRef, attribute: &str) -> Option<Point> {
        match self.read_attr(node, attribute)? {
            AttrValue::Point(p) => Some(p),
            _ => None,
        }
    }

    fn size_attribute(&self, node: &NodeRef, attribute: &str) -> Option<Size> {
        match self.read_attr(node, attribute)? {
            AttrValue::Size(s) => Some(s),
            _ => None,
        }
    }

    fn children(&self, node: &NodeRef) -> Vec<NodeRef> {
        let id = Self::id_of(node);
        let state = self.state.read();
        if !state.trusted {
            return Vec::new();
        }
        state
            .nodes
            .get(id)
            .map(|n| {
                n.children
                    .iter()
                    .filter(|&&c| !state.nodes[c].removed)
                    .map(|&c| Self::handle(c))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn parent(&self, node: &NodeRef) -> Option<NodeRef> {
        let id = Self::id_of(node);
        let state = self.state.read();
        if !state.trusted {
            return None;
        }
        state.nodes.get(id)?.parent.map(Self::handle)
    }

    fn node_list_attribute(&self, node: &NodeRef, attribute: &str) -> Vec<NodeRef> {
        if attribute != attr::WINDOWS {
            return Vec::new();
        }
        let id = Self::id_of(node);
        let state = self.state.read();
        if !state.trusted {
            return Vec::new();
        }
        state
            .nodes
            .get(id)
            .map(|n| {
                n.children
                    .iter()
                    .filter(|&&c| {
                        !state.nodes[c].removed
                            && matches!(
                                state.nodes[c].attrs.get(attr::ROLE),
                                Some(AttrValue::Str(r)) if r == role::WINDOW
                            )
                    })
                    .map(|&c| Self::handle(c))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn action_names(&self, node: &NodeRef) -> Vec<String> {
        let id = Self::id_of(node);
        let state = self.state.read();
        state
            .nodes
            .get(id)
            .map(|n| n.actions.clone())
            .unwrap_or_default()
    }

    fn perform_action(&self, node: &NodeRef, name: &str) -> Result<(), DriverError> {
        let id = Self::id_of(node);
        let mut state = self.state.write();
        let advertised = state
            .nodes
            .get(id)
            .map(|n| n.actions.iter().any(|a| a == name))
            .unwrap_or(false);
        if !advertised {
            return Err(DriverError::ActionFailed {
                action: name.to_string(),
                code: -25206,
            });
        }
        state.performed.push((id, name.to_string()));

        // The host's scroll-to-visible centers the target in its container.
        if name == action::SCROLL_TO_VISIBLE {
            if let Some(container) = state.nodes[id].parent.and_then(|p| nearest_scrollable(&state, p)) {
                if let (Some(target), Some(viewport)) =
                    (node_frame(&state, id), node_frame(&state, container))
                {
                    let dx = viewport.center().x - target.center().x;
                    let dy = viewport.center().y - target.center().y;
                    let children = state.nodes[container].children.clone();
                    for child in children {
                        shift_subtree_inner(&mut state, child, dx, dy);
                    }
                }
            }
        }
        Ok(())
    }

    fn set_string_attribute(
        &self,
        node: &NodeRef,
        attribute: &str,
        value: &str,
    ) -> Result<(), DriverError> {
        let id = Self::id_of(node);
        let mut state = self.state.write();
        state
            .value_sets
            .push((id, attribute.to_string(), value.to_string()));
        if state.rejected_value_sets.contains(&id) {
            return Ok(());
        }
        state
            .nodes
            .get_mut(id)
            .ok_or_else(|| DriverError::ActionFailed {
                action: format!("set {}", attribute),
                code: -25202,
            })?
            .attrs
            .insert(attribute.to_string(), AttrValue::Str(value.to_string()));
        Ok(())
    }

    fn set_focused(&self, node: &NodeRef, focused: bool) -> Result<(), DriverError> {
        let id = Self::id_of(node);
        let mut state = self.state.write();
        if focused {
            state.focused = Some(id);
        } else if state.focused == Some(id) {
            state.focused = None;
        }
        if let Some(data) = state.nodes.get_mut(id) {
            data.attrs
                .insert(attr::FOCUSED.to_string(), AttrValue::Bool(focused));
        }
        Ok(())
    }

    fn application_root(&self, pid: i32) -> Option<NodeRef> {
        let state = self.state.read();
        if !state.trusted {
            return None;
        }
        state.app_roots.get(&pid).copied().map(Self::handle)
    }

    fn element_at(&self, x: f64, y: f64) -> Option<NodeRef> {
        let state = self.state.read();
        if !state.trusted {
            return None;
        }
        let point = Point::new(x, y);
        let mut best: Option<(usize, usize)> = None; // (id, depth)
        for root in state.app_roots.values() {
            let mut stack = vec![(*root, 0usize)];
            while let Some((id, depth)) = stack.pop() {
                if state.nodes[id].removed {
                    continue;
                }
                if let Some(frame) = node_frame(&state, id) {
                    if frame.contains(point) && best.map(|(_, d)| depth >= d).unwrap_or(true) {
                        best = Some((id, depth));
                    }
                }
                stack.extend(
                    state.nodes[id]
                        .children
                        .iter()
                        .map(|&c| (c, depth + 1)),
                );
            }
        }
        best.map(|(id, _)| Self::handle(id))
    }

    fn focused_node(&self) -> Option<NodeRef> {
        let state = self.state.read();
        if !state.trusted {
            return None;
        }
        state.focused.map(Self::handle)
    }

    fn pid_of(&self, node: &NodeRef) -> Option<i32> {
        let id = Self::id_of(node);
        self.state.read().nodes.get(id).map(|n| n.pid)
    }
}

impl WorkspacePort for FakeAxTree {
    fn running_applications(&self) -> Vec<RunningApp> {
        self.state.read().apps.clone()
    }

    fn activate(&self, pid: i32) -> Result<(), DriverError> {
        let mut state = self.state.write();
        if !state.apps.iter().any(|a| a.pid == pid) {
            return Err(DriverError::AppNotRunning(format!("pid {}", pid)));
        }
        for app in state.apps.iter_mut() {
            app.frontmost = app.pid == pid;
        }
        state.activations.push(pid);
        Ok(())
    }

    fn frontmost_application(&self) -> Option<RunningApp> {
        self.state.read().apps.iter().find(|a| a.frontmost).cloned()
    }

    fn primary_display_frame(&self) -> Option<Rect> {
        self.state.read().display
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn children_are_ordered() {
        let tree = FakeAxTree::new();
        let app = tree.add_app("Demo", 100);
        for i in 0..3 {
            tree.add_child(&app, NodeSpec::new("AXButton").title(format!("b{}", i)));
        }
        let kids = AxPort::children(&tree, &app);
        let titles: Vec<_> = kids
            .iter()
            .map(|k| tree.string_attribute(k, attr::TITLE).unwrap())
            .collect();
        assert_eq!(titles, vec!["b0", "b1", "b2"]);
    }

    #[test]
    fn hit_test_returns_deepest_node() {
        let tree = FakeAxTree::new();
        let app = tree.add_app("Demo", 100);
        let window = tree.add_child(&app, NodeSpec::new(role::WINDOW).frame(0.0, 0.0, 800.0, 600.0));
        let button =
            tree.add_child(&window, NodeSpec::new("AXButton").frame(10.0, 10.0, 80.0, 30.0));
        let hit = tree.element_at(20.0, 20.0).unwrap();
        assert_eq!(hit.identity(), button.identity());
    }

    #[test]
    fn untrusted_tree_reads_nothing() {
        let tree = FakeAxTree::new();
        let app = tree.add_app("Demo", 100);
        tree.set_trusted(false);
        assert!(tree.string_attribute(&app, attr::ROLE).is_none());
        assert!(tree.application_root(100).is_none());
    }

    #[test]
    fn scroll_to_visible_centers_target() {
        let tree = FakeAxTree::new();
        let app = tree.add_app("Demo", 100);
        let window = tree.add_child(&app, NodeSpec::new(role::WINDOW).frame(0.0, 0.0, 800.0, 600.0));
        let scroll = tree.add_child(
            &window,
            NodeSpec::new(role::SCROLL_AREA).frame(0.0, 100.0, 800.0, 400.0),
        );
        let row = tree.add_child(
            &scroll,
            NodeSpec::new("AXStaticText")
                .frame(0.0, 2000.0, 800.0, 20.0)
                .action(action::SCROLL_TO_VISIBLE),
        );
        tree.perform_action(&row, action::SCROLL_TO_VISIBLE).unwrap();
        let p = tree.point_attribute(&row, attr::POSITION).unwrap();
        assert!((p.y - 290.0).abs() < 1.0, "row not centered: {:?}", p);
    }
}
