//! Depth-first traversal of the accessibility forest.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use ax_adapter::{attr, AxPort, WorkspacePort};
use axdriver_core_types::{
    DriverError, Element, NodeRef, PermissionGrant, Point, RunningApp, Size,
};

/// Visitor verdict for each produced element.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VisitFlow {
    Continue,
    /// Keep the element but do not descend into its children.
    SkipChildren,
    /// Abort the whole traversal (e.g. a match limit was reached).
    Stop,
}

/// Walks one application tree (or the whole forest) and materializes
/// elements with path, depth, and sibling index.
pub struct TreeWalker {
    ax: Arc<dyn AxPort>,
    workspace: Arc<dyn WorkspacePort>,
}

impl TreeWalker {
    pub fn new(ax: Arc<dyn AxPort>, workspace: Arc<dyn WorkspacePort>) -> Self {
        Self { ax, workspace }
    }

    pub fn ax(&self) -> &Arc<dyn AxPort> {
        &self.ax
    }

    pub fn workspace(&self) -> &Arc<dyn WorkspacePort> {
        &self.workspace
    }

    fn ensure_trusted(&self) -> Result<(), DriverError> {
        if self.ax.is_trusted(false) {
            Ok(())
        } else {
            Err(DriverError::PermissionDenied {
                grant: PermissionGrant::Accessibility,
            })
        }
    }

    /// Depth-first walk from `root`, invoking `visitor` for every node whose
    /// role is readable. Returns the number of nodes visited.
    pub fn traverse(
        &self,
        root: &NodeRef,
        max_depth: usize,
        visitor: &mut dyn FnMut(&Element) -> VisitFlow,
    ) -> Result<usize, DriverError> {
        self.ensure_trusted()?;
        let mut visited = HashSet::new();
        let mut count = 0usize;
        self.walk(
            root, 0, max_depth, &[], None, None, &mut visited, &mut count, visitor,
        );
        Ok(count)
    }

    #[allow(clippy::too_many_arguments)]
    fn walk(
        &self,
        node: &NodeRef,
        depth: usize,
        max_depth: usize,
        parent_path: &[String],
        sibling_index: Option<usize>,
        parent_role: Option<&str>,
        visited: &mut HashSet<u64>,
        count: &mut usize,
        visitor: &mut dyn FnMut(&Element) -> VisitFlow,
    ) -> VisitFlow {
        if depth > max_depth {
            return VisitFlow::Continue;
        }
        // Identity comes from the host so re-read wrappers dedupe correctly.
        // A hash collision costs a skipped subtree, which is safe.
        if !visited.insert(node.identity()) {
            debug!(depth, "revisited node, skipping subtree");
            return VisitFlow::Continue;
        }

        let Some(element) =
            self.build_element(node, depth, parent_path, sibling_index, parent_role)
        else {
            // Role unreadable: the node is dropped entirely.
            return VisitFlow::Continue;
        };
        *count += 1;

        match visitor(&element) {
            VisitFlow::Stop => return VisitFlow::Stop,
            VisitFlow::SkipChildren => return VisitFlow::Continue,
            VisitFlow::Continue => {}
        }
        if depth == max_depth {
            return VisitFlow::Continue;
        }

        for (index, child) in self.ax.children(node).into_iter().enumerate() {
            let flow = self.walk(
                &child,
                depth + 1,
                max_depth,
                &element.path,
                Some(index),
                Some(&element.role),
                visited,
                count,
                visitor,
            );
            if flow == VisitFlow::Stop {
                return VisitFlow::Stop;
            }
        }
        VisitFlow::Continue
    }

    /// Collect all elements under `root`, optionally filtered.
    pub fn collect(
        &self,
        root: &NodeRef,
        max_depth: usize,
        filter: Option<&dyn Fn(&Element) -> bool>,
    ) -> Result<Vec<Element>, DriverError> {
        let mut elements = Vec::new();
        self.traverse(root, max_depth, &mut |element| {
            if filter.map(|f| f(element)).unwrap_or(true) {
                elements.push(element.clone());
            }
            VisitFlow::Continue
        })?;
        Ok(elements)
    }

    /// Root element of a running application by localized name.
    /// Not-running applications yield `Ok(None)` rather than an error.
    pub fn application_element(&self, name: &str) -> Result<Option<NodeRef>, DriverError> {
        self.ensure_trusted()?;
        let app = self
            .workspace
            .running_applications()
            .into_iter()
            .find(|app| app.name.eq_ignore_ascii_case(name));
        match app {
            Some(app) => Ok(self.ax.application_root(app.pid)),
            None => {
                debug!(name, "application not running");
                Ok(None)
            }
        }
    }

    /// Root elements of every application with a regular activation policy.
    pub fn all_application_elements(&self) -> Result<Vec<(RunningApp, NodeRef)>, DriverError> {
        self.ensure_trusted()?;
        Ok(self
            .workspace
            .running_applications()
            .into_iter()
            .filter(|app| app.regular)
            .filter_map(|app| {
                let root = self.ax.application_root(app.pid);
                if root.is_none() {
                    warn!(pid = app.pid, name = %app.name, "no accessibility root");
                }
                root.map(|root| (app, root))
            })
            .collect())
    }

    /// System-wide hit test. The returned element has no sibling index and
    /// its path starts at itself.
    pub fn element_at_position(&self, x: f64, y: f64) -> Result<Option<Element>, DriverError> {
        self.ensure_trusted()?;
        Ok(self
            .ax
            .element_at(x, y)
            .and_then(|node| self.build_detached(&node)))
    }

    /// The element currently holding keyboard focus.
    pub fn focused_element(&self) -> Result<Option<Element>, DriverError> {
        self.ensure_trusted()?;
        Ok(self
            .ax
            .focused_node()
            .and_then(|node| self.build_detached(&node)))
    }

    /// Window elements of an application root.
    pub fn windows_of(&self, app: &NodeRef) -> Vec<NodeRef> {
        self.ax.node_list_attribute(app, attr::WINDOWS)
    }

    /// Build an element discovered outside a traversal (hit test, focus).
    pub fn build_detached(&self, node: &NodeRef) -> Option<Element> {
        let parent_role = self
            .ax
            .parent(node)
            .and_then(|parent| self.ax.string_attribute(&parent, attr::ROLE));
        self.build_element(node, 0, &[], None, parent_role.as_deref())
    }

    /// Populate one element. Returns `None` when the role is unreadable.
    fn build_element(
        &self,
        node: &NodeRef,
        depth: usize,
        parent_path: &[String],
        sibling_index: Option<usize>,
        parent_role: Option<&str>,
    ) -> Option<Element> {
        let role = self
            .ax
            .string_attribute(node, attr::ROLE)
            .filter(|r| !r.is_empty())?;

        let mut path = Vec::with_capacity(parent_path.len() + 1);
        path.extend_from_slice(parent_path);
        path.push(role.clone());

        let non_empty = |s: String| if s.is_empty() { None } else { Some(s) };

        Some(Element {
            node: Some(node.clone()),
            pid: self.ax.pid_of(node),
            captured_at: Some(std::time::Instant::now()),
            title: self
                .ax
                .string_attribute(node, attr::TITLE)
                .and_then(non_empty),
            description: self
                .ax
                .string_attribute(node, attr::DESCRIPTION)
                .and_then(non_empty),
            subrole: self
                .ax
                .string_attribute(node, attr::SUBROLE)
                .and_then(non_empty),
            value: self.ax.string_attribute(node, attr::VALUE),
            position: self
                .ax
                .point_attribute(node, attr::POSITION)
                .unwrap_or(Point::new(0.0, 0.0)),
            size: self
                .ax
                .size_attribute(node, attr::SIZE)
                .unwrap_or(Size::new(0.0, 0.0)),
            path,
            depth,
            identifier: self
                .ax
                .string_attribute(node, attr::IDENTIFIER)
                .and_then(non_empty),
            sibling_index,
            dom_identifier: self
                .ax
                .string_attribute(node, attr::DOM_IDENTIFIER)
                .and_then(non_empty),
            dom_class_list: self
                .ax
                .string_list_attribute(node, attr::DOM_CLASS_LIST)
                .unwrap_or_default(),
            parent_role: parent_role.map(str::to_string),
            reference: None,
            role,
            visibility: None,
            scroll_container: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ax_adapter::fake::{FakeAxTree, NodeSpec};
    use ax_adapter::role;

    fn walker(tree: &FakeAxTree) -> TreeWalker {
        TreeWalker::new(Arc::new(tree.clone()), Arc::new(tree.clone()))
    }

    fn small_tree() -> (FakeAxTree, NodeRef) {
        let tree = FakeAxTree::new();
        let app = tree.add_app("Demo", 42);
        let window =
            tree.add_child(&app, NodeSpec::new(role::WINDOW).frame(0.0, 0.0, 800.0, 600.0));
        let toolbar = tree.add_child(&window, NodeSpec::new("AXToolbar").frame(0.0, 0.0, 800.0, 40.0));
        for title in ["Back", "Forward", "Reload"] {
            tree.add_child(
                &toolbar,
                NodeSpec::new("AXButton").title(title).frame(0.0, 0.0, 40.0, 30.0),
            );
        }
        (tree, app)
    }

    #[test]
    fn traversal_populates_path_depth_and_sibling_index() {
        let (tree, app) = small_tree();
        let elements = walker(&tree).collect(&app, 10, None).unwrap();
        assert_eq!(elements.len(), 6);
        for e in &elements {
            assert!(!e.role.is_empty());
            assert_eq!(e.path.last().unwrap(), &e.role);
            assert!(e.depth <= 10);
            assert!(e.size.width >= 0.0 && e.size.height >= 0.0);
        }
        let reload = elements.iter().find(|e| e.title.as_deref() == Some("Reload")).unwrap();
        assert_eq!(reload.sibling_index, Some(2));
        assert_eq!(reload.parent_role.as_deref(), Some("AXToolbar"));
        assert_eq!(reload.depth, 3);
        assert_eq!(
            reload.path,
            vec!["AXApplication", "AXWindow", "AXToolbar", "AXButton"]
        );
    }

    #[test]
    fn max_depth_bounds_traversal() {
        let (tree, app) = small_tree();
        let shallow = walker(&tree).collect(&app, 1, None).unwrap();
        // Application root plus the window; buttons are at depth 3.
        assert_eq!(shallow.len(), 2);
    }

    #[test]
    fn broken_role_drops_node_and_subtree() {
        let (tree, app) = small_tree();
        let windows = walker(&tree).windows_of(&app);
        let orphan = tree.add_child(&windows[0], NodeSpec::new("AXGroup").broken_role());
        tree.add_child(&orphan, NodeSpec::new("AXButton").title("Hidden"));
        let elements = walker(&tree).collect(&app, 10, None).unwrap();
        assert!(elements.iter().all(|e| e.title.as_deref() != Some("Hidden")));
    }

    #[test]
    fn untrusted_walk_is_a_permission_error() {
        let (tree, app) = small_tree();
        tree.set_trusted(false);
        let err = walker(&tree).collect(&app, 10, None).unwrap_err();
        assert!(matches!(err, DriverError::PermissionDenied { .. }));
    }

    #[test]
    fn unknown_application_is_empty_not_an_error() {
        let (tree, _) = small_tree();
        assert!(walker(&tree).application_element("NoSuchApp").unwrap().is_none());
        assert!(walker(&tree).application_element("demo").unwrap().is_some());
    }

    #[test]
    fn regular_policy_filters_forest_roots() {
        let (tree, _) = small_tree();
        tree.add_app_with_policy("Daemon", 43, false);
        let roots = walker(&tree).all_application_elements().unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].0.name, "Demo");
    }

    #[test]
    fn hit_test_builds_detached_element() {
        let tree = FakeAxTree::new();
        let app = tree.add_app("Demo", 42);
        let window =
            tree.add_child(&app, NodeSpec::new(role::WINDOW).frame(0.0, 0.0, 800.0, 600.0));
        tree.add_child(
            &window,
            NodeSpec::new("AXButton").title("Go").frame(100.0, 100.0, 60.0, 24.0),
        );
        let element = walker(&tree).element_at_position(110.0, 110.0).unwrap().unwrap();
        assert_eq!(element.role, "AXButton");
        assert_eq!(element.sibling_index, None);
        assert_eq!(element.parent_role.as_deref(), Some(role::WINDOW));
        assert_eq!(element.path, vec!["AXButton"]);
    }

    #[test]
    fn focused_element_reads_the_system_focus() {
        let (tree, app) = small_tree();
        assert!(walker(&tree).focused_element().unwrap().is_none());
        let windows = walker(&tree).windows_of(&app);
        tree.set_focused_node(&windows[0]);
        let focused = walker(&tree).focused_element().unwrap().unwrap();
        assert_eq!(focused.role, role::WINDOW);
    }

    #[test]
    fn visitor_stop_halts_traversal() {
        let (tree, app) = small_tree();
        let mut seen = 0usize;
        let visited = walker(&tree)
            .traverse(&app, 10, &mut |_| {
                seen += 1;
                if seen == 2 {
                    VisitFlow::Stop
                } else {
                    VisitFlow::Continue
                }
            })
            .unwrap();
        assert_eq!(seen, 2);
        assert_eq!(visited, 2);
    }
}
