//! Viewport visibility and scroll-container analysis.
//!
//! For each element the analyzer decides whether it is rendered inside its
//! effective viewport (the frame of its nearest scrollable ancestor, else
//! the enclosing window, else the main display) and, if not, in which
//! direction and by how many pixels it would need to scroll.

pub mod container;

use dashmap::DashMap;
use tracing::debug;

use axdriver_core_types::{
    Element, Rect, ScrollDelta, ScrollDirection, VisibilityInfo, VisibilityReason,
};
use std::sync::Arc;

use ax_adapter::{AxPort, WorkspacePort};

pub use container::ScrollContainer;

/// Intersection ratio treated as fully visible.
const FULLY_VISIBLE_RATIO: f64 = 0.99;

pub struct ViewportAnalyzer {
    ax: Arc<dyn AxPort>,
    workspace: Arc<dyn WorkspacePort>,
}

/// Where the effective viewport came from; decides the not-visible reason.
enum ViewportSource {
    Container,
    Window,
    Display,
}

impl ViewportAnalyzer {
    pub fn new(ax: Arc<dyn AxPort>, workspace: Arc<dyn WorkspacePort>) -> Self {
        Self { ax, workspace }
    }

    /// Annotate a single element.
    pub fn annotate(&self, element: &mut Element) {
        let cache = DashMap::new();
        self.annotate_with_cache(element, &cache);
    }

    /// Annotate a batch, memoizing container discovery and introspection by
    /// host handle identity so sibling runs do not repeat the parent-chain
    /// walk.
    pub fn annotate_all(&self, elements: &mut [Element]) {
        let cache = DashMap::new();
        for element in elements.iter_mut() {
            self.annotate_with_cache(element, &cache);
        }
    }

    fn annotate_with_cache(&self, element: &mut Element, cache: &DashMap<u64, Option<ScrollContainer>>) {
        if !element.has_size() {
            element.visibility = Some(VisibilityInfo::zero_size());
            element.scroll_container = None;
            return;
        }

        let container = element
            .node
            .as_ref()
            .and_then(|node| container::find_cached(self.ax.as_ref(), node, cache));

        let (viewport, source) = match &container {
            Some(found) => (Some(found.frame), ViewportSource::Container),
            None => self.fallback_viewport(element),
        };

        element.scroll_container = container
            .as_ref()
            .map(|found| container::introspect(self.ax.as_ref(), found));

        element.visibility = Some(match viewport {
            Some(viewport) => visibility_for(element.frame(), viewport, &source),
            None => {
                debug!(target = %element.describe(), "no viewport resolvable");
                VisibilityInfo {
                    in_viewport: false,
                    percent_visible: 0.0,
                    reason: VisibilityReason::Unknown,
                    requires_scroll: None,
                }
            }
        });
    }

    /// Window frame when an enclosing window exists, else display bounds.
    fn fallback_viewport(&self, element: &Element) -> (Option<Rect>, ViewportSource) {
        if let Some(node) = &element.node {
            if let Some(window) = container::enclosing_window(self.ax.as_ref(), node) {
                return (Some(window), ViewportSource::Window);
            }
        }
        (
            self.workspace.primary_display_frame(),
            ViewportSource::Display,
        )
    }

    /// Locate the nearest scrollable ancestor without annotating.
    pub fn scroll_container_of(&self, element: &Element) -> Option<ScrollContainer> {
        let node = element.node.as_ref()?;
        container::find(self.ax.as_ref(), node)
    }
}

/// Pure visibility computation for an element frame against a viewport.
fn visibility_for(frame: Rect, viewport: Rect, source: &ViewportSource) -> VisibilityInfo {
    let intersection = frame.intersection(&viewport);
    match intersection {
        None => {
            let reason = match source {
                ViewportSource::Container => side_reason(frame, viewport),
                ViewportSource::Window => VisibilityReason::OutsideWindow,
                ViewportSource::Display => VisibilityReason::NoScrollContainer,
            };
            VisibilityInfo {
                in_viewport: false,
                percent_visible: 0.0,
                reason,
                requires_scroll: matches!(source, ViewportSource::Container)
                    .then(|| scroll_delta(frame, viewport)),
            }
        }
        Some(overlap) => {
            let ratio = (overlap.area() / frame.area()).clamp(0.0, 1.0);
            if ratio >= FULLY_VISIBLE_RATIO {
                VisibilityInfo {
                    in_viewport: true,
                    percent_visible: ratio,
                    reason: VisibilityReason::FullyVisible,
                    requires_scroll: None,
                }
            } else {
                VisibilityInfo {
                    in_viewport: false,
                    percent_visible: ratio,
                    reason: VisibilityReason::PartiallyVisible,
                    requires_scroll: Some(scroll_delta(frame, viewport)),
                }
            }
        }
    }
}

/// Which side of the viewport the element's center lies on.
fn side_reason(frame: Rect, viewport: Rect) -> VisibilityReason {
    let center = frame.center();
    let vc = viewport.center();
    let dx = center.x - vc.x;
    let dy = center.y - vc.y;
    if dy.abs() >= dx.abs() {
        if dy < 0.0 {
            VisibilityReason::AboveViewport
        } else {
            VisibilityReason::BelowViewport
        }
    } else if dx < 0.0 {
        VisibilityReason::LeftOfViewport
    } else {
        VisibilityReason::RightOfViewport
    }
}

/// Distance to move the element's center onto the viewport's center,
/// along the dominant axis.
fn scroll_delta(frame: Rect, viewport: Rect) -> ScrollDelta {
    let center = frame.center();
    let vc = viewport.center();
    let dx = center.x - vc.x;
    let dy = center.y - vc.y;
    if dy.abs() >= dx.abs() {
        ScrollDelta {
            direction: if dy >= 0.0 {
                ScrollDirection::Down
            } else {
                ScrollDirection::Up
            },
            estimated_pixels: dy.abs(),
        }
    } else {
        ScrollDelta {
            direction: if dx >= 0.0 {
                ScrollDirection::Right
            } else {
                ScrollDirection::Left
            },
            estimated_pixels: dx.abs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ax_adapter::fake::{FakeAxTree, NodeSpec};
    use ax_adapter::{action, role};
    use axdriver_core_types::{NodeRef, Point, Size};

    fn analyzer(tree: &FakeAxTree) -> ViewportAnalyzer {
        ViewportAnalyzer::new(Arc::new(tree.clone()), Arc::new(tree.clone()))
    }

    fn element_for(tree: &FakeAxTree, node: &NodeRef) -> Element {
        let ax: &dyn AxPort = tree;
        let mut e = Element::with_role(ax.string_attribute(node, "AXRole").unwrap());
        e.position = ax
            .point_attribute(node, "AXPosition")
            .unwrap_or(Point::new(0.0, 0.0));
        e.size = ax
            .size_attribute(node, "AXSize")
            .unwrap_or(Size::new(0.0, 0.0));
        e.node = Some(node.clone());
        e
    }

    fn scrollable_fixture() -> (FakeAxTree, NodeRef, NodeRef) {
        let tree = FakeAxTree::new();
        let app = tree.add_app("Demo", 10);
        let window =
            tree.add_child(&app, NodeSpec::new(role::WINDOW).frame(0.0, 0.0, 1200.0, 900.0));
        let scroll = tree.add_child(
            &window,
            NodeSpec::new(role::SCROLL_AREA).frame(0.0, 100.0, 1200.0, 800.0),
        );
        (tree, window, scroll)
    }

    #[test]
    fn zero_size_element_reports_zero_size() {
        let (tree, _, scroll) = scrollable_fixture();
        let node = tree.add_child(&scroll, NodeSpec::new("AXButton").frame(10.0, 10.0, 0.0, 0.0));
        let mut element = element_for(&tree, &node);
        analyzer(&tree).annotate(&mut element);
        let v = element.visibility.unwrap();
        assert_eq!(v.reason, VisibilityReason::ZeroSize);
        assert_eq!(v.percent_visible, 0.0);
        assert!(element.scroll_container.is_none());
    }

    #[test]
    fn fully_visible_inside_container() {
        let (tree, _, scroll) = scrollable_fixture();
        let node =
            tree.add_child(&scroll, NodeSpec::new("AXButton").frame(100.0, 200.0, 80.0, 30.0));
        let mut element = element_for(&tree, &node);
        analyzer(&tree).annotate(&mut element);
        let v = element.visibility.unwrap();
        assert!(v.in_viewport);
        assert_eq!(v.reason, VisibilityReason::FullyVisible);
        assert!(v.requires_scroll.is_none());
        assert!(v.percent_visible >= 0.99);
    }

    #[test]
    fn below_viewport_scroll_delta_points_down() {
        let (tree, _, scroll) = scrollable_fixture();
        // Viewport spans y 100..900, center y = 500.
        let node =
            tree.add_child(&scroll, NodeSpec::new("AXButton").frame(800.0, 2400.0, 40.0, 20.0));
        let mut element = element_for(&tree, &node);
        analyzer(&tree).annotate(&mut element);
        let v = element.visibility.unwrap();
        assert_eq!(v.reason, VisibilityReason::BelowViewport);
        let delta = v.requires_scroll.unwrap();
        assert_eq!(delta.direction, ScrollDirection::Down);
        assert!((delta.estimated_pixels - 1910.0).abs() < 1.0);
    }

    #[test]
    fn left_of_viewport_uses_horizontal_axis() {
        let (tree, _, scroll) = scrollable_fixture();
        let node =
            tree.add_child(&scroll, NodeSpec::new("AXCell").frame(-3000.0, 400.0, 50.0, 20.0));
        let mut element = element_for(&tree, &node);
        analyzer(&tree).annotate(&mut element);
        let v = element.visibility.unwrap();
        assert_eq!(v.reason, VisibilityReason::LeftOfViewport);
        assert_eq!(v.requires_scroll.unwrap().direction, ScrollDirection::Left);
    }

    #[test]
    fn partially_visible_keeps_ratio_and_delta() {
        let (tree, _, scroll) = scrollable_fixture();
        // Half of the element pokes below the viewport bottom (y=900).
        let node =
            tree.add_child(&scroll, NodeSpec::new("AXGroup").frame(100.0, 880.0, 100.0, 40.0));
        let mut element = element_for(&tree, &node);
        analyzer(&tree).annotate(&mut element);
        let v = element.visibility.unwrap();
        assert_eq!(v.reason, VisibilityReason::PartiallyVisible);
        assert!(!v.in_viewport);
        assert!((v.percent_visible - 0.5).abs() < 0.01);
        assert!(v.requires_scroll.is_some());
    }

    #[test]
    fn window_fallback_marks_outside_window() {
        let tree = FakeAxTree::new();
        let app = tree.add_app("Demo", 10);
        let window =
            tree.add_child(&app, NodeSpec::new(role::WINDOW).frame(0.0, 0.0, 800.0, 600.0));
        let node =
            tree.add_child(&window, NodeSpec::new("AXButton").frame(5000.0, 50.0, 40.0, 20.0));
        let mut element = element_for(&tree, &node);
        analyzer(&tree).annotate(&mut element);
        let v = element.visibility.unwrap();
        assert_eq!(v.reason, VisibilityReason::OutsideWindow);
        assert!(v.requires_scroll.is_none());
    }

    #[test]
    fn web_area_prefers_scroll_area_parent() {
        let tree = FakeAxTree::new();
        let app = tree.add_app("Browser", 11);
        let window =
            tree.add_child(&app, NodeSpec::new(role::WINDOW).frame(0.0, 0.0, 1000.0, 800.0));
        let scroll = tree.add_child(
            &window,
            NodeSpec::new(role::SCROLL_AREA).frame(0.0, 80.0, 1000.0, 700.0),
        );
        let web = tree.add_child(
            &scroll,
            NodeSpec::new(role::WEB_AREA)
                .frame(0.0, 80.0, 1000.0, 3000.0)
                .action(action::SCROLL_TO_VISIBLE),
        );
        let node = tree.add_child(&web, NodeSpec::new("AXLink").frame(10.0, 100.0, 80.0, 20.0));
        let mut element = element_for(&tree, &node);
        let found = analyzer(&tree).scroll_container_of(&element).unwrap();
        assert_eq!(found.role, role::SCROLL_AREA);
        analyzer(&tree).annotate(&mut element);
        assert_eq!(
            element.scroll_container.unwrap().role,
            role::SCROLL_AREA.to_string()
        );
    }

    #[test]
    fn scrollbar_fractions_gate_directions() {
        let (tree, _, scroll) = scrollable_fixture();
        tree.add_child(
            &scroll,
            NodeSpec::new(role::SCROLL_BAR)
                .orientation("AXVerticalOrientation")
                .number_value(0.0),
        );
        let node =
            tree.add_child(&scroll, NodeSpec::new("AXButton").frame(10.0, 200.0, 40.0, 20.0));
        let mut element = element_for(&tree, &node);
        analyzer(&tree).annotate(&mut element);
        let info = element.scroll_container.unwrap();
        assert!(!info.can_scroll_up, "at top, cannot scroll further up");
        assert!(info.can_scroll_down);
        assert!(!info.can_scroll_left);
    }

    #[test]
    fn batch_annotation_matches_single_annotation() {
        let (tree, _, scroll) = scrollable_fixture();
        let mut batch: Vec<Element> = (0..6)
            .map(|i| {
                let node = tree.add_child(
                    &scroll,
                    NodeSpec::new("AXRow").frame(0.0, 150.0 + 40.0 * i as f64, 1200.0, 30.0),
                );
                element_for(&tree, &node)
            })
            .collect();
        let mut singles = batch.clone();
        let analyzer = analyzer(&tree);
        analyzer.annotate_all(&mut batch);
        for e in singles.iter_mut() {
            analyzer.annotate(e);
        }
        for (a, b) in batch.iter().zip(&singles) {
            assert_eq!(a.visibility, b.visibility);
            assert_eq!(a.scroll_container, b.scroll_container);
        }
    }
}
