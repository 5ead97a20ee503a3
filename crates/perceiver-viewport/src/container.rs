//! Scroll-container discovery and introspection.

use dashmap::DashMap;

use ax_adapter::{attr, role, AxPort};
use axdriver_core_types::{NodeRef, Point, Rect, ScrollContainerInfo};

/// Bound on the parent-chain walk against malformed trees.
const MAX_PARENT_STEPS: usize = 50;

const SCROLLABLE_ROLES: [&str; 4] = [
    role::SCROLL_AREA,
    role::WEB_AREA,
    role::TABLE,
    role::LIST,
];

/// A located scrollable ancestor.
#[derive(Clone)]
pub struct ScrollContainer {
    pub node: NodeRef,
    pub role: String,
    /// On-screen frame; this is the viewport for descendants.
    pub frame: Rect,
}

fn frame_of(ax: &dyn AxPort, node: &NodeRef) -> Option<Rect> {
    let position = ax.point_attribute(node, attr::POSITION)?;
    let size = ax.size_attribute(node, attr::SIZE)?;
    Some(Rect::from_origin_size(position, size))
}

/// Walk the parent chain for the nearest scrollable ancestor, stopping at
/// the application root or after [`MAX_PARENT_STEPS`].
pub fn find(ax: &dyn AxPort, node: &NodeRef) -> Option<ScrollContainer> {
    let mut current = ax.parent(node)?;
    for _ in 0..MAX_PARENT_STEPS {
        if let Some(role_str) = ax.string_attribute(&current, attr::ROLE) {
            if role_str == role::APPLICATION {
                return None;
            }
            if SCROLLABLE_ROLES.contains(&role_str.as_str()) {
                return Some(resolve(ax, current, role_str));
            }
        }
        current = ax.parent(&current)?;
    }
    None
}

/// Memoized variant keyed by the element's direct parent identity, so a run
/// of siblings resolves the chain once.
pub fn find_cached(
    ax: &dyn AxPort,
    node: &NodeRef,
    cache: &DashMap<u64, Option<ScrollContainer>>,
) -> Option<ScrollContainer> {
    let parent = ax.parent(node)?;
    let key = parent.identity();
    if let Some(hit) = cache.get(&key) {
        return hit.clone();
    }
    let result = find(ax, node);
    cache.insert(key, result.clone());
    result
}

/// A web area hosts content but its scroll-area parent hosts the scroll
/// bars; synthetic scrolls must target the latter.
fn resolve(ax: &dyn AxPort, node: NodeRef, role_str: String) -> ScrollContainer {
    if role_str == role::WEB_AREA {
        if let Some(parent) = ax.parent(&node) {
            if ax.string_attribute(&parent, attr::ROLE).as_deref() == Some(role::SCROLL_AREA) {
                let frame = frame_of(ax, &parent).unwrap_or_default();
                return ScrollContainer {
                    node: parent,
                    role: role::SCROLL_AREA.to_string(),
                    frame,
                };
            }
        }
    }
    let frame = frame_of(ax, &node).unwrap_or_default();
    ScrollContainer {
        node,
        role: role_str,
        frame,
    }
}

/// Frame of the enclosing window, when one exists.
pub fn enclosing_window(ax: &dyn AxPort, node: &NodeRef) -> Option<Rect> {
    let mut current = ax.parent(node)?;
    for _ in 0..MAX_PARENT_STEPS {
        if ax.string_attribute(&current, attr::ROLE).as_deref() == Some(role::WINDOW) {
            return frame_of(ax, &current);
        }
        current = ax.parent(&current)?;
    }
    None
}

/// Read scroll-bar state from the container's direct children.
///
/// A scroll bar's value is a fraction in `[0, 1]`; a bar with no readable
/// value is presumed scrollable both ways.
pub fn introspect(ax: &dyn AxPort, container: &ScrollContainer) -> ScrollContainerInfo {
    let mut info = ScrollContainerInfo {
        role: container.role.clone(),
        visible_frame: container.frame,
        content_size: None,
        scroll_position: None,
        can_scroll_up: false,
        can_scroll_down: false,
        can_scroll_left: false,
        can_scroll_right: false,
    };

    for child in ax.children(&container.node) {
        let child_role = ax.string_attribute(&child, attr::ROLE);
        if child_role.as_deref() == Some(role::SCROLL_BAR) {
            let vertical = ax
                .string_attribute(&child, attr::ORIENTATION)
                .map(|o| o.contains("Vertical"))
                .unwrap_or(true);
            match ax.number_attribute(&child, attr::VALUE) {
                Some(value) => {
                    if vertical {
                        info.can_scroll_up = value > 0.01;
                        info.can_scroll_down = value < 0.99;
                    } else {
                        info.can_scroll_left = value > 0.01;
                        info.can_scroll_right = value < 0.99;
                    }
                }
                None => {
                    if vertical {
                        info.can_scroll_up = true;
                        info.can_scroll_down = true;
                    } else {
                        info.can_scroll_left = true;
                        info.can_scroll_right = true;
                    }
                }
            }
        } else if info.content_size.is_none() {
            info.content_size = ax.size_attribute(&child, attr::SIZE);
            info.scroll_position = ax
                .point_attribute(&child, attr::POSITION)
                .map(|p| Point::new(p.x - container.frame.x, p.y - container.frame.y));
        }
    }

    info
}
