//! Re-finding an element after the UI may have shifted.
//!
//! Elements go stale across scrolls and across more than a few hundred
//! milliseconds. The primary re-query matches on text, role, identifier,
//! sibling index, parent role, and size within ±5 px; when the primary
//! misses (some web views reorder focusable children while scrolling), a
//! secondary attempt widens to role + size and takes the candidate nearest
//! the last known position.

use tracing::debug;

use ax_adapter::WorkspacePort;
use axdriver_core_types::{DriverError, Element, ElementQuery};
use element_locator::ElementEngine;

/// Size tolerance for the strict match.
const SIZE_SLACK_PX: f64 = 5.0;

pub fn find_again(
    engine: &ElementEngine,
    workspace: &dyn WorkspacePort,
    element: &Element,
) -> Result<Option<Element>, DriverError> {
    let application = element.pid.and_then(|pid| {
        workspace
            .running_applications()
            .into_iter()
            .find(|app| app.pid == pid)
            .map(|app| app.name)
    });

    let mut strict = sized_query(element).exact();
    if let Some(app) = &application {
        strict = strict.with_application(app.clone());
    }
    if let Some(label) = element.label() {
        strict = strict.with_text(label.to_string());
    }
    if let Some(identifier) = &element.identifier {
        strict = strict.with_identifier(identifier.clone());
    }
    if let Some(index) = element.sibling_index {
        strict = strict.with_sibling_index(index);
    }
    if let Some(parent) = &element.parent_role {
        strict = strict.with_parent_role(parent.clone());
    }

    if let Some(hit) = engine.find(&strict)?.elements.into_iter().next() {
        return Ok(Some(hit));
    }
    debug!(target = %element.describe(), "strict re-query missed, widening to role+size");

    let mut wide = sized_query(element);
    if let Some(app) = &application {
        wide = wide.with_application(app.clone());
    }
    let mut candidates = engine.find(&wide)?.elements;
    candidates.sort_by(|a, b| {
        let da = (a.position.x - element.position.x).hypot(a.position.y - element.position.y);
        let db = (b.position.x - element.position.x).hypot(b.position.y - element.position.y);
        da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
    });
    Ok(candidates.into_iter().next())
}

fn sized_query(element: &Element) -> ElementQuery {
    ElementQuery::new()
        .with_role(element.role.clone())
        .with_width_range(
            Some(element.size.width - SIZE_SLACK_PX),
            Some(element.size.width + SIZE_SLACK_PX),
        )
        .with_height_range(
            Some(element.size.height - SIZE_SLACK_PX),
            Some(element.size.height + SIZE_SLACK_PX),
        )
}
