//! Query predicate evaluation.

use axdriver_core_types::{Element, ElementQuery};

/// Canonicalize a role name: prepend the `AX` prefix and upper-case the
/// first character when callers pass short names like `button`.
pub fn normalize_role(role: &str) -> String {
    let trimmed = role.trim();
    if trimmed.starts_with("AX") {
        return trimmed.to_string();
    }
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => format!("AX{}{}", first.to_uppercase(), chars.as_str()),
        None => String::new(),
    }
}

/// Normalize the role predicates of a query in place.
pub fn normalize_query(query: &ElementQuery) -> ElementQuery {
    let mut normalized = query.clone();
    if let Some(role) = &normalized.role {
        normalized.role = Some(normalize_role(role));
    }
    if let Some(parent) = &normalized.parent_role {
        normalized.parent_role = Some(normalize_role(parent));
    }
    normalized
}

/// Whether `element` satisfies every predicate of a normalized query.
pub fn matches(element: &Element, query: &ElementQuery) -> bool {
    if let Some(role) = &query.role {
        if &element.role != role {
            return false;
        }
    }

    if let Some(needle) = &query.text {
        let candidates = [
            element.title.as_deref(),
            element.description.as_deref(),
            element.value.as_deref(),
        ];
        let hit = candidates
            .into_iter()
            .flatten()
            .any(|candidate| text_matches(candidate, needle, query.fuzzy_match));
        if !hit {
            return false;
        }
    }

    if let Some(identifier) = &query.identifier {
        if element.identifier.as_deref() != Some(identifier.as_str()) {
            return false;
        }
    }

    if let Some(index) = query.sibling_index {
        if element.sibling_index != Some(index) {
            return false;
        }
    }

    if let Some(parent) = &query.parent_role {
        if element.parent_role.as_deref() != Some(parent.as_str()) {
            return false;
        }
    }

    within(element.size.width, query.min_width, query.max_width)
        && within(element.size.height, query.min_height, query.max_height)
}

fn within(value: f64, min: Option<f64>, max: Option<f64>) -> bool {
    if let Some(min) = min {
        if value < min {
            return false;
        }
    }
    if let Some(max) = max {
        if value > max {
            return false;
        }
    }
    true
}

/// Case-insensitive containment, relaxed to in-order subsequence when
/// `fuzzy` is set.
pub fn text_matches(candidate: &str, needle: &str, fuzzy: bool) -> bool {
    let candidate = candidate.to_lowercase();
    let needle = needle.to_lowercase();
    if candidate.contains(&needle) {
        return true;
    }
    fuzzy && is_subsequence(&needle, &candidate)
}

fn is_subsequence(needle: &str, haystack: &str) -> bool {
    let mut chars = haystack.chars();
    needle
        .chars()
        .all(|wanted| chars.by_ref().any(|c| c == wanted))
}
