//! Immutable description of what to look for in the accessibility forest.

use serde::{Deserialize, Serialize};

/// Safety bound against pathological trees when the caller does not set one.
pub const DEFAULT_MAX_DEPTH: usize = 50;

/// An element query. All predicates are optional; an empty query matches
/// everything up to `limit` (rejecting that is the caller's concern).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ElementQuery {
    /// Matched against title, description, and value in order.
    pub text: Option<String>,

    /// Normalized role, e.g. `AXButton`; short names are canonicalized.
    pub role: Option<String>,

    /// Restrict the search to one running application by name.
    pub application: Option<String>,

    pub identifier: Option<String>,

    pub sibling_index: Option<usize>,

    pub parent_role: Option<String>,

    pub min_width: Option<f64>,
    pub max_width: Option<f64>,
    pub min_height: Option<f64>,
    pub max_height: Option<f64>,

    /// Relax text containment to in-order subsequence matching.
    pub fuzzy_match: bool,

    /// Stop after this many matches; 0 = unlimited.
    pub limit: usize,

    pub max_depth: usize,
}

impl Default for ElementQuery {
    fn default() -> Self {
        Self {
            text: None,
            role: None,
            application: None,
            identifier: None,
            sibling_index: None,
            parent_role: None,
            min_width: None,
            max_width: None,
            min_height: None,
            max_height: None,
            fuzzy_match: true,
            limit: 0,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ElementQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_application(mut self, app: impl Into<String>) -> Self {
        self.application = Some(app.into());
        self
    }

    pub fn with_identifier(mut self, id: impl Into<String>) -> Self {
        self.identifier = Some(id.into());
        self
    }

    pub fn with_sibling_index(mut self, index: usize) -> Self {
        self.sibling_index = Some(index);
        self
    }

    pub fn with_parent_role(mut self, role: impl Into<String>) -> Self {
        self.parent_role = Some(role.into());
        self
    }

    pub fn with_width_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min_width = min;
        self.max_width = max;
        self
    }

    pub fn with_height_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min_height = min;
        self.max_height = max;
        self
    }

    /// Require exact text containment instead of subsequence matching.
    pub fn exact(mut self) -> Self {
        self.fuzzy_match = false;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// True when no predicate is set.
    pub fn is_unconstrained(&self) -> bool {
        self.text.is_none()
            && self.role.is_none()
            && self.identifier.is_none()
            && self.sibling_index.is_none()
            && self.parent_role.is_none()
            && self.min_width.is_none()
            && self.max_width.is_none()
            && self.min_height.is_none()
            && self.max_height.is_none()
    }

    /// Compact description for logs and `ElementNotFound` messages.
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(text) = &self.text {
            parts.push(format!("text=\"{}\"", text));
        }
        if let Some(role) = &self.role {
            parts.push(format!("role={}", role));
        }
        if let Some(app) = &self.application {
            parts.push(format!("app={}", app));
        }
        if let Some(id) = &self.identifier {
            parts.push(format!("id={}", id));
        }
        if let Some(index) = self.sibling_index {
            parts.push(format!("index={}", index));
        }
        if let Some(parent) = &self.parent_role {
            parts.push(format!("parent={}", parent));
        }
        if parts.is_empty() {
            parts.push("<unconstrained>".to_string());
        }
        parts.join(" ")
    }
}
