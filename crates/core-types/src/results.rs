//! Typed results returned by top-level operations.

use serde::{Deserialize, Serialize};

use crate::element::Element;
use crate::geometry::Point;

/// Outcome of one query against the accessibility forest.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SearchResult {
    pub elements: Vec<Element>,

    /// Wall-clock duration of the search.
    pub duration_ms: u64,

    /// Total nodes visited, including non-matching ones.
    pub searched_count: usize,
}

/// Mechanism that brought (or failed to bring) an element on-screen.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ScrollMethod {
    #[serde(rename = "none")]
    None,
    #[serde(rename = "AXScrollToVisible")]
    AxScrollToVisible,
    #[serde(rename = "synthetic")]
    Synthetic,
    #[serde(rename = "failed")]
    Failed,
}

/// Outcome of a scroll-into-view attempt.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScrollIntoViewResult {
    pub success: bool,
    pub attempts: u32,
    pub final_position: Point,
    /// Accumulated content displacement across all iterations.
    pub scrolled_by: Point,
    pub method: ScrollMethod,
}
