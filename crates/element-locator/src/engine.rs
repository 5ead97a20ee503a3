//! Query engine: filters the traversal stream and annotates results.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, instrument};

use ax_adapter::{AxPort, WorkspacePort};
use axdriver_core_types::{DriverError, Element, ElementQuery, NodeRef, SearchResult};
use perceiver_viewport::ViewportAnalyzer;

use crate::matcher::{self, normalize_query};
use crate::reference::ElementReference;
use crate::walker::{TreeWalker, VisitFlow};

/// Resolves element queries against the accessibility forest.
pub struct ElementEngine {
    walker: TreeWalker,
    analyzer: ViewportAnalyzer,
}

impl ElementEngine {
    pub fn new(ax: Arc<dyn AxPort>, workspace: Arc<dyn WorkspacePort>) -> Self {
        Self {
            walker: TreeWalker::new(ax.clone(), workspace.clone()),
            analyzer: ViewportAnalyzer::new(ax, workspace),
        }
    }

    pub fn walker(&self) -> &TreeWalker {
        &self.walker
    }

    pub fn analyzer(&self) -> &ViewportAnalyzer {
        &self.analyzer
    }

    /// Run a query across its application scope (or the whole forest).
    ///
    /// The result carries every matched element, annotated with viewport
    /// state and a stable reference, plus the wall-clock duration and the
    /// total count of nodes visited.
    #[instrument(skip(self, query), fields(query = %query.describe()))]
    pub fn find(&self, query: &ElementQuery) -> Result<SearchResult, DriverError> {
        let started = Instant::now();
        let query = normalize_query(query);

        let roots: Vec<NodeRef> = match &query.application {
            Some(name) => match self.walker.application_element(name)? {
                Some(root) => vec![root],
                // Unknown application scope: empty result, not an error.
                None => {
                    return Ok(SearchResult {
                        elements: Vec::new(),
                        duration_ms: elapsed_ms(started),
                        searched_count: 0,
                    });
                }
            },
            None => self
                .walker
                .all_application_elements()?
                .into_iter()
                .map(|(_, root)| root)
                .collect(),
        };

        let mut matches: Vec<Element> = Vec::new();
        let mut searched_count = 0usize;
        for root in roots {
            let visited = self.walker.traverse(&root, query.max_depth, &mut |element| {
                if matcher::matches(element, &query) {
                    matches.push(element.clone());
                    if query.limit > 0 && matches.len() >= query.limit {
                        return VisitFlow::Stop;
                    }
                }
                VisitFlow::Continue
            })?;
            searched_count += visited;
            if query.limit > 0 && matches.len() >= query.limit {
                break;
            }
        }

        self.analyzer.annotate_all(&mut matches);
        for element in &mut matches {
            element.reference = Some(ElementReference::for_element(element).to_string());
        }

        let result = SearchResult {
            elements: matches,
            duration_ms: elapsed_ms(started),
            searched_count,
        };
        info!(
            matched = result.elements.len(),
            searched = result.searched_count,
            duration_ms = result.duration_ms,
            "query finished"
        );
        Ok(result)
    }

    /// First match, or [`DriverError::ElementNotFound`] naming the query.
    pub fn find_first(&self, query: &ElementQuery) -> Result<Element, DriverError> {
        let mut result = self.find(query)?;
        if result.elements.is_empty() {
            debug!(searched = result.searched_count, "no match");
            return Err(DriverError::ElementNotFound(query.describe()));
        }
        Ok(result.elements.remove(0))
    }

    /// Decode a `@…` reference and run the resulting query.
    pub fn find_by_reference(&self, reference: &str) -> Result<Element, DriverError> {
        let decoded: ElementReference = reference.parse()?;
        let query = decoded.to_query();
        let mut result = self.find(&query)?;
        if let Some((x, y)) = decoded.grid_point() {
            // Positional references pick the candidate nearest the lattice
            // point rather than the first in traversal order.
            result
                .elements
                .sort_by(|a, b| {
                    let da = (a.position.x - x).hypot(a.position.y - y);
                    let db = (b.position.x - x).hypot(b.position.y - y);
                    da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
                });
        }
        result
            .elements
            .into_iter()
            .next()
            .ok_or_else(|| DriverError::ElementNotFound(format!("reference {}", reference)))
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
