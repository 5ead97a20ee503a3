//! Shared value model for the axdriver element engine.
//!
//! Everything the engine hands to callers lives here: geometry, the
//! [`Element`] snapshot, queries, annotations, results, and the unified
//! [`DriverError`] taxonomy. The crate has no platform dependencies so the
//! value surface stays constructible in any test environment.

pub mod element;
pub mod errors;
pub mod geometry;
pub mod query;
pub mod results;
pub mod visibility;

pub use element::{ActionId, Element, NodeHandle, NodeRef, RunningApp};
pub use errors::{DriverError, PermissionGrant};
pub use geometry::{Point, Rect, Size};
pub use query::ElementQuery;
pub use results::{ScrollIntoViewResult, ScrollMethod, SearchResult};
pub use visibility::{
    ScrollContainerInfo, ScrollDelta, ScrollDirection, VisibilityInfo, VisibilityReason,
};
