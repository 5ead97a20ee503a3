//! Element resolution: forest traversal, query matching, and stable
//! references.
//!
//! The walker turns opaque host handles into populated [`Element`] values;
//! the engine filters the traversal stream against an [`ElementQuery`]; the
//! reference codec round-trips elements to compact `@…` strings so later
//! commands can re-target without repeating the search.
//!
//! [`Element`]: axdriver_core_types::Element
//! [`ElementQuery`]: axdriver_core_types::ElementQuery

pub mod engine;
pub mod matcher;
pub mod reference;
pub mod walker;

pub use engine::ElementEngine;
pub use matcher::{matches, normalize_role};
pub use reference::ElementReference;
pub use walker::{TreeWalker, VisitFlow};
