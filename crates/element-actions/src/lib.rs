//! The element action layer.
//!
//! Composes the walker, query engine, viewport analyzer, movement
//! generator, and input dispatcher into the user-visible actions: click,
//! type, read, capture, perform, drag, and the two scroll surfaces
//! ("scroll here" and "scroll to element"). Every multi-step operation
//! honors a deadline and a cancellation token; suspension happens only on
//! explicit sleeps between steps.

pub mod actions;
pub mod model;
pub mod ports;
pub mod requery;
pub mod scroll_into_view;

pub use actions::Actions;
pub use model::{
    ActionTiming, ClickOptions, ClickReport, DragMode, DragReport, ExecCtx, ScrollOptions,
    ScrollReport, TypeMethod, TypeReport,
};
pub use ports::{CaptureImage, CapturePort, TrailSink};
