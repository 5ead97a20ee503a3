//! Adapter layer over the host accessibility and workspace APIs.
//!
//! The engine never talks to the platform directly; it goes through the
//! [`AxPort`] and [`WorkspacePort`] traits defined here. The macOS backend
//! implements them over `AXUIElement` and `NSWorkspace`; the [`fake`] module
//! provides an in-memory tree with the same contract for tests.

pub mod convert;
pub mod fake;
pub mod ports;

#[cfg(target_os = "macos")]
pub mod macos;

pub use ports::{action, attr, role, AxPort, WorkspacePort};

#[cfg(target_os = "macos")]
pub use macos::{MacAxPort, MacWorkspace};
