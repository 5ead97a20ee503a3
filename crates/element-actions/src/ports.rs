//! Collaborator ports consumed by the action layer.
//!
//! Screen capture and the trail overlay live outside the core; both run on
//! their own loops and receive work through these async traits.

use async_trait::async_trait;

use axdriver_core_types::{DriverError, Point, Rect};

/// An image produced by the capture collaborator.
#[derive(Clone, Debug)]
pub struct CaptureImage {
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
}

/// Screen-capture collaborator. Requires the screen-recording grant.
#[async_trait]
pub trait CapturePort: Send + Sync {
    async fn capture_region(&self, region: Rect) -> Result<CaptureImage, DriverError>;
}

/// Trail overlay sink; points are posted asynchronously so no core state is
/// shared with UI code.
#[async_trait]
pub trait TrailSink: Send + Sync {
    async fn push(&self, point: Point);
}
