//! Unified error taxonomy for the element engine.
//!
//! Every core component surfaces these variants unchanged; the action layer
//! retries only within declared budgets and otherwise passes the error to
//! the caller with its message intact.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The two host permissions the engine observes.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum PermissionGrant {
    Accessibility,
    ScreenRecording,
}

impl PermissionGrant {
    /// Host settings path callers can surface as a recovery hint.
    pub fn settings_path(&self) -> &'static str {
        match self {
            PermissionGrant::Accessibility => {
                "System Settings > Privacy & Security > Accessibility"
            }
            PermissionGrant::ScreenRecording => {
                "System Settings > Privacy & Security > Screen Recording"
            }
        }
    }
}

impl std::fmt::Display for PermissionGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PermissionGrant::Accessibility => write!(f, "accessibility"),
            PermissionGrant::ScreenRecording => write!(f, "screen recording"),
        }
    }
}

/// Driver-wide error type.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DriverError {
    /// A required host permission is missing.
    #[error("{grant} permission not granted; enable this process under {}", .grant.settings_path())]
    PermissionDenied { grant: PermissionGrant },

    /// The host refused to create or post an input event.
    #[error("failed to create input event")]
    EventCreationFailed,

    /// A coordinate precondition failed (NaN or off every display).
    #[error("invalid coordinates ({x}, {y})")]
    InvalidCoordinates { x: f64, y: f64 },

    /// A raw virtual keycode outside the valid range was requested.
    #[error("invalid key code {0}")]
    InvalidKeyCode(u16),

    /// A character has no entry in the key map and no Unicode fallback.
    #[error("no key mapping for character {0:?}")]
    UnmappableCharacter(char),

    /// The query matched nothing.
    #[error("no element matched query: {0}")]
    ElementNotFound(String),

    /// The element exists but has zero size.
    #[error("element not visible: {0}")]
    ElementNotVisible(String),

    /// The host rejected a perform-action or set-attribute call.
    #[error("action '{action}' failed with code {code}")]
    ActionFailed { action: String, code: i32 },

    /// A required attribute could not be read.
    #[error("failed to read attribute '{0}'")]
    ReadFailed(String),

    /// The element is off-screen and no scrollable ancestor exists.
    #[error("element is not visible and has no scroll container")]
    NoScrollContainer,

    /// Scroll progress was being made but the target was not reached.
    #[error("scroll target not reached after {attempts} attempts")]
    MaxScrollAttemptsExceeded { attempts: u32 },

    /// The element disappeared from the tree between scroll iterations.
    #[error("element no longer present; no scroll progress possible")]
    NoProgress,

    /// A multi-step operation crossed its wall-clock ceiling.
    #[error("operation timed out after {elapsed_ms} ms")]
    HardTimeout { elapsed_ms: u64 },

    /// The screen-capture collaborator could not produce an image.
    #[error("capture failed: {0}")]
    CaptureFailed(String),

    /// No application with this name is installed or resolvable.
    #[error("application not found: {0}")]
    AppNotFound(String),

    /// The application exists but has no running process.
    #[error("application not running: {0}")]
    AppNotRunning(String),

    /// No window matched the request.
    #[error("window not found: {0}")]
    WindowNotFound(String),
}

impl DriverError {
    /// Whether the action layer may retry inside a declared budget.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DriverError::ElementNotVisible(_)
                | DriverError::ReadFailed(_)
                | DriverError::ActionFailed { .. }
        )
    }

    /// Coarse severity (0 = benign precondition, 3 = environment broken).
    pub fn severity(&self) -> u8 {
        match self {
            DriverError::PermissionDenied { .. } | DriverError::EventCreationFailed => 3,
            DriverError::HardTimeout { .. } | DriverError::CaptureFailed(_) => 2,
            DriverError::ElementNotFound(_)
            | DriverError::NoProgress
            | DriverError::MaxScrollAttemptsExceeded { .. }
            | DriverError::NoScrollContainer => 1,
            _ => 0,
        }
    }
}
