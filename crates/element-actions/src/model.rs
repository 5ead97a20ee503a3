//! Execution context, options, timing configuration, and action reports.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use axdriver_core_types::{ActionId, Point, ScrollDirection, ScrollIntoViewResult};
use input_dispatch::MouseButton;

/// Execution context delivered with every action.
#[derive(Clone, Debug)]
pub struct ExecCtx {
    pub action_id: ActionId,
    pub started: Instant,
    pub deadline: Instant,
    pub cancel: CancellationToken,
}

impl ExecCtx {
    pub fn new(deadline: Instant, cancel: CancellationToken) -> Self {
        Self {
            action_id: ActionId::new(),
            started: Instant::now(),
            deadline,
            cancel,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new(Instant::now() + timeout, CancellationToken::new())
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn is_timeout(&self) -> bool {
        Instant::now() >= self.deadline
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }
}

impl Default for ExecCtx {
    fn default() -> Self {
        Self::with_timeout(Duration::from_secs(30))
    }
}

/// Delay and budget tunables for the action layer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActionTiming {
    /// Settle after activating the owning application.
    #[serde(default = "ActionTiming::default_activate_settle_ms")]
    pub activate_settle_ms: u64,

    /// Settle after requesting keyboard focus.
    #[serde(default = "ActionTiming::default_focus_settle_ms")]
    pub focus_settle_ms: u64,

    /// Wait before reading a value back after a direct set.
    #[serde(default = "ActionTiming::default_value_verify_delay_ms")]
    pub value_verify_delay_ms: u64,

    /// Key-down to key-up spacing, sampled uniformly.
    #[serde(default = "ActionTiming::default_key_press_ms")]
    pub key_press_ms: (u64, u64),

    /// Spacing between consecutive key presses.
    #[serde(default = "ActionTiming::default_key_gap_ms")]
    pub key_gap_ms: (u64, u64),

    /// Button-down dwell before button-up.
    #[serde(default = "ActionTiming::default_click_dwell_ms")]
    pub click_dwell_ms: (u64, u64),

    /// Settle after each posted scroll event.
    #[serde(default = "ActionTiming::default_scroll_settle_ms")]
    pub scroll_settle_ms: u64,

    #[serde(default = "ActionTiming::default_scroll_max_attempts")]
    pub scroll_max_attempts: u32,

    /// Wall-clock ceiling on a scroll-into-view operation.
    #[serde(default = "ActionTiming::default_scroll_hard_timeout_ms")]
    pub scroll_hard_timeout_ms: u64,

    /// Hold after button-down before the first drag event.
    #[serde(default = "ActionTiming::default_drag_hold_ms")]
    pub drag_hold_ms: u64,

    /// Interpolated-drag event rate.
    #[serde(default = "ActionTiming::default_drag_rate_hz")]
    pub drag_rate_hz: u32,
}

impl ActionTiming {
    fn default_activate_settle_ms() -> u64 {
        50
    }
    fn default_focus_settle_ms() -> u64 {
        200
    }
    fn default_value_verify_delay_ms() -> u64 {
        50
    }
    fn default_key_press_ms() -> (u64, u64) {
        (20, 60)
    }
    fn default_key_gap_ms() -> (u64, u64) {
        (30, 80)
    }
    fn default_click_dwell_ms() -> (u64, u64) {
        (50, 150)
    }
    fn default_scroll_settle_ms() -> u64 {
        100
    }
    fn default_scroll_max_attempts() -> u32 {
        8
    }
    fn default_scroll_hard_timeout_ms() -> u64 {
        10_000
    }
    fn default_drag_hold_ms() -> u64 {
        50
    }
    fn default_drag_rate_hz() -> u32 {
        60
    }
}

impl Default for ActionTiming {
    fn default() -> Self {
        Self {
            activate_settle_ms: Self::default_activate_settle_ms(),
            focus_settle_ms: Self::default_focus_settle_ms(),
            value_verify_delay_ms: Self::default_value_verify_delay_ms(),
            key_press_ms: Self::default_key_press_ms(),
            key_gap_ms: Self::default_key_gap_ms(),
            click_dwell_ms: Self::default_click_dwell_ms(),
            scroll_settle_ms: Self::default_scroll_settle_ms(),
            scroll_max_attempts: Self::default_scroll_max_attempts(),
            scroll_hard_timeout_ms: Self::default_scroll_hard_timeout_ms(),
            drag_hold_ms: Self::default_drag_hold_ms(),
            drag_rate_hz: Self::default_drag_rate_hz(),
        }
    }
}

/// Per-click tweaks.
#[derive(Clone, Copy, Debug)]
pub struct ClickOptions {
    pub button: MouseButton,
    /// Humanized trajectory instead of a direct warp.
    pub humanize: bool,
    /// Bring off-screen targets into view before clicking.
    pub auto_scroll: bool,
}

impl Default for ClickOptions {
    fn default() -> Self {
        Self {
            button: MouseButton::Left,
            humanize: true,
            auto_scroll: true,
        }
    }
}

/// Drag delivery mode.
#[derive(Clone, Copy, Debug)]
pub enum DragMode {
    /// One drag event straight to the destination.
    Direct,
    /// Linearly interpolated drag events over the given duration.
    Interpolated { duration: Duration },
    /// Drag events along a humanized trajectory.
    Humanized,
}

/// "Scroll here" parameters.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ScrollOptions {
    pub direction: ScrollDirection,
    /// Pages of the effective viewport to scroll (0.9 viewport extents per
    /// page).
    pub pages: f64,
}

impl Default for ScrollOptions {
    fn default() -> Self {
        Self {
            direction: ScrollDirection::Down,
            pages: 1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ClickReport {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub started_at: DateTime<Utc>,
    /// Where the button events were posted.
    pub point: Point,
    /// Present when auto-scroll ran first.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scrolled: Option<ScrollIntoViewResult>,
    pub duration_ms: u64,
}

/// How the text landed in the element.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeMethod {
    /// Direct value-attribute set, verified by read-back.
    ValueSet,
    /// Per-character keystroke injection.
    Keystrokes,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct TypeReport {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub started_at: DateTime<Utc>,
    pub method: TypeMethod,
    pub characters: usize,
    pub duration_ms: u64,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct DragReport {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub started_at: DateTime<Utc>,
    /// Drag events posted between down and up.
    pub steps: usize,
    pub duration_ms: u64,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ScrollReport {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub started_at: DateTime<Utc>,
    pub direction: ScrollDirection,
    /// Pixel units posted on the dominant wheel axis.
    pub amount: f64,
    pub duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ctx_timeout_observed() {
        let ctx = ExecCtx::with_timeout(Duration::from_millis(0));
        assert!(ctx.is_timeout());
        let ctx = ExecCtx::with_timeout(Duration::from_secs(5));
        assert!(!ctx.is_timeout());
        assert!(!ctx.is_cancelled());
    }

    #[test]
    fn timing_defaults_match_contract() {
        let t = ActionTiming::default();
        assert_eq!(t.focus_settle_ms, 200);
        assert_eq!(t.scroll_settle_ms, 100);
        assert_eq!(t.scroll_max_attempts, 8);
        assert_eq!(t.scroll_hard_timeout_ms, 10_000);
        assert_eq!(t.key_gap_ms, (30, 80));
        assert_eq!(t.click_dwell_ms, (50, 150));
    }
}
