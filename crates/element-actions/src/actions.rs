//! Action runtime composing the lower layers.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use parking_lot::Mutex;
use rand::Rng;
use tracing::{debug, info, instrument};

use ax_adapter::{attr, AxPort, WorkspacePort};
use axdriver_core_types::{
    DriverError, Element, NodeRef, Point, Rect, ScrollDirection, ScrollIntoViewResult,
};
use element_locator::ElementEngine;
use humanize::{plan_motion, MotionProfile};
use input_dispatch::{keymap, InputDispatcher, Modifiers, MouseButton};
use perceiver_viewport::container;

use crate::model::{
    ActionTiming, ClickOptions, ClickReport, DragMode, DragReport, ExecCtx, ScrollOptions,
    ScrollReport, TypeMethod, TypeReport,
};
use crate::ports::{CaptureImage, CapturePort, TrailSink};
use crate::{requery, scroll_into_view};

/// Elements older than this are re-queried before acting on them.
const STALE_AFTER: Duration = Duration::from_millis(300);

/// The user-visible action surface over one accessibility forest.
pub struct Actions {
    pub(crate) engine: ElementEngine,
    pub(crate) ax: Arc<dyn AxPort>,
    pub(crate) workspace: Arc<dyn WorkspacePort>,
    pub(crate) input: Arc<dyn InputDispatcher>,
    pub(crate) motion: MotionProfile,
    pub(crate) timing: ActionTiming,
    pub(crate) trail: Option<Arc<dyn TrailSink>>,
    capture_port: Option<Arc<dyn CapturePort>>,
    /// Last pointer position this runtime moved to; trajectory planning
    /// starts here.
    pub(crate) pointer: Mutex<Point>,
}

impl Actions {
    pub fn new(
        ax: Arc<dyn AxPort>,
        workspace: Arc<dyn WorkspacePort>,
        input: Arc<dyn InputDispatcher>,
    ) -> Self {
        Self {
            engine: ElementEngine::new(ax.clone(), workspace.clone()),
            ax,
            workspace,
            input,
            motion: MotionProfile::default(),
            timing: ActionTiming::default(),
            trail: None,
            capture_port: None,
            pointer: Mutex::new(Point::new(0.0, 0.0)),
        }
    }

    pub fn with_motion(mut self, motion: MotionProfile) -> Self {
        self.motion = motion;
        self
    }

    pub fn with_timing(mut self, timing: ActionTiming) -> Self {
        self.timing = timing;
        self
    }

    pub fn with_trail(mut self, trail: Arc<dyn TrailSink>) -> Self {
        self.trail = Some(trail);
        self
    }

    pub fn with_capture(mut self, capture: Arc<dyn CapturePort>) -> Self {
        self.capture_port = Some(capture);
        self
    }

    pub fn engine(&self) -> &ElementEngine {
        &self.engine
    }

    /// Click the element's center with a realistic press dwell.
    #[instrument(skip_all, fields(action = %ctx.action_id.0, target = %element.describe()))]
    pub async fn click(
        &self,
        ctx: &ExecCtx,
        element: &Element,
        opt: ClickOptions,
    ) -> Result<ClickReport, DriverError> {
        let started_at = Utc::now();
        let started = Instant::now();
        let mut element = element.clone();
        let mut scrolled = None;

        // Snapshots go stale fast; refresh coordinates before trusting them.
        let stale = element
            .captured_at
            .map(|at| at.elapsed() > STALE_AFTER)
            .unwrap_or(false);
        if stale {
            if let Some(fresh) =
                requery::find_again(&self.engine, self.workspace.as_ref(), &element)?
            {
                element = fresh;
            }
        }

        let off_screen = !element.has_size()
            || element
                .visibility
                .map(|v| !v.in_viewport)
                .unwrap_or(false);
        if off_screen {
            if opt.auto_scroll {
                let outcome = self.scroll_to_element(ctx, &element).await?;
                element = requery::find_again(&self.engine, self.workspace.as_ref(), &element)?
                    .ok_or_else(|| {
                        DriverError::ElementNotFound(format!(
                            "lost after scroll: {}",
                            element.describe()
                        ))
                    })?;
                scrolled = Some(outcome);
            } else if !element.has_size() {
                return Err(DriverError::ElementNotVisible(element.describe()));
            }
        }
        if !element.has_size() {
            return Err(DriverError::ElementNotVisible(element.describe()));
        }

        self.activate_owner(ctx, &element).await?;

        let target = element.center();
        self.move_pointer(ctx, target, element.size.width, opt.humanize)
            .await?;

        self.input.mouse_down(target, opt.button)?;
        self.sleep_range(ctx, self.timing.click_dwell_ms).await?;
        self.input.mouse_up(target, opt.button)?;

        info!(x = target.x, y = target.y, "click delivered");
        Ok(ClickReport {
            started_at,
            point: target,
            scrolled,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Type text into the element: click to focus, try a direct value set,
    /// fall back to keystroke injection.
    #[instrument(skip_all, fields(action = %ctx.action_id.0, chars = text.chars().count()))]
    pub async fn type_text(
        &self,
        ctx: &ExecCtx,
        element: &Element,
        text: &str,
    ) -> Result<TypeReport, DriverError> {
        let started_at = Utc::now();
        let started = Instant::now();
        let node = node_of(element)?;

        self.click(ctx, element, ClickOptions::default()).await?;
        self.ax.set_focused(&node, true)?;
        self.sleep_ms(ctx, self.timing.focus_settle_ms).await?;

        if self.ax.set_string_attribute(&node, attr::VALUE, text).is_ok() {
            self.sleep_ms(ctx, self.timing.value_verify_delay_ms).await?;
            if self.ax.string_attribute(&node, attr::VALUE).as_deref() == Some(text) {
                debug!("value attribute set verified");
                return Ok(TypeReport {
                    started_at,
                    method: TypeMethod::ValueSet,
                    characters: text.chars().count(),
                    duration_ms: started.elapsed().as_millis() as u64,
                });
            }
        }
        debug!("value set not observed, falling back to keystrokes");

        for ch in text.chars() {
            self.check_ctx(ctx)?;
            match keymap::lookup_key(ch) {
                Some(stroke) => {
                    let modifiers = if stroke.shift {
                        Modifiers::SHIFT
                    } else {
                        Modifiers::empty()
                    };
                    self.input.key_down(stroke.keycode, modifiers)?;
                    self.sleep_range(ctx, self.timing.key_press_ms).await?;
                    self.input.key_up(stroke.keycode, modifiers)?;
                }
                None => {
                    // Outside the key map: post the character as a Unicode
                    // payload instead of a virtual keycode.
                    let mut buf = [0u8; 4];
                    self.input.key_unicode(ch.encode_utf8(&mut buf))?;
                }
            }
            self.sleep_range(ctx, self.timing.key_gap_ms).await?;
        }

        Ok(TypeReport {
            started_at,
            method: TypeMethod::Keystrokes,
            characters: text.chars().count(),
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// First present of: live value, live title, live description, snapshot
    /// label.
    pub fn read(&self, element: &Element) -> Option<String> {
        if let Some(node) = &element.node {
            for attribute in [attr::VALUE, attr::TITLE, attr::DESCRIPTION] {
                if let Some(text) = self.ax.string_attribute(node, attribute) {
                    return Some(text);
                }
            }
        }
        element.label().map(str::to_string)
    }

    /// Capture the element's frame via the screen-capture collaborator.
    pub async fn capture(
        &self,
        _ctx: &ExecCtx,
        element: &Element,
    ) -> Result<CaptureImage, DriverError> {
        if !element.has_size() {
            return Err(DriverError::ElementNotVisible(element.describe()));
        }
        let port = self
            .capture_port
            .as_ref()
            .ok_or_else(|| DriverError::CaptureFailed("no capture collaborator".into()))?;
        port.capture_region(element.frame()).await
    }

    /// Pass-through to the host's perform-action primitive (press,
    /// show-menu, ...).
    pub fn perform(&self, element: &Element, action_name: &str) -> Result<(), DriverError> {
        let node = node_of(element)?;
        self.ax.perform_action(&node, action_name)
    }

    /// Drag from `from` to `to` with the given delivery mode.
    #[instrument(skip_all, fields(action = %ctx.action_id.0))]
    pub async fn drag(
        &self,
        ctx: &ExecCtx,
        from: Point,
        to: Point,
        button: MouseButton,
        mode: DragMode,
    ) -> Result<DragReport, DriverError> {
        let started_at = Utc::now();
        let started = Instant::now();

        self.input.mouse_move(from)?;
        *self.pointer.lock() = from;
        self.input.mouse_down(from, button)?;
        self.sleep_ms(ctx, self.timing.drag_hold_ms).await?;

        let steps = match mode {
            DragMode::Direct => {
                self.input.mouse_drag(to, button)?;
                1
            }
            DragMode::Interpolated { duration } => {
                let count = ((duration.as_secs_f64() * self.timing.drag_rate_hz as f64) as usize)
                    .max(1);
                let origin = tokio::time::Instant::now();
                let step = duration / count as u32;
                for i in 1..=count {
                    self.check_ctx(ctx)?;
                    // Anchored to the start instant so sleep drift does not
                    // accumulate across steps.
                    tokio::time::sleep_until(origin + step * i as u32).await;
                    let t = i as f64 / count as f64;
                    self.input.mouse_drag(
                        Point::new(from.x + (to.x - from.x) * t, from.y + (to.y - from.y) * t),
                        button,
                    )?;
                }
                count
            }
            DragMode::Humanized => {
                let plan = plan_motion(from, to, 16.0, &self.motion);
                for step in &plan {
                    self.check_ctx(ctx)?;
                    tokio::time::sleep(step.delay).await;
                    self.input.mouse_drag(step.point, button)?;
                }
                plan.len()
            }
        };

        self.input.mouse_up(to, button)?;
        *self.pointer.lock() = to;
        Ok(DragReport {
            started_at,
            steps,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// "Scroll here": move the pointer to `point` and post one wheel event
    /// sized in pages of the enclosing viewport.
    pub async fn scroll_at(
        &self,
        ctx: &ExecCtx,
        point: Point,
        opt: ScrollOptions,
    ) -> Result<ScrollReport, DriverError> {
        let started_at = Utc::now();
        let started = Instant::now();
        self.check_ctx(ctx)?;

        self.input.mouse_move(point)?;
        *self.pointer.lock() = point;

        let viewport = self.viewport_at(point);
        let report = self.post_page_scroll(viewport, opt)?;
        Ok(ScrollReport {
            started_at,
            duration_ms: started.elapsed().as_millis() as u64,
            ..report
        })
    }

    /// "Scroll here" anchored to a named element: the pointer moves to the
    /// center of the element's scrollable ancestor.
    pub async fn scroll_at_element(
        &self,
        ctx: &ExecCtx,
        element: &Element,
        opt: ScrollOptions,
    ) -> Result<ScrollReport, DriverError> {
        let started_at = Utc::now();
        let started = Instant::now();
        self.check_ctx(ctx)?;

        let found = self
            .engine
            .analyzer()
            .scroll_container_of(element)
            .ok_or(DriverError::NoScrollContainer)?;
        let center = found.frame.center();
        self.input.mouse_move(center)?;
        *self.pointer.lock() = center;

        let report = self.post_page_scroll(found.frame, opt)?;
        Ok(ScrollReport {
            started_at,
            duration_ms: started.elapsed().as_millis() as u64,
            ..report
        })
    }

    /// Bring the element fully on-screen (see [`crate::scroll_into_view`]).
    pub async fn scroll_to_element(
        &self,
        ctx: &ExecCtx,
        element: &Element,
    ) -> Result<ScrollIntoViewResult, DriverError> {
        scroll_into_view::execute(self, ctx, element).await
    }

    fn post_page_scroll(&self, viewport: Rect, opt: ScrollOptions) -> Result<ScrollReport, DriverError> {
        let extent = match opt.direction {
            ScrollDirection::Up | ScrollDirection::Down => viewport.height,
            ScrollDirection::Left | ScrollDirection::Right => viewport.width,
        };
        let pixels = 0.9 * extent * opt.pages;
        // Natural-scrolling sign: scrolling "down" means content moves up.
        let (wheel_y, wheel_x) = match opt.direction {
            ScrollDirection::Down => (-pixels, 0.0),
            ScrollDirection::Up => (pixels, 0.0),
            ScrollDirection::Right => (0.0, -pixels),
            ScrollDirection::Left => (0.0, pixels),
        };
        self.input.scroll(wheel_y, wheel_x)?;
        Ok(ScrollReport {
            started_at: Utc::now(),
            direction: opt.direction,
            amount: pixels,
            duration_ms: 0,
        })
    }

    /// Viewport for a free point: the window under it, else the display.
    fn viewport_at(&self, point: Point) -> Rect {
        if let Some(node) = self.ax.element_at(point.x, point.y) {
            // The hit node may be the window itself.
            if self.ax.string_attribute(&node, attr::ROLE).as_deref() == Some(ax_adapter::role::WINDOW)
            {
                if let (Some(origin), Some(size)) = (
                    self.ax.point_attribute(&node, attr::POSITION),
                    self.ax.size_attribute(&node, attr::SIZE),
                ) {
                    return Rect::from_origin_size(origin, size);
                }
            }
            if let Some(window) = container::enclosing_window(self.ax.as_ref(), &node) {
                return window;
            }
        }
        self.workspace
            .primary_display_frame()
            .unwrap_or(Rect::new(0.0, 0.0, 1280.0, 800.0))
    }

    pub(crate) async fn activate_owner(
        &self,
        ctx: &ExecCtx,
        element: &Element,
    ) -> Result<(), DriverError> {
        if let Some(pid) = element.pid {
            self.workspace.activate(pid)?;
            self.sleep_ms(ctx, self.timing.activate_settle_ms).await?;
        }
        Ok(())
    }

    /// Move the pointer, humanized or warped. Returns the step count.
    pub(crate) async fn move_pointer(
        &self,
        ctx: &ExecCtx,
        to: Point,
        target_width: f64,
        humanize: bool,
    ) -> Result<usize, DriverError> {
        let from = *self.pointer.lock();
        let steps = if humanize {
            let plan = plan_motion(from, to, target_width.max(1.0), &self.motion);
            for step in &plan {
                self.check_ctx(ctx)?;
                tokio::time::sleep(step.delay).await;
                self.input.mouse_move(step.point)?;
                if let Some(trail) = &self.trail {
                    trail.push(step.point).await;
                }
            }
            plan.len()
        } else {
            self.input.mouse_move(to)?;
            1
        };
        *self.pointer.lock() = to;
        Ok(steps)
    }

    pub(crate) fn check_ctx(&self, ctx: &ExecCtx) -> Result<(), DriverError> {
        if ctx.is_cancelled() || ctx.is_timeout() {
            return Err(DriverError::HardTimeout {
                elapsed_ms: ctx.elapsed_ms(),
            });
        }
        Ok(())
    }

    pub(crate) async fn sleep_ms(&self, ctx: &ExecCtx, ms: u64) -> Result<(), DriverError> {
        self.check_ctx(ctx)?;
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok(())
    }

    pub(crate) async fn sleep_range(
        &self,
        ctx: &ExecCtx,
        (lo, hi): (u64, u64),
    ) -> Result<(), DriverError> {
        let ms = rand::thread_rng().gen_range(lo..=hi);
        self.sleep_ms(ctx, ms).await
    }
}

pub(crate) fn node_of(element: &Element) -> Result<NodeRef, DriverError> {
    element
        .node
        .clone()
        .ok_or_else(|| DriverError::ElementNotFound(format!("stale element {}", element.describe())))
}
