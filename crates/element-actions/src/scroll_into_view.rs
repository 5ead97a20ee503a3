//! Bringing an element on-screen with the least intrusive mechanism.
//!
//! Order of preference: nothing (already visible), the element's native
//! scroll-to-visible action, then synthetic wheel events against the
//! nearest scroll container with position re-query between iterations.

use std::time::{Duration, Instant};

use tracing::{debug, info, instrument};

use ax_adapter::action;
use axdriver_core_types::{
    DriverError, Element, Point, ScrollIntoViewResult, ScrollMethod, VisibilityReason,
};

use crate::actions::{node_of, Actions};
use crate::model::ExecCtx;
use crate::requery;

/// Deltas below this are not worth posting.
const MIN_STEP_PX: f64 = 5.0;

/// Margin kept off the per-iteration delta cap to avoid overshoot.
const CAP_MARGIN_PX: f64 = 100.0;

fn fully_visible(element: &Element) -> bool {
    element.has_size()
        && element
            .visibility
            .map(|v| v.reason == VisibilityReason::FullyVisible)
            .unwrap_or(false)
}

#[instrument(skip_all, fields(action = %ctx.action_id.0, target = %element.describe()))]
pub(crate) async fn execute(
    actions: &Actions,
    ctx: &ExecCtx,
    element: &Element,
) -> Result<ScrollIntoViewResult, DriverError> {
    let started = Instant::now();
    let hard_timeout = Duration::from_millis(actions.timing.scroll_hard_timeout_ms);

    let mut current = element.clone();
    actions.engine.analyzer().annotate(&mut current);
    let origin = current.position;

    if fully_visible(&current) {
        return Ok(ScrollIntoViewResult {
            success: true,
            attempts: 0,
            final_position: current.position,
            scrolled_by: Point::new(0.0, 0.0),
            method: ScrollMethod::None,
        });
    }

    // Native path: ask the owning view to scroll itself.
    if let Ok(node) = node_of(&current) {
        let advertised = actions
            .ax
            .action_names(&node)
            .iter()
            .any(|name| name == action::SCROLL_TO_VISIBLE);
        if advertised
            && actions
                .ax
                .perform_action(&node, action::SCROLL_TO_VISIBLE)
                .is_ok()
        {
            actions.sleep_ms(ctx, actions.timing.scroll_settle_ms).await?;
            if let Some(fresh) =
                requery::find_again(&actions.engine, actions.workspace.as_ref(), &current)?
            {
                if fully_visible(&fresh) {
                    info!("native scroll-to-visible succeeded");
                    return Ok(ScrollIntoViewResult {
                        success: true,
                        attempts: 1,
                        final_position: fresh.position,
                        scrolled_by: Point::new(
                            origin.x - fresh.position.x,
                            origin.y - fresh.position.y,
                        ),
                        method: ScrollMethod::AxScrollToVisible,
                    });
                }
                current = fresh;
            }
            debug!("native scroll-to-visible did not verify, going synthetic");
        }
    }

    // Synthetic path: wheel events against the scroll-bar host.
    let container = actions
        .engine
        .analyzer()
        .scroll_container_of(&current)
        .ok_or(DriverError::NoScrollContainer)?;
    let viewport = container.frame;

    let pointer = viewport.center();
    actions.input.mouse_move(pointer)?;
    *actions.pointer.lock() = pointer;

    let mut scrolled_by = Point::new(0.0, 0.0);
    let max_attempts = actions.timing.scroll_max_attempts;
    for attempt in 1..=max_attempts {
        if started.elapsed() >= hard_timeout {
            return Err(DriverError::HardTimeout {
                elapsed_ms: started.elapsed().as_millis() as u64,
            });
        }
        actions.check_ctx(ctx)?;

        let center = current.center();
        let target = viewport.center();
        let cap_x = (viewport.width - CAP_MARGIN_PX).max(MIN_STEP_PX);
        let cap_y = (viewport.height - CAP_MARGIN_PX).max(MIN_STEP_PX);
        let dx = (center.x - target.x).clamp(-cap_x, cap_x);
        let dy = (center.y - target.y).clamp(-cap_y, cap_y);

        if dx.abs() < MIN_STEP_PX && dy.abs() < MIN_STEP_PX {
            // Nothing meaningful left to post and the target still is not
            // fully visible.
            return Err(DriverError::NoProgress);
        }

        // Natural-scrolling wheel: emit the opposite sign of the desired
        // content delta.
        actions.input.scroll(-dy, -dx)?;
        scrolled_by = Point::new(scrolled_by.x + dx, scrolled_by.y + dy);
        debug!(attempt, dx, dy, "posted synthetic scroll");

        actions.sleep_ms(ctx, actions.timing.scroll_settle_ms).await?;

        current = requery::find_again(&actions.engine, actions.workspace.as_ref(), &current)?
            .ok_or(DriverError::NoProgress)?;
        if fully_visible(&current) {
            info!(attempt, "synthetic scroll reached target");
            return Ok(ScrollIntoViewResult {
                success: true,
                attempts: attempt,
                final_position: current.position,
                scrolled_by,
                method: ScrollMethod::Synthetic,
            });
        }
    }

    Err(DriverError::MaxScrollAttemptsExceeded {
        attempts: max_attempts,
    })
}
