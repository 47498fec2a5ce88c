//! Touch devices: a short vertical swipe or scroll right after selecting text
//! opens the popup.
//!
//! A window is armed by a selection and then either fires once, on the first
//! vertical displacement of at least [`TRIGGER_DISTANCE`] within
//! [`ARM_WINDOW`], or expires. Expiry is noticed lazily when the next event
//! arrives; there is no timer.

use shared::geometry::Point;
use std::time::{Duration, Instant};

/// Vertical displacement, in pixels, that fires an armed window.
pub const TRIGGER_DISTANCE: f64 = 22.0;
/// How long a window stays armed.
pub const ARM_WINDOW: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureWindow {
    pub armed_at: Instant,
    pub origin_scroll_y: f64,
    pub origin_touch_y: Option<f64>,
    /// Page point below the selection's midpoint, when it could be measured.
    pub anchor_point: Option<Point>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureOutcome {
    /// Nothing armed.
    Idle,
    /// Armed, not enough movement yet.
    Pending,
    /// The window fired and is consumed.
    Fired { anchor_point: Option<Point> },
    /// The window ran out and is consumed.
    Expired,
}

#[derive(Debug, Default)]
pub struct GestureArbiter {
    window: Option<GestureWindow>,
}

impl GestureArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_armed(&self) -> bool {
        self.window.is_some()
    }

    pub fn window(&self) -> Option<&GestureWindow> {
        self.window.as_ref()
    }

    /// Arm a fresh window, discarding any previous one.
    pub fn arm(&mut self, now: Instant, scroll_y: f64, anchor_point: Option<Point>) {
        self.window = Some(GestureWindow {
            armed_at: now,
            origin_scroll_y: scroll_y,
            origin_touch_y: None,
            anchor_point,
        });
    }

    /// Record where a touch began.
    pub fn on_touch_start(&mut self, touch_y: f64) {
        if let Some(window) = self.window.as_mut() {
            window.origin_touch_y = Some(touch_y);
        }
    }

    /// A finger moving up by `d` pixels counts as a displacement of `+d`.
    pub fn on_touch_move(&mut self, now: Instant, touch_y: f64) -> GestureOutcome {
        let Some(window) = self.window.as_mut() else {
            return GestureOutcome::Idle;
        };
        match window.origin_touch_y {
            Some(origin) => self.evaluate(now, origin - touch_y),
            None => {
                // The touch started before the window was armed.
                window.origin_touch_y = Some(touch_y);
                self.evaluate(now, 0.0)
            }
        }
    }

    pub fn on_scroll(&mut self, now: Instant, scroll_y: f64) -> GestureOutcome {
        let Some(window) = self.window.as_ref() else {
            return GestureOutcome::Idle;
        };
        let delta = scroll_y - window.origin_scroll_y;
        self.evaluate(now, delta)
    }

    fn evaluate(&mut self, now: Instant, delta: f64) -> GestureOutcome {
        let Some(window) = self.window else {
            return GestureOutcome::Idle;
        };
        if now.saturating_duration_since(window.armed_at) > ARM_WINDOW {
            tracing::debug!("gesture window expired");
            self.window = None;
            return GestureOutcome::Expired;
        }
        if delta.abs() < TRIGGER_DISTANCE {
            return GestureOutcome::Pending;
        }
        tracing::debug!(delta, "gesture window fired");
        self.window = None;
        GestureOutcome::Fired {
            anchor_point: window.anchor_point,
        }
    }
}
