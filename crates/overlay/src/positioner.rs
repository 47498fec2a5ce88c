//! Where the popup goes.
//!
//! Everything here is a pure function of an anchor, the popup size and the
//! viewport. Results are viewport coordinates for a fixed-position popup.

use providers::QueryKind;
use shared::geometry::{Point, Rect, Size, Viewport};

/// Space between the selection and the popup.
pub const ANCHOR_GAP: f64 = 10.0;
/// Margin kept around a popup placed at a manual point.
pub const MANUAL_PADDING: f64 = 8.0;
/// Share of the viewport width a popup may take.
pub const MAX_WIDTH_RATIO: f64 = 0.92;

/// Base width and minimum height of the popup for one kind of query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PopupMetrics {
    pub width: f64,
    pub min_height: f64,
}

impl PopupMetrics {
    pub const WORD: PopupMetrics = PopupMetrics {
        width: 400.0,
        min_height: 100.0,
    };
    pub const SENTENCE: PopupMetrics = PopupMetrics {
        width: 500.0,
        min_height: 150.0,
    };

    pub fn for_kind(kind: QueryKind) -> Self {
        match kind {
            QueryKind::Word => Self::WORD,
            QueryKind::Sentence => Self::SENTENCE,
        }
    }

    /// The popup box for `viewport_width`.
    pub fn size_in(&self, viewport_width: f64) -> Size {
        Size::new(popup_width(self.width, viewport_width), self.min_height)
    }
}

/// `min(base, floor(viewport_width * 0.92))`.
pub fn popup_width(base_width: f64, viewport_width: f64) -> f64 {
    base_width.min((viewport_width * MAX_WIDTH_RATIO).floor())
}

/// A selection rectangle as it was measured, in viewport coordinates, together
/// with the scroll offset at that moment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorRect {
    pub rect: Rect,
    pub scroll_x: f64,
    pub scroll_y: f64,
}

impl AnchorRect {
    pub fn capture(rect: Rect, viewport: &Viewport) -> Self {
        Self {
            rect,
            scroll_x: viewport.scroll_x,
            scroll_y: viewport.scroll_y,
        }
    }

    /// Where the captured rectangle sits in `viewport` after any scrolling since.
    pub fn rect_in(&self, viewport: &Viewport) -> Rect {
        self.rect.translate(
            self.scroll_x - viewport.scroll_x,
            self.scroll_y - viewport.scroll_y,
        )
    }
}

/// What the popup is placed against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Anchor {
    Rect(AnchorRect),
    /// A point in page coordinates.
    Point(Point),
}

/// Top-left corner of a popup of `size` centred in `viewport`.
pub fn center_position(size: Size, viewport: &Viewport) -> Point {
    let w = if size.is_valid() { size.width } else { 0.0 };
    let h = if size.is_valid() { size.height } else { 0.0 };
    Point::new(
        ((viewport.width - w) / 2.0).max(0.0),
        ((viewport.height - h) / 2.0).max(0.0),
    )
}

/// Top-left corner for a popup of `size` placed against `anchor`.
///
/// A rectangle anchor puts the popup below the selection, left edges aligned,
/// flipping above it when there is no room below, then clamps the whole box into
/// `[0, vw - w] x [0, vh - h]`. A point anchor is clamped with
/// [`MANUAL_PADDING`]. Unusable sizes or anchors fall back to the centre.
pub fn compute_position(anchor: &Anchor, size: Size, viewport: &Viewport) -> Point {
    if !size.is_valid() {
        return center_position(size, viewport);
    }
    match anchor {
        Anchor::Rect(anchor) => {
            let rect = anchor.rect_in(viewport);
            if !rect.is_finite() {
                return center_position(size, viewport);
            }
            let mut y = rect.bottom() + ANCHOR_GAP;
            let above = rect.top - ANCHOR_GAP - size.height;
            if y + size.height > viewport.height && above >= 0.0 {
                y = above;
            }
            clamp_to_viewport(Point::new(rect.left, y), size, viewport, 0.0)
        }
        Anchor::Point(point) => {
            if !(point.x.is_finite() && point.y.is_finite()) {
                return center_position(size, viewport);
            }
            clamp_manual(viewport.page_to_viewport(*point), size, viewport)
        }
    }
}

/// Clamp a viewport point so the popup keeps [`MANUAL_PADDING`] from the edges
/// where the viewport is large enough.
pub fn clamp_manual(point: Point, size: Size, viewport: &Viewport) -> Point {
    let pad = MANUAL_PADDING;
    let max_x = (viewport.width - size.width - pad).max(0.0);
    let max_y = (viewport.height - size.height - pad).max(0.0);
    Point::new(point.x.max(pad).min(max_x), point.y.max(pad).min(max_y))
}

fn clamp_to_viewport(point: Point, size: Size, viewport: &Viewport, pad: f64) -> Point {
    let max_x = (viewport.width - size.width - pad).max(0.0);
    let max_y = (viewport.height - size.height - pad).max(0.0);
    Point::new(point.x.clamp(0.0, max_x), point.y.clamp(0.0, max_y))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> Viewport {
        Viewport::new(1000.0, 800.0)
    }

    fn within(p: Point, size: Size, vp: &Viewport) -> bool {
        p.x >= 0.0 && p.x <= vp.width - size.width && p.y >= 0.0 && p.y <= vp.height - size.height
    }

    #[test]
    fn test_width_rule() {
        assert_eq!(popup_width(400.0, 1000.0), 400.0);
        assert_eq!(popup_width(500.0, 375.0), 345.0);
        assert_eq!(PopupMetrics::SENTENCE.size_in(320.0), Size::new(294.0, 150.0));
    }

    #[test]
    fn test_below_selection_with_gap() {
        let vp = viewport();
        let anchor = Anchor::Rect(AnchorRect::capture(Rect::new(100.0, 200.0, 60.0, 20.0), &vp));
        let p = compute_position(&anchor, Size::new(400.0, 100.0), &vp);
        assert_eq!(p, Point::new(100.0, 230.0));
    }

    #[test]
    fn test_flips_above_near_bottom() {
        let vp = viewport();
        let anchor = Anchor::Rect(AnchorRect::capture(Rect::new(100.0, 700.0, 60.0, 20.0), &vp));
        let p = compute_position(&anchor, Size::new(400.0, 150.0), &vp);
        assert_eq!(p, Point::new(100.0, 540.0));
    }

    #[test]
    fn test_clamps_right_edge() {
        let vp = viewport();
        let anchor = Anchor::Rect(AnchorRect::capture(Rect::new(900.0, 10.0, 60.0, 20.0), &vp));
        let p = compute_position(&anchor, Size::new(400.0, 100.0), &vp);
        assert_eq!(p.x, 600.0);
    }

    #[test]
    fn test_anchor_scrolled_away_stays_in_view() {
        let captured = viewport();
        let anchor = Anchor::Rect(AnchorRect::capture(Rect::new(50.0, 100.0, 30.0, 20.0), &captured));
        let size = Size::new(500.0, 150.0);
        for (sx, sy) in [(0.0, 5000.0), (0.0, -5000.0), (9000.0, 0.0), (-9000.0, 300.0)] {
            let vp = viewport().with_scroll(sx, sy);
            assert!(within(compute_position(&anchor, size, &vp), size, &vp));
        }
        for rect in [
            Rect::new(-3000.0, -3000.0, 10.0, 10.0),
            Rect::new(5000.0, 9000.0, 10.0, 10.0),
            Rect::new(990.0, 790.0, 400.0, 400.0),
        ] {
            let vp = viewport();
            let anchor = Anchor::Rect(AnchorRect::capture(rect, &vp));
            assert!(within(compute_position(&anchor, size, &vp), size, &vp));
        }
    }

    #[test]
    fn test_scroll_since_capture_moves_popup() {
        let anchor = Anchor::Rect(AnchorRect::capture(
            Rect::new(100.0, 300.0, 50.0, 20.0),
            &viewport(),
        ));
        let scrolled = viewport().with_scroll(0.0, 100.0);
        let p = compute_position(&anchor, Size::new(400.0, 100.0), &scrolled);
        assert_eq!(p, Point::new(100.0, 230.0));
    }

    #[test]
    fn test_manual_point_is_page_relative_and_padded() {
        let vp = viewport().with_scroll(0.0, 1000.0);
        let size = Size::new(400.0, 100.0);
        assert_eq!(
            compute_position(&Anchor::Point(Point::new(300.0, 1200.0)), size, &vp),
            Point::new(300.0, 200.0)
        );
        assert_eq!(
            compute_position(&Anchor::Point(Point::new(-50.0, 900.0)), size, &vp),
            Point::new(8.0, 8.0)
        );
        assert_eq!(
            compute_position(&Anchor::Point(Point::new(990.0, 1790.0)), size, &vp),
            Point::new(592.0, 692.0)
        );
    }

    #[test]
    fn test_degenerate_sizes_fall_back_to_center() {
        let vp = viewport();
        let anchor = Anchor::Rect(AnchorRect::capture(Rect::new(0.0, 0.0, 10.0, 10.0), &vp));
        assert_eq!(compute_position(&anchor, Size::new(0.0, 100.0), &vp), Point::new(500.0, 400.0));
        assert_eq!(compute_position(&anchor, Size::new(400.0, -1.0), &vp), Point::new(500.0, 400.0));
        let nan = Anchor::Rect(AnchorRect::capture(Rect::new(f64::NAN, 0.0, 1.0, 1.0), &vp));
        assert_eq!(compute_position(&nan, Size::new(400.0, 100.0), &vp), Point::new(300.0, 350.0));
    }
}
