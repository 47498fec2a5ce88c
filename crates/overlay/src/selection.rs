//! Keeps the current selection and the rectangle it was found at.

use shared::geometry::{Point, Rect, Viewport};
use shared::selection::{SelectionInfo, SelectionSlot};

use crate::positioner::{AnchorRect, ANCHOR_GAP};
use crate::text::{context_for, TextBlock};

/// What the page reports about its selection at one instant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionSnapshot {
    /// The selection as text, untrimmed.
    pub text: String,
    pub range_count: usize,
    /// The selection sits in an input, textarea or contenteditable element.
    pub in_editable: bool,
    /// Viewport rectangle of the first range; `None` if it could not be measured.
    pub bounding_rect: Option<Rect>,
    /// The block of text around the selection, for sentence extraction.
    pub block: Option<TextBlock>,
}

impl SelectionSnapshot {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            range_count: 1,
            ..Default::default()
        }
    }

    pub fn with_rect(mut self, rect: Rect) -> Self {
        self.bounding_rect = Some(rect);
        self
    }

    pub fn with_block(mut self, block: TextBlock) -> Self {
        self.block = Some(block);
        self
    }

    pub fn editable(mut self) -> Self {
        self.in_editable = true;
        self
    }

    /// A selection worth acting on: text present, at least one range, not inside
    /// an editable element. Nothing is assumed about where the range lives, so
    /// shadow roots and accessible iframes qualify.
    pub fn is_valid(&self) -> bool {
        !self.in_editable && self.range_count > 0 && !self.text.trim().is_empty()
    }

    /// The selection as [`SelectionInfo`], if valid.
    pub fn info(&self) -> Option<SelectionInfo> {
        if !self.is_valid() {
            return None;
        }
        let word = self.text.trim().to_string();
        let context = context_for(&word, self.block.as_ref());
        Some(SelectionInfo { word, context })
    }
}

/// Result of a selection change that was taken.
#[derive(Debug, Clone, PartialEq)]
pub struct Capture {
    pub info: SelectionInfo,
    pub anchor: Option<AnchorRect>,
    /// Page point just below the middle of the selection, for touch gestures.
    pub gesture_point: Option<Point>,
}

/// Writes every valid selection into the shared slot and remembers where it was.
#[derive(Debug, Default)]
pub struct SelectionTracker {
    slot: SelectionSlot,
    anchor: Option<AnchorRect>,
}

impl SelectionTracker {
    pub fn new(slot: SelectionSlot) -> Self {
        Self { slot, anchor: None }
    }

    pub fn slot(&self) -> &SelectionSlot {
        &self.slot
    }

    pub fn current(&self) -> SelectionInfo {
        self.slot.get()
    }

    /// The anchor of the last captured selection, as measured then.
    pub fn anchor(&self) -> Option<AnchorRect> {
        self.anchor
    }

    /// Handle a `selectionchange`. Invalid selections leave the previous state alone.
    pub fn on_selection_change(&mut self, snapshot: &SelectionSnapshot, viewport: &Viewport) -> Option<Capture> {
        let info = snapshot.info()?;
        let anchor = snapshot
            .bounding_rect
            .filter(Rect::is_finite)
            .map(|rect| AnchorRect::capture(rect, viewport));
        let gesture_point = anchor.map(|a| {
            viewport.viewport_to_page(Point::new(a.rect.center_x(), a.rect.bottom() + ANCHOR_GAP))
        });

        tracing::debug!(chars = info.word.chars().count(), anchored = anchor.is_some(), "selection captured");
        self.slot.set(info.clone());
        self.anchor = anchor;
        Some(Capture {
            info,
            anchor,
            gesture_point,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> Viewport {
        Viewport::new(800.0, 600.0).with_scroll(0.0, 400.0)
    }

    #[test]
    fn test_valid_selection_updates_slot() {
        let slot = SelectionSlot::new();
        let mut tracker = SelectionTracker::new(slot.clone());
        let snapshot = SelectionSnapshot::text("  bank ")
            .with_rect(Rect::new(100.0, 50.0, 40.0, 20.0))
            .with_block(TextBlock::around("He ran. We sat on the bank today. Fine.", "bank").unwrap());

        let capture = tracker.on_selection_change(&snapshot, &viewport()).unwrap();
        assert_eq!(capture.info.word, "bank");
        assert_eq!(capture.info.context, "We sat on the bank today.");
        assert_eq!(slot.word(), "bank");
        assert_eq!(capture.gesture_point, Some(Point::new(120.0, 480.0)));
        assert_eq!(tracker.anchor().map(|a| a.scroll_y), Some(400.0));
    }

    #[test]
    fn test_invalid_selections_are_ignored() {
        let slot = SelectionSlot::new();
        let mut tracker = SelectionTracker::new(slot.clone());
        tracker.on_selection_change(&SelectionSnapshot::text("first"), &viewport());

        for snapshot in [
            SelectionSnapshot::text("   "),
            SelectionSnapshot::text("typed").editable(),
            SelectionSnapshot {
                text: "no range".into(),
                range_count: 0,
                ..Default::default()
            },
        ] {
            assert!(tracker.on_selection_change(&snapshot, &viewport()).is_none());
        }
        assert_eq!(slot.word(), "first");
    }

    #[test]
    fn test_unmeasurable_range_has_no_anchor() {
        let mut tracker = SelectionTracker::default();
        let snapshot = SelectionSnapshot::text("word").with_rect(Rect::new(f64::NAN, 0.0, 1.0, 1.0));
        let capture = tracker.on_selection_change(&snapshot, &viewport()).unwrap();
        assert!(capture.anchor.is_none());
        assert!(capture.gesture_point.is_none());
        assert_eq!(capture.info.context, "word");
    }

    #[test]
    fn test_word_and_context_properties() {
        let mut tracker = SelectionTracker::default();
        let text = "Mix of things. A longer clause here, with commas; and more! End";
        for needle in ["Mix", "longer clause", "commas; and", "End", "things. A"] {
            let snapshot = SelectionSnapshot::text(format!(" {} ", needle))
                .with_block(TextBlock::around(text, needle).unwrap());
            let info = tracker.on_selection_change(&snapshot, &viewport()).unwrap().info;
            assert_eq!(info.word, needle);
            assert!(info.context.contains(&info.word));
        }
    }
}
