//! Visibility and placement of the popup and of the trigger icon.

use providers::QueryKind;
use shared::geometry::{Point, Size, Viewport};

use crate::positioner::{
    center_position, clamp_manual, compute_position, Anchor, AnchorRect, PopupMetrics, ANCHOR_GAP,
};
use crate::text::classify;

#[derive(Debug, Clone, PartialEq)]
pub struct PopupState {
    pub visible: bool,
    /// Top-left corner, viewport coordinates.
    pub position: Point,
    pub width: f64,
    pub search_text: String,
}

impl Default for PopupState {
    fn default() -> Self {
        Self {
            visible: false,
            position: Point::default(),
            width: PopupMetrics::SENTENCE.width,
            search_text: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TriggerIcon {
    pub visible: bool,
    /// Viewport coordinates.
    pub position: Point,
    pub size: u32,
}

/// Where a popup should open.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShowRequest {
    pub text: String,
    pub anchor_rect: Option<AnchorRect>,
    /// Page coordinates; used when there is no rectangle.
    pub manual_point: Option<Point>,
}

impl ShowRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn at_rect(mut self, anchor: AnchorRect) -> Self {
        self.anchor_rect = Some(anchor);
        self
    }

    pub fn at_point(mut self, page_point: Point) -> Self {
        self.manual_point = Some(page_point);
        self
    }
}

/// Sole owner of [`PopupState`] and the trigger icon.
#[derive(Debug)]
pub struct PopupController {
    popup: PopupState,
    icon: TriggerIcon,
    show_selection_icon: bool,
    source_language: String,
    kind: QueryKind,
    anchor: Option<AnchorRect>,
}

impl PopupController {
    pub fn new(show_selection_icon: bool, icon_size: u32, source_language: impl Into<String>) -> Self {
        Self {
            popup: PopupState::default(),
            icon: TriggerIcon {
                visible: false,
                position: Point::default(),
                size: icon_size,
            },
            show_selection_icon,
            source_language: source_language.into(),
            kind: QueryKind::Sentence,
            anchor: None,
        }
    }

    pub fn popup(&self) -> &PopupState {
        &self.popup
    }

    pub fn trigger_icon(&self) -> &TriggerIcon {
        &self.icon
    }

    /// Classification of the text on display.
    pub fn kind(&self) -> QueryKind {
        self.kind
    }

    pub fn metrics(&self) -> PopupMetrics {
        PopupMetrics::for_kind(self.kind)
    }

    /// Show the icon just below the pointer-up point, if enabled.
    pub fn show_trigger_icon(&mut self, client_point: Point) -> bool {
        if !self.show_selection_icon {
            return false;
        }
        self.icon.visible = true;
        self.icon.position = Point::new(client_point.x, client_point.y + ANCHOR_GAP);
        true
    }

    pub fn hide_trigger_icon(&mut self) {
        self.icon.visible = false;
    }

    /// Open (or re-target) the popup. Blank text is refused and leaves the state
    /// untouched.
    pub fn show_popup(&mut self, request: ShowRequest, viewport: &Viewport) -> bool {
        let text = request.text.trim();
        if text.is_empty() {
            return false;
        }
        self.icon.visible = false;
        self.kind = classify(text, &self.source_language);
        let size = self.metrics().size_in(viewport.width);

        let position = match (request.anchor_rect, request.manual_point) {
            (Some(anchor), _) => compute_position(&Anchor::Rect(anchor), size, viewport),
            (None, Some(point)) => compute_position(&Anchor::Point(point), size, viewport),
            (None, None) => center_position(size, viewport),
        };

        self.anchor = request.anchor_rect;
        self.popup = PopupState {
            visible: true,
            position,
            width: size.width,
            search_text: text.to_string(),
        };
        tracing::debug!(x = position.x, y = position.y, width = size.width, kind = ?self.kind, "popup shown");
        true
    }

    /// Hide the popup, keeping its text.
    pub fn hide_popup(&mut self) {
        if self.popup.visible {
            tracing::debug!("popup hidden");
        }
        self.popup.visible = false;
    }

    /// Pointer-down or touch-start somewhere on the page.
    pub fn on_pointer_down(&mut self, inside_widget: bool) {
        if !inside_widget {
            self.hide_trigger_icon();
            self.hide_popup();
        }
    }

    /// The wheel only dismisses the icon.
    pub fn on_wheel(&mut self) {
        self.hide_trigger_icon();
    }

    /// A new selection replaces whatever icon is on screen.
    pub fn on_new_selection(&mut self) {
        self.hide_trigger_icon();
    }

    /// Re-fit a visible popup to a resized viewport. `live_anchor` is the latest
    /// measurement of the selection, if the page still has one.
    pub fn on_resize(&mut self, live_anchor: Option<AnchorRect>, viewport: &Viewport) {
        if !self.popup.visible {
            return;
        }
        if let Some(anchor) = live_anchor.or(self.anchor) {
            let request = ShowRequest::new(self.popup.search_text.clone()).at_rect(anchor);
            self.show_popup(request, viewport);
            return;
        }
        let size = self.metrics().size_in(viewport.width);
        self.popup.width = size.width;
        self.popup.position = clamp_manual(self.popup.position, size, viewport);
    }

    /// Move the popup after a drag.
    pub fn move_popup(&mut self, position: Point, viewport: &Viewport) {
        let size = Size::new(self.popup.width, self.metrics().min_height);
        self.popup.position = clamp_manual(position, size, viewport);
        self.anchor = None;
    }
}
