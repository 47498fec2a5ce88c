//! The page side of the popup: turns page events and background messages into
//! selection updates, popup transitions and lookups.

use providers::{ChatTurn, EngineRegistry};
use shared::collaborators::{Messenger, Notifier};
use shared::geometry::{Point, Rect, Viewport};
use shared::messaging::{ExtensionMessage, MessageReply};
use shared::selection::SelectionSlot;
use shared::settings::Setting;
use std::sync::Arc;
use std::time::Instant;

use crate::controller::{PopupController, ShowRequest};
use crate::gesture::{GestureArbiter, GestureOutcome};
use crate::positioner::AnchorRect;
use crate::results::ResultPane;
use crate::selection::{SelectionSnapshot, SelectionTracker};
use crate::shortcut::{KeyChord, KeyPress};

/// Distance below the top of the viewport used when nothing better is known.
const FALLBACK_TOP_OFFSET: f64 = 120.0;

/// Things the page reports.
#[derive(Debug, Clone, PartialEq)]
pub enum PageEvent {
    SelectionChange(SelectionSnapshot),
    /// Pointer released at a viewport point, with the selection as it is now.
    PointerUp {
        client: Point,
        selection: SelectionSnapshot,
    },
    PointerDown {
        inside_widget: bool,
    },
    TouchStart {
        inside_widget: bool,
        touch_y: Option<f64>,
    },
    TouchMove {
        touch_y: f64,
    },
    Scroll,
    Wheel,
    Resize,
    KeyDown(KeyPress),
    TriggerIconClick,
}

/// Page state sampled when an event is dispatched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageContext {
    pub viewport: Viewport,
    /// Fresh measurement of the last captured range, if it is still attached.
    pub live_range: Option<Rect>,
    /// The page's selection right now.
    pub selection: SelectionSnapshot,
}

impl PageContext {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            ..Default::default()
        }
    }
}

pub struct ContentScript {
    tracker: SelectionTracker,
    gesture: GestureArbiter,
    controller: PopupController,
    results: ResultPane,
    shortcut: Option<KeyChord>,
    messenger: Arc<dyn Messenger>,
    touch_capable: bool,
}

impl ContentScript {
    pub fn new(setting: &Setting, messenger: Arc<dyn Messenger>, notifier: Arc<dyn Notifier>, touch_capable: bool) -> Self {
        let shortcut = setting.shortcut().and_then(|spec| match spec.parse::<KeyChord>() {
            Ok(chord) => Some(chord),
            Err(e) => {
                tracing::warn!("ignoring shortcut: {}", e);
                None
            }
        });
        Self {
            tracker: SelectionTracker::new(SelectionSlot::new()),
            gesture: GestureArbiter::new(),
            controller: PopupController::new(
                setting.show_selection_icon(),
                setting.trigger_icon_size(),
                setting.source_language(),
            ),
            results: ResultPane::new(EngineRegistry::from_setting(setting)).with_notifier(notifier),
            shortcut,
            messenger,
            touch_capable,
        }
    }

    pub fn controller(&self) -> &PopupController {
        &self.controller
    }

    pub fn results(&self) -> &ResultPane {
        &self.results
    }

    pub fn results_mut(&mut self) -> &mut ResultPane {
        &mut self.results
    }

    pub fn tracker(&self) -> &SelectionTracker {
        &self.tracker
    }

    pub fn gesture(&self) -> &GestureArbiter {
        &self.gesture
    }

    /// Dispatch one page event. When it opens the popup, the lookup started for it
    /// is returned for rendering.
    pub fn handle_event(&mut self, event: PageEvent, ctx: &PageContext, now: Instant) -> Option<ChatTurn> {
        let viewport = &ctx.viewport;
        match event {
            PageEvent::SelectionChange(snapshot) => {
                let capture = self.tracker.on_selection_change(&snapshot, viewport)?;
                self.controller.on_new_selection();
                if self.touch_capable {
                    self.gesture.arm(now, viewport.scroll_y, capture.gesture_point);
                }
                None
            }
            PageEvent::PointerUp { client, selection } => {
                if selection.is_valid() {
                    self.controller.show_trigger_icon(client);
                }
                None
            }
            PageEvent::PointerDown { inside_widget } => {
                self.dismiss(inside_widget);
                None
            }
            PageEvent::TouchStart {
                inside_widget,
                touch_y,
            } => {
                self.dismiss(inside_widget);
                if let Some(y) = touch_y {
                    self.gesture.on_touch_start(y);
                }
                None
            }
            PageEvent::TouchMove { touch_y } => {
                let outcome = self.gesture.on_touch_move(now, touch_y);
                self.on_gesture(outcome, ctx)
            }
            PageEvent::Scroll => {
                let outcome = self.gesture.on_scroll(now, viewport.scroll_y);
                self.on_gesture(outcome, ctx)
            }
            PageEvent::Wheel => {
                self.controller.on_wheel();
                None
            }
            PageEvent::Resize => {
                let live = ctx.live_range.map(|rect| AnchorRect::capture(rect, viewport));
                self.controller.on_resize(live, viewport);
                None
            }
            PageEvent::KeyDown(press) => {
                let hit = self.shortcut.as_ref().is_some_and(|chord| chord.matches(&press));
                if !hit {
                    return None;
                }
                let request = match self.range_anchor(ctx) {
                    Some(anchor) => self.request().at_rect(anchor),
                    None => self.fallback_request(viewport),
                };
                self.open(request, viewport)
            }
            PageEvent::TriggerIconClick => {
                let request = match self.range_anchor(ctx) {
                    Some(anchor) => self.request().at_rect(anchor),
                    None => {
                        let icon = self.controller.trigger_icon().position;
                        self.request().at_point(viewport.viewport_to_page(icon))
                    }
                };
                self.open(request, viewport)
            }
        }
    }

    /// Answer a message from the background context. Never fails; a missing
    /// selection is reported as `null`.
    pub fn handle_message(&mut self, message: ExtensionMessage, ctx: &PageContext) -> (Option<MessageReply>, Option<ChatTurn>) {
        match message {
            ExtensionMessage::ShowCardAndPosition => {
                if self.tracker.current().is_empty() {
                    tracing::warn!("showCardAndPosition without a selection");
                    return (None, None);
                }
                let request = match self.range_anchor(ctx) {
                    Some(anchor) => self.request().at_rect(anchor),
                    None => self.fallback_request(&ctx.viewport),
                };
                (None, self.open(request, &ctx.viewport))
            }
            ExtensionMessage::GetCurWindowSelectionInfo => {
                (Some(MessageReply::SelectionInfo(ctx.selection.info())), None)
            }
            ExtensionMessage::OpenOptions => (None, None),
        }
    }

    /// Ask the background context to open the options page.
    pub async fn open_options(&self) -> anyhow::Result<()> {
        self.messenger.send(ExtensionMessage::OpenOptions).await
    }

    /// Close button of the popup.
    pub fn close_popup(&mut self) {
        self.controller.hide_popup();
        self.results.close();
    }

    fn dismiss(&mut self, inside_widget: bool) {
        let was_visible = self.controller.popup().visible;
        self.controller.on_pointer_down(inside_widget);
        if was_visible && !self.controller.popup().visible {
            self.results.close();
        }
    }

    fn on_gesture(&mut self, outcome: GestureOutcome, ctx: &PageContext) -> Option<ChatTurn> {
        let GestureOutcome::Fired { anchor_point } = outcome else {
            return None;
        };
        let live = ctx
            .live_range
            .filter(Rect::is_finite)
            .map(|rect| AnchorRect::capture(rect, &ctx.viewport));
        let request = match (live, anchor_point) {
            (Some(anchor), _) => self.request().at_rect(anchor),
            (None, Some(point)) => self.request().at_point(point),
            (None, None) => self.fallback_request(&ctx.viewport),
        };
        self.open(request, &ctx.viewport)
    }

    /// The live range if measurable, else the rectangle captured with the selection.
    fn range_anchor(&self, ctx: &PageContext) -> Option<AnchorRect> {
        ctx.live_range
            .filter(Rect::is_finite)
            .map(|rect| AnchorRect::capture(rect, &ctx.viewport))
            .or_else(|| self.tracker.anchor())
    }

    fn request(&self) -> ShowRequest {
        ShowRequest::new(self.tracker.current().word)
    }

    fn fallback_request(&self, viewport: &Viewport) -> ShowRequest {
        self.request().at_point(Point::new(
            viewport.scroll_x + viewport.width / 2.0,
            viewport.scroll_y + FALLBACK_TOP_OFFSET,
        ))
    }

    fn open(&mut self, request: ShowRequest, viewport: &Viewport) -> Option<ChatTurn> {
        if !self.controller.show_popup(request, viewport) {
            return None;
        }
        let info = self.tracker.current();
        self.results.show(&info.word, &info.context)
    }
}
