//! The in-page side of the translator: selection capture, the touch gesture,
//! popup placement and the result pane that streams answers into it.

pub mod content;
pub mod controller;
pub mod gesture;
pub mod positioner;
pub mod results;
pub mod selection;
pub mod shortcut;
pub mod text;

pub use content::{ContentScript, PageContext, PageEvent};
pub use controller::{PopupController, PopupState, ShowRequest, TriggerIcon};
pub use gesture::{GestureArbiter, GestureOutcome};
pub use results::ResultPane;
pub use selection::{SelectionSnapshot, SelectionTracker};
