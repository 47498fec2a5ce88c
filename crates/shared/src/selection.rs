//! The process-wide "current selection" slot.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The selected text and its best-effort containing sentence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionInfo {
    pub word: String,
    pub context: String,
}

impl SelectionInfo {
    pub fn is_empty(&self) -> bool {
        self.word.is_empty()
    }
}

/// Shared cell holding the latest [`SelectionInfo`]. Last writer wins; clones share
/// the same slot.
#[derive(Debug, Clone, Default)]
pub struct SelectionSlot {
    inner: Arc<RwLock<SelectionInfo>>,
}

impl SelectionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, info: SelectionInfo) {
        *self.inner.write() = info;
    }

    pub fn get(&self) -> SelectionInfo {
        self.inner.read().clone()
    }

    pub fn word(&self) -> String {
        self.inner.read().word.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_the_slot() {
        let slot = SelectionSlot::new();
        let reader = slot.clone();
        slot.set(SelectionInfo {
            word: "apple".into(),
            context: "An apple a day.".into(),
        });
        assert_eq!(reader.word(), "apple");
        slot.set(SelectionInfo {
            word: "pear".into(),
            context: "A pear.".into(),
        });
        assert_eq!(reader.get().context, "A pear.");
    }
}
