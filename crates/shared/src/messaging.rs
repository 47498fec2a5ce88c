//! Messages exchanged with the privileged background context.

use serde::{Deserialize, Serialize};

use crate::selection::SelectionInfo;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ExtensionMessage {
    /// Sent by the popup: open the options page.
    OpenOptions,
    /// Received: show the popup for the current selection.
    ShowCardAndPosition,
    /// Received: report the live selection of this window.
    GetCurWindowSelectionInfo,
}

/// Reply to an incoming [`ExtensionMessage`]. `SelectionInfo(None)` serialises to
/// `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageReply {
    SelectionInfo(Option<SelectionInfo>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names() {
        let json = serde_json::to_string(&ExtensionMessage::GetCurWindowSelectionInfo).unwrap();
        assert_eq!(json, r#"{"type":"getCurWindowSelectionInfo"}"#);
        let msg: ExtensionMessage = serde_json::from_str(r#"{"type":"showCardAndPosition"}"#).unwrap();
        assert_eq!(msg, ExtensionMessage::ShowCardAndPosition);
    }

    #[test]
    fn test_empty_selection_reply_is_null() {
        let reply = MessageReply::SelectionInfo(None);
        assert_eq!(serde_json::to_string(&reply).unwrap(), "null");
    }
}
