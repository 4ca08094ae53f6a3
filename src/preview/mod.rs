use serde::{Deserialize, Serialize};

pub const PREVIEW_MESSAGE_TYPE: &str = "previewContent";

/// Message posted from the editing window to the preview window.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PreviewMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
    pub title: String,
    pub date: String,
}

impl PreviewMessage {
    pub fn new(content: String, title: String, date: String) -> Self {
        Self {
            kind: PREVIEW_MESSAGE_TYPE.to_string(),
            content,
            title,
            date,
        }
    }

    /// Parse a received message; anything that is not a preview message yields `None`.
    pub fn from_json(json: &str) -> Option<Self> {
        serde_json::from_str::<Self>(json)
            .ok()
            .filter(|m| m.kind == PREVIEW_MESSAGE_TYPE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_wire_shape() {
        let msg = PreviewMessage::new("<p>x</p>".into(), "Titre".into(), "01/02/2026 10:00".into());
        let v: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&msg).expect("json")).expect("json");
        assert_eq!(v["type"], "previewContent");
        assert_eq!(v["title"], "Titre");
    }

    #[test]
    fn test_other_messages_are_ignored() {
        assert_eq!(
            PreviewMessage::from_json(r#"{"type":"other","content":"","title":"","date":""}"#),
            None
        );
        assert_eq!(PreviewMessage::from_json("not json"), None);
    }
}
