//! JSON envelopes exchanged with clients

use scissors_diff::RulesDiff;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Source language of a sheet
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CssType {
    #[default]
    Css,
    Less,
}

impl fmt::Display for CssType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CssType::Css => write!(f, "css"),
            CssType::Less => write!(f, "less"),
        }
    }
}

/// A client announcing a sheet it holds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenSheet {
    pub name: String,
    #[serde(default)]
    pub css_type: CssType,
    /// Raw text of the sheet, when the client could fetch it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Rules as the client's engine holds them, in JSON form
    #[serde(default)]
    pub css_rules: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    OpenSheet(OpenSheet),

    /// An edit made on the client, to be applied and relayed
    #[serde(rename_all = "camelCase")]
    RulesDiff {
        sheet_name: String,
        rules_diff: RulesDiff,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    #[serde(rename_all = "camelCase")]
    RulesDiff {
        sheet_name: String,
        rules_diff: RulesDiff,
    },
}

impl ClientMessage {
    /// Decode a text frame. Any shape error rejects the whole message.
    pub fn from_text(text: &str) -> ProtocolResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_text(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl ServerMessage {
    pub fn rules_diff(sheet_name: impl Into<String>, rules_diff: RulesDiff) -> Self {
        ServerMessage::RulesDiff {
            sheet_name: sheet_name.into(),
            rules_diff,
        }
    }

    pub fn from_text(text: &str) -> ProtocolResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_text(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_open_sheet() {
        let text = json!({
            "type": "openSheet",
            "name": "http://localhost/style.css",
            "cssType": "less",
            "source": "a { b: c }",
            "cssRules": []
        })
        .to_string();

        match ClientMessage::from_text(&text).unwrap() {
            ClientMessage::OpenSheet(open) => {
                assert_eq!(open.name, "http://localhost/style.css");
                assert_eq!(open.css_type, CssType::Less);
                assert_eq!(open.source.as_deref(), Some("a { b: c }"));
            }
            other => panic!("Expected openSheet, got {:?}", other),
        }
    }

    #[test]
    fn test_open_sheet_defaults() {
        let text = r#"{"type":"openSheet","name":"x.css","cssRules":[]}"#;
        let ClientMessage::OpenSheet(open) = ClientMessage::from_text(text).unwrap() else {
            panic!("Expected openSheet");
        };
        assert_eq!(open.css_type, CssType::Css);
        assert_eq!(open.source, None);
    }

    #[test]
    fn test_rules_diff_envelope() {
        let diff = RulesDiff::from_json(&json!([{"skip": 1}, {"remove": 1}])).unwrap();
        let message = ServerMessage::rules_diff("x.css", diff);
        let value: serde_json::Value = serde_json::from_str(&message.to_text()).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "rulesDiff",
                "sheetName": "x.css",
                "rulesDiff": [{"skip": 1}, {"remove": 1}]
            })
        );
        assert_eq!(ServerMessage::from_text(&message.to_text()).unwrap(), message);
    }

    #[test]
    fn test_malformed_messages() {
        for text in [
            "not json",
            r#"{"type":"closeSheet"}"#,
            r#"{"type":"rulesDiff","sheetName":"x","rulesDiff":[{"remove":0}]}"#,
            r#"{"type":"openSheet","cssRules":[]}"#,
        ] {
            assert!(ClientMessage::from_text(text).is_err(), "Should reject {}", text);
        }
    }
}
