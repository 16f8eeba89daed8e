//! Rule variants of a stylesheet

use crate::style::Style;
use crate::tree::RuleTree;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One CSS construct, tagged by `type` in its JSON form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Rule {
    #[serde(rename = "rule")]
    Plain(PlainRule),

    #[serde(rename = "media")]
    Media(MediaRule),

    #[serde(rename = "keyframes")]
    Keyframes(KeyframesRule),

    /// Opaque; never part of a rule tree
    #[serde(rename = "comment")]
    Comment(Comment),
}

/// Kind tag of a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    Plain,
    Media,
    Keyframes,
    Comment,
}

impl RuleKind {
    /// The `type` tag used in JSON
    pub fn as_str(self) -> &'static str {
        match self {
            RuleKind::Plain => "rule",
            RuleKind::Media => "media",
            RuleKind::Keyframes => "keyframes",
            RuleKind::Comment => "comment",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "rule" => Some(RuleKind::Plain),
            "media" => Some(RuleKind::Media),
            "keyframes" => Some(RuleKind::Keyframes),
            "comment" => Some(RuleKind::Comment),
            _ => None,
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Selector rule: `a, b { color: red }`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlainRule {
    pub selector_text: String,
    #[serde(default)]
    pub style: Style,
}

/// `@media <mediaText> { rules }`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRule {
    pub media_text: String,
    #[serde(default)]
    pub rules: RuleTree,
}

/// `@<vendorPrefix>keyframes <name> { keyframes }`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyframesRule {
    pub name: String,
    #[serde(default)]
    pub vendor_prefix: String,
    #[serde(default)]
    pub keyframes: Vec<Keyframe>,
}

/// One step of a keyframes rule. `key_text` is data, never identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Keyframe {
    pub key_text: String,
    #[serde(default)]
    pub style: Style,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub text: String,
}

impl Rule {
    pub fn kind(&self) -> RuleKind {
        match self {
            Rule::Plain(_) => RuleKind::Plain,
            Rule::Media(_) => RuleKind::Media,
            Rule::Keyframes(_) => RuleKind::Keyframes,
            Rule::Comment(_) => RuleKind::Comment,
        }
    }

    pub fn is_comment(&self) -> bool {
        matches!(self, Rule::Comment(_))
    }

    pub fn plain(selector_text: impl Into<String>, style: Style) -> Self {
        Rule::Plain(PlainRule {
            selector_text: selector_text.into(),
            style,
        })
    }

    pub fn media(media_text: impl Into<String>, rules: impl Into<RuleTree>) -> Self {
        Rule::Media(MediaRule {
            media_text: media_text.into(),
            rules: rules.into(),
        })
    }

    pub fn keyframes(name: impl Into<String>, keyframes: Vec<Keyframe>) -> Self {
        Rule::Keyframes(KeyframesRule {
            name: name.into(),
            vendor_prefix: String::new(),
            keyframes,
        })
    }

    pub fn comment(text: impl Into<String>) -> Self {
        Rule::Comment(Comment { text: text.into() })
    }

    /// JSON form of this rule
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl KeyframesRule {
    pub fn with_vendor_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.vendor_prefix = prefix.into();
        self
    }
}

impl Keyframe {
    pub fn new(key_text: impl Into<String>, style: Style) -> Self {
        Self {
            key_text: key_text.into(),
            style,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_rule_json() {
        let rule = Rule::plain("a", Style::new().with("color", "red"));
        assert_eq!(
            rule.to_json(),
            json!({"type": "rule", "selectorText": "a", "style": {"color": "red"}})
        );
    }

    #[test]
    fn test_keyframes_json_defaults_vendor_prefix() {
        let value = json!({
            "type": "keyframes",
            "name": "spin",
            "keyframes": [{"keyText": "from", "style": {"opacity": "0"}}]
        });
        let rule: Rule = serde_json::from_value(value).unwrap();
        match rule {
            Rule::Keyframes(k) => {
                assert_eq!(k.name, "spin");
                assert_eq!(k.vendor_prefix, "");
                assert_eq!(k.keyframes[0].key_text, "from");
            }
            other => panic!("Expected keyframes, got {:?}", other),
        }
    }

    #[test]
    fn test_kind_tags() {
        for kind in [RuleKind::Plain, RuleKind::Media, RuleKind::Keyframes, RuleKind::Comment] {
            assert_eq!(RuleKind::from_tag(kind.as_str()), Some(kind));
        }
        assert_eq!(RuleKind::from_tag("font-face"), None);
    }
}
