//! Sparse field diffs: what changed inside a rule or keyframe that kept its kind

use crate::codec::{KeyframesDiff, RulesDiff};
use indexmap::IndexMap;
use scissors_rules::RuleKind;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Changed declarations. An empty value means the property was removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StyleDiff(IndexMap<String, String>);

impl StyleDiff {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    pub fn set(&mut self, property: impl Into<String>, value: impl Into<String>) {
        self.0.insert(property.into(), value.into());
    }

    /// Record a removal
    pub fn unset(&mut self, property: impl Into<String>) {
        self.0.insert(property.into(), String::new());
    }

    pub fn get(&self, property: &str) -> Option<&str> {
        self.0.get(property).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StyleDiff {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Field diff of a selector rule
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PlainRuleDiff {
    /// `Some(None)` is sent as `null` and clears the selector
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub selector_text: Option<Option<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<StyleDiff>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MediaRuleDiff {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<RulesDiff>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct KeyframesRuleDiff {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_prefix: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyframes: Option<KeyframesDiff>,
}

/// Field diff of a single keyframe.
///
/// Never carries both fields: a keyframe whose key and style both changed is
/// replaced instead, since `{keyText, style}` reads as a whole keyframe.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct KeyframeDiff {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<StyleDiff>,
}

/// Field diff of any rule kind. The wire form has no tag; the kind follows
/// from which fields are present.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RuleDiff {
    Plain(PlainRuleDiff),
    Media(MediaRuleDiff),
    Keyframes(KeyframesRuleDiff),
}

impl RuleDiff {
    pub fn kind(&self) -> RuleKind {
        match self {
            RuleDiff::Plain(_) => RuleKind::Plain,
            RuleDiff::Media(_) => RuleKind::Media,
            RuleDiff::Keyframes(_) => RuleKind::Keyframes,
        }
    }
}

const PLAIN_FIELDS: &[&str] = &["selectorText", "style"];
const MEDIA_FIELDS: &[&str] = &["mediaText", "rules"];
const KEYFRAMES_FIELDS: &[&str] = &["name", "vendorPrefix", "keyframes"];

impl<'de> Deserialize<'de> for RuleDiff {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = Map::<String, Value>::deserialize(deserializer)?;
        let has_any = |fields: &[&str]| fields.iter().any(|f| map.contains_key(*f));

        let kinds = (
            has_any(PLAIN_FIELDS),
            has_any(MEDIA_FIELDS),
            has_any(KEYFRAMES_FIELDS),
        );
        let value = Value::Object(map);
        match kinds {
            (true, false, false) => serde_json::from_value(value)
                .map(RuleDiff::Plain)
                .map_err(D::Error::custom),
            (false, true, false) => serde_json::from_value(value)
                .map(RuleDiff::Media)
                .map_err(D::Error::custom),
            (false, false, true) => serde_json::from_value(value)
                .map(RuleDiff::Keyframes)
                .map_err(D::Error::custom),
            (false, false, false) => Err(D::Error::custom(format!(
                "field diff has no known field: {}",
                value
            ))),
            _ => Err(D::Error::custom(
                "field diff mixes fields of different rule kinds",
            )),
        }
    }
}

fn present_or_null<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Option<String>>, D::Error> {
    Option::<String>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rule_diff_kind_from_fields() {
        let diff: RuleDiff = serde_json::from_value(json!({"style": {"color": ""}})).unwrap();
        assert_eq!(diff.kind(), RuleKind::Plain);

        let diff: RuleDiff = serde_json::from_value(json!({"mediaText": "print"})).unwrap();
        assert_eq!(diff.kind(), RuleKind::Media);

        let diff: RuleDiff = serde_json::from_value(json!({"vendorPrefix": "-moz-"})).unwrap();
        assert_eq!(diff.kind(), RuleKind::Keyframes);
    }

    #[test]
    fn test_selector_null_vs_absent() {
        let diff: PlainRuleDiff = serde_json::from_value(json!({"selectorText": null})).unwrap();
        assert_eq!(diff.selector_text, Some(None));

        let diff: PlainRuleDiff = serde_json::from_value(json!({"style": {}})).unwrap();
        assert_eq!(diff.selector_text, None);

        let out = serde_json::to_value(PlainRuleDiff {
            selector_text: Some(None),
            style: None,
        })
        .unwrap();
        assert_eq!(out, json!({"selectorText": null}));
    }

    #[test]
    fn test_mixed_kinds_rejected() {
        let result: Result<RuleDiff, _> =
            serde_json::from_value(json!({"style": {}, "mediaText": "print"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        assert!(serde_json::from_value::<RuleDiff>(json!({"color": "red"})).is_err());
        assert!(serde_json::from_value::<RuleDiff>(json!({"style": {}, "color": "red"})).is_err());
        assert!(serde_json::from_value::<KeyframeDiff>(json!({"name": "x"})).is_err());
    }

    #[test]
    fn test_style_values_must_be_strings() {
        assert!(serde_json::from_value::<StyleDiff>(json!({"top": 0})).is_err());
    }

    #[test]
    fn test_style_diff_removal_marker() {
        let mut diff = StyleDiff::new();
        diff.set("color", "blue");
        diff.unset("margin");
        assert_eq!(
            serde_json::to_value(&diff).unwrap(),
            json!({"color": "blue", "margin": ""})
        );
    }
}
