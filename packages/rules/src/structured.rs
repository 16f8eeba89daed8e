//! Lenient import of rule trees from their JSON form.
//!
//! Accepts the tagged objects produced by `Rule`'s serializer, untagged
//! `{selectorText, style}` objects and plain CSS rule strings. Unknown rule
//! kinds are dropped the same way comments are.

use crate::error::{StructureError, StructureResult};
use crate::parser;
use crate::rule::{Comment, Keyframe, KeyframesRule, MediaRule, PlainRule, Rule, RuleKind};
use crate::style::Style;
use crate::tree::RuleTree;
use serde_json::{Map, Value};
use tracing::debug;

pub(crate) fn rules_from_value(value: &Value, path: &str) -> StructureResult<Vec<Rule>> {
    let items = value.as_array().ok_or_else(|| StructureError::WrongType {
        path: path.to_string(),
        expected: "an array of rules",
    })?;

    let mut rules = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let item_path = format!("{}[{}]", path, i);
        match item {
            Value::String(text) => rules.extend(rules_from_text(text, &item_path)?),
            Value::Object(obj) => {
                if let Some(rule) = rule_from_object(obj, &item_path)? {
                    rules.push(rule);
                }
            }
            _ => {
                return Err(StructureError::WrongType {
                    path: item_path,
                    expected: "a rule object or rule text",
                })
            }
        }
    }

    Ok(rules)
}

pub(crate) fn rules_from_texts<S: AsRef<str>>(texts: &[S]) -> StructureResult<Vec<Rule>> {
    let mut rules = Vec::new();
    for (i, text) in texts.iter().enumerate() {
        rules.extend(rules_from_text(text.as_ref(), &format!("$[{}]", i))?);
    }
    Ok(rules)
}

fn rules_from_text(text: &str, path: &str) -> StructureResult<Vec<Rule>> {
    parser::parse(text).map_err(|source| StructureError::RuleText {
        path: path.to_string(),
        source,
    })
}

fn rule_from_object(obj: &Map<String, Value>, path: &str) -> StructureResult<Option<Rule>> {
    let kind = match obj.get("type") {
        Some(Value::String(tag)) => match RuleKind::from_tag(tag) {
            Some(kind) => kind,
            None => {
                debug!(path, rule_type = %tag, "Dropping unsupported rule kind");
                return Ok(None);
            }
        },
        Some(_) => {
            return Err(StructureError::WrongType {
                path: format!("{}.type", path),
                expected: "a string",
            })
        }
        // Untagged objects are selector rules
        None if obj.contains_key("selectorText") => RuleKind::Plain,
        None => {
            return Err(StructureError::MissingField {
                path: path.to_string(),
                field: "type",
            })
        }
    };

    let rule = match kind {
        RuleKind::Plain => Rule::Plain(PlainRule {
            selector_text: required_str(obj, "selectorText", path)?,
            style: style_field(obj, path)?,
        }),
        RuleKind::Media => {
            let rules = match obj.get("rules") {
                Some(value) => rules_from_value(value, &format!("{}.rules", path))?,
                None => Vec::new(),
            };
            Rule::Media(MediaRule {
                media_text: required_str(obj, "mediaText", path)?,
                rules: RuleTree::from_rules(rules),
            })
        }
        RuleKind::Keyframes => Rule::Keyframes(KeyframesRule {
            name: required_str(obj, "name", path)?,
            vendor_prefix: optional_str(obj, "vendorPrefix", path)?.unwrap_or_default(),
            keyframes: keyframes_field(obj, path)?,
        }),
        RuleKind::Comment => Rule::Comment(Comment {
            text: optional_str(obj, "text", path)?.unwrap_or_default(),
        }),
    };

    Ok(Some(rule))
}

fn keyframes_field(obj: &Map<String, Value>, path: &str) -> StructureResult<Vec<Keyframe>> {
    let field_path = format!("{}.keyframes", path);
    let items = match obj.get("keyframes") {
        None => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => {
            return Err(StructureError::WrongType {
                path: field_path,
                expected: "an array of keyframes",
            })
        }
    };

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let item_path = format!("{}[{}]", field_path, i);
            let keyframe = item.as_object().ok_or_else(|| StructureError::WrongType {
                path: item_path.clone(),
                expected: "a keyframe object",
            })?;
            Ok(Keyframe {
                key_text: required_str(keyframe, "keyText", &item_path)?,
                style: style_field(keyframe, &item_path)?,
            })
        })
        .collect()
}

fn style_field(obj: &Map<String, Value>, path: &str) -> StructureResult<Style> {
    let field_path = format!("{}.style", path);
    match obj.get("style") {
        None | Some(Value::Null) => Ok(Style::new()),
        // An empty value is the removal marker of a style diff, never a declaration
        Some(Value::Object(props)) => props
            .iter()
            .filter_map(|(prop, value)| match value {
                Value::String(s) if s.is_empty() => None,
                Value::String(s) => Some(Ok((prop.clone(), s.clone()))),
                _ => Some(Err(StructureError::WrongType {
                    path: format!("{}.{}", field_path, prop),
                    expected: "a string",
                })),
            })
            .collect(),
        Some(_) => Err(StructureError::WrongType {
            path: field_path,
            expected: "an object of property values",
        }),
    }
}

fn required_str(obj: &Map<String, Value>, field: &'static str, path: &str) -> StructureResult<String> {
    optional_str(obj, field, path)?.ok_or_else(|| StructureError::MissingField {
        path: path.to_string(),
        field,
    })
}

fn optional_str(
    obj: &Map<String, Value>,
    field: &'static str,
    path: &str,
) -> StructureResult<Option<String>> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(StructureError::WrongType {
            path: format!("{}.{}", path, field),
            expected: "a string",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_kinds_dropped() {
        let value = json!([
            {"type": "font-face", "style": {"font-family": "x"}},
            {"type": "rule", "selectorText": "a", "style": {"color": "red"}},
            {"type": "comment", "text": "note"}
        ]);
        let tree = RuleTree::from_structured(&value).unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.get(0).map(Rule::kind), Some(RuleKind::Plain));
    }

    #[test]
    fn test_empty_values_are_dropped() {
        let value = json!([
            {"type": "rule", "selectorText": "a", "style": {"color": "", "top": "0"}},
            {"type": "keyframes", "name": "k", "keyframes": [{"keyText": "to", "style": {"left": ""}}]}
        ]);
        let tree = RuleTree::from_structured(&value).unwrap();
        let keyframe = crate::Keyframe {
            key_text: "to".to_string(),
            style: Style::new(),
        };
        assert_eq!(
            tree,
            RuleTree::from_rules(vec![
                Rule::plain("a", Style::new().with("top", "0")),
                Rule::keyframes("k", vec![keyframe]),
            ])
        );
    }

    #[test]
    fn test_untagged_selector_rule() {
        let value = json!([{"selectorText": "h1", "style": {"margin": "0"}}]);
        let tree = RuleTree::from_structured(&value).unwrap();
        assert_eq!(
            tree.get(0),
            Some(&Rule::plain("h1", Style::new().with("margin", "0")))
        );
    }

    #[test]
    fn test_rule_texts_from_browser() {
        let tree = RuleTree::from_rule_texts(&["a { color: red; }", "b, i { margin: 0; }"]).unwrap();
        assert_eq!(tree.len(), 2);
        match tree.get(1) {
            Some(Rule::Plain(rule)) => assert_eq!(rule.selector_text, "b, i"),
            other => panic!("Expected plain rule, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_required_field() {
        let value = json!([{"type": "media", "rules": []}]);
        let err = RuleTree::from_structured(&value).unwrap_err();
        assert_eq!(
            err,
            StructureError::MissingField {
                path: "$[0]".to_string(),
                field: "mediaText"
            }
        );
    }

    #[test]
    fn test_non_string_property_value() {
        let value = json!([{"type": "rule", "selectorText": "a", "style": {"z-index": 3}}]);
        assert!(matches!(
            RuleTree::from_structured(&value),
            Err(StructureError::WrongType { .. })
        ));
    }

    #[test]
    fn test_top_level_must_be_array() {
        assert!(RuleTree::from_structured(&json!({"rules": []})).is_err());
    }
}
