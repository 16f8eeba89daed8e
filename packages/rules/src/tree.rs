//! Ordered rule sequence. Position is the only identity of a rule.

use crate::error::{ParseResult, StructureResult};
use crate::rule::Rule;
use crate::{parser, serializer, structured};
use serde::{Deserialize, Deserializer, Serialize};

/// A stylesheet or a nested rule body, in cascade order.
///
/// Comments are filtered out on every construction path, so a tree only
/// ever holds plain, media and keyframes rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RuleTree(Vec<Rule>);

impl RuleTree {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Build a tree from rules, dropping comments at every nesting level
    pub fn from_rules(rules: Vec<Rule>) -> Self {
        Self(
            rules
                .into_iter()
                .filter(|rule| !rule.is_comment())
                .map(|rule| match rule {
                    Rule::Media(mut media) => {
                        media.rules = Self::from_rules(media.rules.into_vec());
                        Rule::Media(media)
                    }
                    other => other,
                })
                .collect(),
        )
    }

    /// Parse CSS source text
    pub fn from_text(source: &str) -> ParseResult<Self> {
        parser::parse(source).map(Self::from_rules)
    }

    /// Build from the JSON form of a tree. Unknown rule kinds are dropped.
    pub fn from_structured(value: &serde_json::Value) -> StructureResult<Self> {
        structured::rules_from_value(value, "$").map(Self::from_rules)
    }

    /// Build from per-rule CSS texts, as serialized by a browser's rule list
    pub fn from_rule_texts<S: AsRef<str>>(texts: &[S]) -> StructureResult<Self> {
        structured::rules_from_texts(texts).map(Self::from_rules)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Rule> {
        self.0.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Rule> {
        self.0.get_mut(index)
    }

    /// Insert at `index`, clamped to the end of the tree. Comments are ignored.
    pub fn insert(&mut self, index: usize, rule: Rule) {
        if rule.is_comment() {
            return;
        }
        let index = index.min(self.0.len());
        self.0.insert(index, rule);
    }

    pub fn remove(&mut self, index: usize) -> Option<Rule> {
        if index < self.0.len() {
            Some(self.0.remove(index))
        } else {
            None
        }
    }

    pub fn push(&mut self, rule: Rule) {
        if !rule.is_comment() {
            self.0.push(rule);
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Rule] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<Rule> {
        self.0
    }

    /// JSON form of the tree
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::Value::Array(Vec::new()))
    }

    /// CSS text of the tree
    pub fn to_css(&self) -> String {
        serializer::serialize(self)
    }
}

impl From<Vec<Rule>> for RuleTree {
    fn from(rules: Vec<Rule>) -> Self {
        Self::from_rules(rules)
    }
}

impl FromIterator<Rule> for RuleTree {
    fn from_iter<I: IntoIterator<Item = Rule>>(iter: I) -> Self {
        Self::from_rules(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a RuleTree {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<'de> Deserialize<'de> for RuleTree {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<Rule>::deserialize(deserializer).map(Self::from_rules)
    }
}

impl std::fmt::Display for RuleTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_css())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::Style;
    use serde_json::json;

    #[test]
    fn test_comments_filtered_recursively() {
        let tree = RuleTree::from_rules(vec![
            Rule::comment(" header "),
            Rule::media(
                "screen",
                RuleTree(vec![Rule::comment("inner"), Rule::plain("a", Style::new())]),
            ),
        ]);

        assert_eq!(tree.len(), 1);
        match tree.get(0) {
            Some(Rule::Media(media)) => assert_eq!(media.rules.len(), 1),
            other => panic!("Expected media rule, got {:?}", other),
        }
    }

    #[test]
    fn test_insert_clamps_to_end() {
        let mut tree = RuleTree::new();
        tree.insert(5, Rule::plain("a", Style::new()));
        tree.insert(0, Rule::comment("ignored"));
        assert_eq!(tree.len(), 1);
        assert!(tree.remove(3).is_none());
    }

    #[test]
    fn test_deserialize_drops_comments() {
        let tree: RuleTree = serde_json::from_value(json!([
            {"type": "comment", "text": "x"},
            {"type": "rule", "selectorText": "a", "style": {}}
        ]))
        .unwrap();
        assert_eq!(tree.len(), 1);
    }
}
