//! Flat wire form of a diff.
//!
//! A diff is a JSON array of positional entries:
//!
//! | entry                            | meaning                                   |
//! |----------------------------------|-------------------------------------------|
//! | `{"skip": n}`                    | advance over `n` unchanged entries        |
//! | raw item (rule has `type`)       | insert the item at the cursor             |
//! | `{"insert": item, "remove": 1}`  | replace the entry at the cursor           |
//! | `{"remove": n}`                  | delete `n` entries at the cursor          |
//! | `{"selectorText": .., ...}`      | field diff of the entry at the cursor     |
//!
//! Every entry but a raw item may carry a `skip` that is applied first.
//! Decoding is strict: anything else is a [`CodecError`].

use crate::error::CodecError;
use crate::field::{KeyframeDiff, RuleDiff};
use serde::de::{DeserializeOwned, Error as _};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use scissors_rules::{Keyframe, Rule};

/// Diff of a rule list
pub type RulesDiff = Diff<Rule, RuleDiff>;
/// Diff of the keyframe list of a keyframes rule
pub type KeyframesDiff = Diff<Keyframe, KeyframeDiff>;

pub type RuleEntry = DiffEntry<Rule, RuleDiff>;
pub type KeyframeEntry = DiffEntry<Keyframe, KeyframeDiff>;

/// One positional instruction
#[derive(Debug, Clone, PartialEq)]
pub enum DiffEntry<T, D> {
    /// Advance the cursor without touching anything
    Skip(usize),

    /// Insert a whole item at the cursor
    Append(T),

    /// Remove `remove` entries at the cursor, then insert `item` there
    Insert { skip: usize, remove: usize, item: T },

    /// Remove `remove` entries at the cursor
    Remove { skip: usize, remove: usize },

    /// Change fields of the entry at the cursor
    Change { skip: usize, diff: D },
}

impl<T, D> DiffEntry<T, D> {
    /// Positions skipped before this entry acts
    pub fn skip(&self) -> usize {
        match self {
            DiffEntry::Skip(skip) => *skip,
            DiffEntry::Append(_) => 0,
            DiffEntry::Insert { skip, .. }
            | DiffEntry::Remove { skip, .. }
            | DiffEntry::Change { skip, .. } => *skip,
        }
    }
}

/// How the decoder recognizes a whole item among diff entries
pub trait WireItem {
    fn is_raw(entry: &Map<String, Value>) -> bool;
}

impl WireItem for Rule {
    fn is_raw(entry: &Map<String, Value>) -> bool {
        entry.contains_key("type")
    }
}

impl WireItem for Keyframe {
    fn is_raw(entry: &Map<String, Value>) -> bool {
        entry.contains_key("keyText") && entry.contains_key("style")
    }
}

/// Ordered list of diff entries. Empty means "no change".
#[derive(Debug, Clone, PartialEq)]
pub struct Diff<T, D> {
    entries: Vec<DiffEntry<T, D>>,
}

impl<T, D> Diff<T, D> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn push(&mut self, entry: DiffEntry<T, D>) {
        self.entries.push(entry);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DiffEntry<T, D>> {
        self.entries.iter()
    }

    pub fn entries(&self) -> &[DiffEntry<T, D>] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<DiffEntry<T, D>> {
        self.entries
    }
}

impl<T, D> Default for Diff<T, D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, D> From<Vec<DiffEntry<T, D>>> for Diff<T, D> {
    fn from(entries: Vec<DiffEntry<T, D>>) -> Self {
        Self { entries }
    }
}

impl<'a, T, D> IntoIterator for &'a Diff<T, D> {
    type Item = &'a DiffEntry<T, D>;
    type IntoIter = std::slice::Iter<'a, DiffEntry<T, D>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl<T: Serialize, D: Serialize> Diff<T, D> {
    pub fn to_json(&self) -> Value {
        // Items and field diffs are plain data; serializing them cannot fail.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl<T: DeserializeOwned + WireItem, D: DeserializeOwned> Diff<T, D> {
    pub fn from_json(value: &Value) -> Result<Self, CodecError> {
        Ok(Self::deserialize(value)?)
    }

    pub fn from_json_str(text: &str) -> Result<Self, CodecError> {
        Ok(serde_json::from_str(text)?)
    }
}

impl<T: Serialize, D: Serialize> Serialize for Diff<T, D> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.entries)
    }
}

impl<'de, T: DeserializeOwned + WireItem, D: DeserializeOwned> Deserialize<'de> for Diff<T, D> {
    fn deserialize<De: Deserializer<'de>>(deserializer: De) -> Result<Self, De::Error> {
        Vec::<DiffEntry<T, D>>::deserialize(deserializer).map(Diff::from)
    }
}

#[derive(Serialize)]
struct FieldsWithSkip<'a, D> {
    #[serde(skip_serializing_if = "is_zero")]
    skip: usize,
    #[serde(flatten)]
    diff: &'a D,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

impl<T: Serialize, D: Serialize> Serialize for DiffEntry<T, D> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DiffEntry::Skip(skip) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("skip", skip)?;
                map.end()
            }
            DiffEntry::Append(item) => item.serialize(serializer),
            DiffEntry::Insert { skip, remove, item } => {
                let mut map = serializer.serialize_map(None)?;
                if *skip > 0 {
                    map.serialize_entry("skip", skip)?;
                }
                map.serialize_entry("insert", item)?;
                if *remove > 0 {
                    map.serialize_entry("remove", remove)?;
                }
                map.end()
            }
            DiffEntry::Remove { skip, remove } => {
                let mut map = serializer.serialize_map(None)?;
                if *skip > 0 {
                    map.serialize_entry("skip", skip)?;
                }
                map.serialize_entry("remove", remove)?;
                map.end()
            }
            DiffEntry::Change { skip, diff } => FieldsWithSkip { skip: *skip, diff }.serialize(serializer),
        }
    }
}

impl<'de, T: DeserializeOwned + WireItem, D: DeserializeOwned> Deserialize<'de>
    for DiffEntry<T, D>
{
    fn deserialize<De: Deserializer<'de>>(deserializer: De) -> Result<Self, De::Error> {
        let mut map = Map::<String, Value>::deserialize(deserializer)?;
        decode_entry(&mut map).map_err(De::Error::custom)
    }
}

fn decode_entry<T, D>(map: &mut Map<String, Value>) -> Result<DiffEntry<T, D>, String>
where
    T: DeserializeOwned + WireItem,
    D: DeserializeOwned,
{
    if T::is_raw(map) {
        if map.contains_key("skip") {
            return Err("a whole item cannot carry a skip".to_string());
        }
        let item = serde_json::from_value(Value::Object(std::mem::take(map)))
            .map_err(|e| format!("invalid item: {}", e))?;
        return Ok(DiffEntry::Append(item));
    }

    let skip = match map.remove("skip") {
        Some(value) => count(&value, "skip")?,
        None => 0,
    };

    if let Some(insert) = map.remove("insert") {
        let remove = match map.remove("remove") {
            Some(value) => count(&value, "remove")?,
            None => 0,
        };
        reject_leftovers(map, "insert")?;
        let item = serde_json::from_value(insert).map_err(|e| format!("invalid insert: {}", e))?;
        return Ok(DiffEntry::Insert { skip, remove, item });
    }

    if let Some(remove) = map.remove("remove") {
        let remove = count(&remove, "remove")?;
        if remove == 0 {
            return Err("remove count must be positive".to_string());
        }
        reject_leftovers(map, "remove")?;
        return Ok(DiffEntry::Remove { skip, remove });
    }

    if map.is_empty() {
        return Ok(DiffEntry::Skip(skip));
    }

    let diff = serde_json::from_value(Value::Object(std::mem::take(map)))
        .map_err(|e| format!("invalid field diff: {}", e))?;
    Ok(DiffEntry::Change { skip, diff })
}

fn count(value: &Value, field: &str) -> Result<usize, String> {
    value
        .as_u64()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| format!("{} must be a non-negative integer, got {}", field, value))
}

fn reject_leftovers(map: &Map<String, Value>, entry: &str) -> Result<(), String> {
    match map.keys().next() {
        Some(key) => Err(format!("unexpected field '{}' in {} entry", key, entry)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{PlainRuleDiff, StyleDiff};
    use scissors_rules::Style;
    use serde_json::json;

    fn decode(value: Value) -> Result<RulesDiff, CodecError> {
        RulesDiff::from_json(&value)
    }

    #[test]
    fn test_encode_entries() {
        let diff = RulesDiff::from(vec![
            DiffEntry::Change {
                skip: 1,
                diff: RuleDiff::Plain(PlainRuleDiff {
                    selector_text: None,
                    style: Some(StyleDiff::from_iter([("color", "blue")])),
                }),
            },
            DiffEntry::Insert {
                skip: 0,
                remove: 1,
                item: Rule::plain("b", Style::new()),
            },
            DiffEntry::Skip(2),
            DiffEntry::Append(Rule::plain("c", Style::new())),
        ]);

        assert_eq!(
            diff.to_json(),
            json!([
                {"skip": 1, "style": {"color": "blue"}},
                {"insert": {"type": "rule", "selectorText": "b", "style": {}}, "remove": 1},
                {"skip": 2},
                {"type": "rule", "selectorText": "c", "style": {}}
            ])
        );
    }

    #[test]
    fn test_decode_remove_with_skip() {
        let diff = decode(json!([{"skip": 1, "remove": 2}])).unwrap();
        assert_eq!(
            diff.entries(),
            &[DiffEntry::Remove { skip: 1, remove: 2 }]
        );
    }

    #[test]
    fn test_decode_empty() {
        assert!(decode(json!([])).unwrap().is_empty());
    }

    #[test]
    fn test_decode_keyframe_entries() {
        let diff = KeyframesDiff::from_json(&json!([
            {"keyText": "50%"},
            {"keyText": "to", "style": {"top": "0"}}
        ]))
        .unwrap();
        assert!(matches!(diff.entries()[0], DiffEntry::Change { skip: 0, .. }));
        assert!(matches!(diff.entries()[1], DiffEntry::Append(_)));
    }

    #[test]
    fn test_malformed_entries_rejected() {
        let cases = vec![
            json!({"skip": 1}),
            json!([1]),
            json!([{"skip": -1}]),
            json!([{"skip": "1"}]),
            json!([{"remove": 0}]),
            json!([{"remove": 1, "style": {}}]),
            json!([{"insert": {"type": "rule", "selectorText": "a", "style": {}}, "style": {}}]),
            json!([{"insert": {"selectorText": "a"}}]),
            json!([{"type": "rule", "selectorText": "a", "style": {}, "skip": 1}]),
            json!([{"type": "bogus"}]),
            json!([{"selectorText": 3}]),
            json!([{"unknown": true}]),
        ];
        for case in cases {
            assert!(decode(case.clone()).is_err(), "Should reject {}", case);
        }
    }

    #[test]
    fn test_decode_from_text() {
        let diff = RulesDiff::from_json_str(r#"[{"skip":3},{"remove":1}]"#).unwrap();
        assert_eq!(diff.len(), 2);
        assert!(RulesDiff::from_json_str("[{").is_err());
    }
}
