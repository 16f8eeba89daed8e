//! Positional differencer
//!
//! Walks old and new lists side by side. Equal entries collapse into a skip
//! count, same-kind entries produce a field diff, anything else is replaced.
//! Extra new entries are appended after a skip marker; extra old entries are
//! removed with a single trailing entry.

use crate::codec::{Diff, DiffEntry, RulesDiff};
use crate::field::{
    KeyframeDiff, KeyframesRuleDiff, MediaRuleDiff, PlainRuleDiff, RuleDiff, StyleDiff,
};
use scissors_rules::{Keyframe, Rule, RuleTree, Style};
use tracing::{debug, instrument};

/// Outcome of comparing two entries at the same position
#[derive(Debug, Clone, PartialEq)]
pub enum Delta<D> {
    Same,
    Fields(D),
    Replace,
}

/// An entry of a list that can be diffed position by position
pub trait Diffable: Clone {
    type Diff;

    fn compare(&self, new: &Self) -> Delta<Self::Diff>;
}

/// Compute the diff turning `old` into `new`
#[instrument(skip_all, fields(old = old.len(), new = new.len()))]
pub fn diff(old: &RuleTree, new: &RuleTree) -> RulesDiff {
    let diff = diff_sequence(old.as_slice(), new.as_slice());
    debug!(entries = diff.len(), "Computed rules diff");
    diff
}

pub fn diff_sequence<T: Diffable>(old: &[T], new: &[T]) -> Diff<T, T::Diff> {
    let mut out = Diff::new();
    let mut skip = 0;
    let common = old.len().min(new.len());

    for (old_item, new_item) in old[..common].iter().zip(&new[..common]) {
        match old_item.compare(new_item) {
            Delta::Same => skip += 1,
            Delta::Fields(diff) => {
                out.push(DiffEntry::Change { skip, diff });
                skip = 0;
            }
            Delta::Replace => {
                out.push(DiffEntry::Insert {
                    skip,
                    remove: 1,
                    item: new_item.clone(),
                });
                skip = 0;
            }
        }
    }

    if new.len() > common {
        if skip > 0 {
            out.push(DiffEntry::Skip(skip));
        }
        for item in &new[common..] {
            out.push(DiffEntry::Append(item.clone()));
        }
    } else if old.len() > common {
        out.push(DiffEntry::Remove {
            skip,
            remove: old.len() - common,
        });
    }

    out
}

/// Declarations that changed, with `""` marking removed properties
pub fn diff_style(old: &Style, new: &Style) -> Option<StyleDiff> {
    let mut out = StyleDiff::new();
    for (property, value) in old.iter() {
        match new.get(property) {
            Some(new_value) if new_value == value => {}
            Some(new_value) => out.set(property, new_value),
            None => out.unset(property),
        }
    }
    for (property, value) in new.iter() {
        if !old.contains(property) {
            out.set(property, value);
        }
    }
    (!out.is_empty()).then_some(out)
}

fn changed<T: PartialEq + Clone>(old: &T, new: &T) -> Option<T> {
    (old != new).then(|| new.clone())
}

fn non_empty<T, D>(diff: Diff<T, D>) -> Option<Diff<T, D>> {
    (!diff.is_empty()).then_some(diff)
}

impl Diffable for Rule {
    type Diff = RuleDiff;

    fn compare(&self, new: &Self) -> Delta<RuleDiff> {
        match (self, new) {
            (Rule::Plain(old), Rule::Plain(new)) => {
                let selector_text = (old.selector_text != new.selector_text).then(|| {
                    (!new.selector_text.is_empty()).then(|| new.selector_text.clone())
                });
                let style = diff_style(&old.style, &new.style);
                if selector_text.is_none() && style.is_none() {
                    return Delta::Same;
                }
                Delta::Fields(RuleDiff::Plain(PlainRuleDiff {
                    selector_text,
                    style,
                }))
            }
            (Rule::Media(old), Rule::Media(new)) => {
                let media_text = changed(&old.media_text, &new.media_text);
                let rules = non_empty(diff_sequence(old.rules.as_slice(), new.rules.as_slice()));
                if media_text.is_none() && rules.is_none() {
                    return Delta::Same;
                }
                Delta::Fields(RuleDiff::Media(MediaRuleDiff { media_text, rules }))
            }
            (Rule::Keyframes(old), Rule::Keyframes(new)) => {
                let name = changed(&old.name, &new.name);
                let vendor_prefix = changed(&old.vendor_prefix, &new.vendor_prefix);
                let keyframes = non_empty(diff_sequence(&old.keyframes, &new.keyframes));
                if name.is_none() && vendor_prefix.is_none() && keyframes.is_none() {
                    return Delta::Same;
                }
                Delta::Fields(RuleDiff::Keyframes(KeyframesRuleDiff {
                    name,
                    vendor_prefix,
                    keyframes,
                }))
            }
            (Rule::Comment(old), Rule::Comment(new)) if old == new => Delta::Same,
            _ => Delta::Replace,
        }
    }
}

impl Diffable for Keyframe {
    type Diff = KeyframeDiff;

    fn compare(&self, new: &Self) -> Delta<KeyframeDiff> {
        let key_text = changed(&self.key_text, &new.key_text);
        let style = diff_style(&self.style, &new.style);
        match (key_text, style) {
            (None, None) => Delta::Same,
            (Some(_), Some(_)) => Delta::Replace,
            (key_text, style) => Delta::Fields(KeyframeDiff { key_text, style }),
        }
    }
}
