//! In-memory sinks: a [`RuleTree`] and a keyframe list patched in place

use crate::error::{PatchError, PatchResult, SinkError, SinkResult};
use crate::field::{KeyframeDiff, RuleDiff, StyleDiff};
use crate::patcher::{apply, check_bounds, Sink};
use scissors_rules::{Keyframe, PlainRule, Rule, RuleTree, Style};

impl Sink for RuleTree {
    type Item = Rule;
    type Diff = RuleDiff;

    fn count(&self) -> usize {
        self.len()
    }

    fn get_at(&self, index: usize) -> Option<Rule> {
        self.get(index).cloned()
    }

    fn insert_at(&mut self, index: usize, rule: Rule) -> SinkResult<()> {
        if rule.is_comment() {
            return Err(SinkError::rejected("comments are not part of a rule tree"));
        }
        self.insert(index, rule);
        Ok(())
    }

    fn insert_dummy(&mut self, index: usize) {
        self.insert(index, Rule::Plain(PlainRule::default()));
    }

    fn remove_at(&mut self, index: usize) -> SinkResult<()> {
        self.remove(index)
            .map(|_| ())
            .ok_or(SinkError::Missing { index })
    }

    fn mutate_at(&mut self, index: usize, diff: &RuleDiff) -> SinkResult<()> {
        let rule = self.get_mut(index).ok_or(SinkError::Missing { index })?;
        apply_rule_diff(rule, diff)
    }

    fn check_change(&self, index: usize, diff: &RuleDiff) -> PatchResult<()> {
        match self.get(index) {
            Some(rule) => check_rule_diff(rule, diff),
            None => Ok(()),
        }
    }
}

impl Sink for Vec<Keyframe> {
    type Item = Keyframe;
    type Diff = KeyframeDiff;

    fn count(&self) -> usize {
        self.len()
    }

    fn get_at(&self, index: usize) -> Option<Keyframe> {
        self.get(index).cloned()
    }

    fn insert_at(&mut self, index: usize, keyframe: Keyframe) -> SinkResult<()> {
        let index = index.min(self.len());
        self.insert(index, keyframe);
        Ok(())
    }

    fn insert_dummy(&mut self, index: usize) {
        let index = index.min(self.len());
        self.insert(index, Keyframe::default());
    }

    fn remove_at(&mut self, index: usize) -> SinkResult<()> {
        if index >= self.len() {
            return Err(SinkError::Missing { index });
        }
        self.remove(index);
        Ok(())
    }

    fn mutate_at(&mut self, index: usize, diff: &KeyframeDiff) -> SinkResult<()> {
        let keyframe = self.get_mut(index).ok_or(SinkError::Missing { index })?;
        apply_keyframe_diff(keyframe, diff);
        Ok(())
    }
}

/// Check that a field diff has the rule's kind and that its nested lists fit
pub fn check_rule_diff(rule: &Rule, diff: &RuleDiff) -> PatchResult<()> {
    match (rule, diff) {
        (Rule::Plain(_), RuleDiff::Plain(_)) => Ok(()),
        (Rule::Media(rule), RuleDiff::Media(diff)) => match &diff.rules {
            Some(rules) => check_bounds(&rule.rules, rules),
            None => Ok(()),
        },
        (Rule::Keyframes(rule), RuleDiff::Keyframes(diff)) => match &diff.keyframes {
            Some(keyframes) => check_bounds(&rule.keyframes, keyframes),
            None => Ok(()),
        },
        (rule, diff) => Err(PatchError::KindMismatch {
            expected: rule.kind(),
            found: diff.kind(),
        }),
    }
}

/// Apply a field diff to a rule of the same kind
pub fn apply_rule_diff(rule: &mut Rule, diff: &RuleDiff) -> SinkResult<()> {
    match (rule, diff) {
        (Rule::Plain(rule), RuleDiff::Plain(diff)) => {
            if let Some(selector_text) = &diff.selector_text {
                rule.selector_text = selector_text.clone().unwrap_or_default();
            }
            if let Some(style) = &diff.style {
                apply_style_diff(&mut rule.style, style);
            }
        }
        (Rule::Media(rule), RuleDiff::Media(diff)) => {
            if let Some(media_text) = &diff.media_text {
                rule.media_text = media_text.clone();
            }
            if let Some(rules) = &diff.rules {
                apply(&mut rule.rules, rules)?;
            }
        }
        (Rule::Keyframes(rule), RuleDiff::Keyframes(diff)) => {
            if let Some(name) = &diff.name {
                rule.name = name.clone();
            }
            if let Some(vendor_prefix) = &diff.vendor_prefix {
                rule.vendor_prefix = vendor_prefix.clone();
            }
            if let Some(keyframes) = &diff.keyframes {
                apply(&mut rule.keyframes, keyframes)?;
            }
        }
        (rule, diff) => {
            return Err(SinkError::KindMismatch {
                expected: rule.kind(),
                found: diff.kind(),
            })
        }
    }
    Ok(())
}

pub fn apply_keyframe_diff(keyframe: &mut Keyframe, diff: &KeyframeDiff) {
    if let Some(key_text) = &diff.key_text {
        keyframe.key_text = key_text.clone();
    }
    if let Some(style) = &diff.style {
        apply_style_diff(&mut keyframe.style, style);
    }
}

/// Set changed properties and drop the ones marked with `""`
pub fn apply_style_diff(style: &mut Style, diff: &StyleDiff) {
    for (property, value) in diff.iter() {
        if value.is_empty() {
            style.remove(property);
        } else {
            style.set(property, value);
        }
    }
}
