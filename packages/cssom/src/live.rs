//! Patch sink over an engine style sheet.
//!
//! The engine may refuse rules it does not understand, so the sink keeps a
//! slot per tree position: live slots map onto engine rules in order, dummy
//! slots only hold a position. An engine index is the number of live slots
//! before a position. Media and keyframes rules are inserted as empty shells
//! and then filled one child at a time, so refused children get their own
//! dummy slots.

use crate::declaration::CssStyleDeclaration;
use crate::error::EngineError;
use crate::profile::EngineProfile;
use crate::rule::{keyframe_text, shell_text, CssKeyframesRule, CssRule, CssRuleList};
use crate::sheet::StyleSheet;
use scissors_diff::{
    apply, check_entries, KeyframeDiff, PatchError, PatchReport, PatchResult, RuleDiff,
    RulesDiff, Sink, SinkError, SinkResult, StyleDiff,
};
use scissors_rules::{Keyframe, Rule, RuleTree};
use tracing::{instrument, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    Dummy,
    /// Children hold the slots of nested rules or keyframes
    Live(Vec<Slot>),
}

impl Slot {
    fn leaf() -> Self {
        Slot::Live(Vec::new())
    }

    fn is_live(&self) -> bool {
        matches!(self, Slot::Live(_))
    }

    fn for_rule(rule: &CssRule) -> Self {
        match rule {
            CssRule::Style(_) => Slot::leaf(),
            CssRule::Media(media) => Slot::Live(media.css_rules.iter().map(Slot::for_rule).collect()),
            CssRule::Keyframes(keyframes) => Slot::Live(keyframes.iter().map(|_| Slot::leaf()).collect()),
        }
    }
}

fn engine_index(slots: &[Slot], position: usize) -> usize {
    slots[..position.min(slots.len())]
        .iter()
        .filter(|slot| slot.is_live())
        .count()
}

fn count_dummies(slots: &[Slot]) -> usize {
    slots
        .iter()
        .map(|slot| match slot {
            Slot::Dummy => 1,
            Slot::Live(children) => count_dummies(children),
        })
        .sum()
}

fn rejected(error: EngineError) -> SinkError {
    SinkError::rejected(error.to_string())
}

fn insert_or_dummy<S: Sink>(sink: &mut S, index: usize, item: S::Item) {
    if let Err(error) = sink.insert_at(index, item) {
        warn!(index, %error, "Engine refused nested entry, holding the position with a dummy");
        sink.insert_dummy(index);
    }
}

fn assign_style(declaration: &mut CssStyleDeclaration, diff: &StyleDiff, profile: &EngineProfile) {
    for (property, value) in diff.iter() {
        declaration.assign(property, value, profile);
    }
}

/// An engine style sheet kept in step with a rule tree through diffs
#[derive(Debug, Clone)]
pub struct LiveSheet {
    sheet: StyleSheet,
    slots: Vec<Slot>,
}

impl LiveSheet {
    /// Wrap a sheet the engine already holds; every rule starts live
    pub fn new(sheet: StyleSheet) -> Self {
        let slots = sheet.css_rules().iter().map(Slot::for_rule).collect();
        Self { sheet, slots }
    }

    /// Build a sheet from a tree, with dummies wherever the engine refuses
    pub fn load(tree: &RuleTree, profile: EngineProfile) -> Self {
        let mut live = Self::new(StyleSheet::new(profile));
        let mut sink = live.sink();
        for (index, rule) in tree.iter().enumerate() {
            insert_or_dummy(&mut sink, index, rule.clone());
        }
        live
    }

    pub fn sheet(&self) -> &StyleSheet {
        &self.sheet
    }

    /// Tree positions, including dummies
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Dummies at any depth
    pub fn dummy_count(&self) -> usize {
        count_dummies(&self.slots)
    }

    pub fn sink(&mut self) -> RuleListSink<'_> {
        let (rules, profile) = self.sheet.parts_mut();
        RuleListSink {
            rules,
            slots: &mut self.slots,
            profile,
        }
    }

    #[instrument(skip_all, fields(entries = diff.len()))]
    pub fn apply(&mut self, diff: &RulesDiff) -> PatchResult<PatchReport> {
        apply(&mut self.sink(), diff)
    }

    /// Read the engine back. Dummies have no engine rule and do not appear.
    pub fn to_rule_tree(&self) -> RuleTree {
        self.sheet.to_rule_tree()
    }
}

/// Sink over an engine rule list and its slots
pub struct RuleListSink<'a> {
    rules: &'a mut CssRuleList,
    slots: &'a mut Vec<Slot>,
    profile: &'a EngineProfile,
}

impl Sink for RuleListSink<'_> {
    type Item = Rule;
    type Diff = RuleDiff;

    fn count(&self) -> usize {
        self.slots.len()
    }

    fn get_at(&self, index: usize) -> Option<Rule> {
        match self.slots.get(index)? {
            Slot::Dummy => None,
            Slot::Live(_) => self
                .rules
                .get(engine_index(&self.slots, index))
                .map(CssRule::to_rule),
        }
    }

    fn insert_at(&mut self, index: usize, rule: Rule) -> SinkResult<()> {
        let index = index.min(self.slots.len());
        let at = engine_index(&self.slots, index);
        self.rules
            .insert_rule(&shell_text(&rule), at, self.profile)
            .map_err(rejected)?;

        let mut children = Vec::new();
        match (&rule, self.rules.get_mut(at)) {
            (Rule::Media(media), Some(CssRule::Media(css))) => {
                let mut nested = RuleListSink {
                    rules: &mut css.css_rules,
                    slots: &mut children,
                    profile: self.profile,
                };
                for (i, child) in media.rules.iter().enumerate() {
                    insert_or_dummy(&mut nested, i, child.clone());
                }
            }
            (Rule::Keyframes(keyframes), Some(CssRule::Keyframes(css))) => {
                let mut nested = KeyframeListSink {
                    rule: css,
                    slots: &mut children,
                    profile: self.profile,
                };
                for (i, keyframe) in keyframes.keyframes.iter().enumerate() {
                    insert_or_dummy(&mut nested, i, keyframe.clone());
                }
            }
            _ => {}
        }
        self.slots.insert(index, Slot::Live(children));
        Ok(())
    }

    fn insert_dummy(&mut self, index: usize) {
        let index = index.min(self.slots.len());
        self.slots.insert(index, Slot::Dummy);
    }

    fn remove_at(&mut self, index: usize) -> SinkResult<()> {
        if index >= self.slots.len() {
            return Err(SinkError::Missing { index });
        }
        let at = engine_index(&self.slots, index);
        if self.slots.remove(index).is_live() {
            self.rules
                .delete_rule(at)
                .map_err(|_| SinkError::Missing { index })?;
        }
        Ok(())
    }

    fn mutate_at(&mut self, index: usize, diff: &RuleDiff) -> SinkResult<()> {
        let at = engine_index(&self.slots, index);
        let children = match self.slots.get_mut(index) {
            Some(Slot::Live(children)) => children,
            _ => return Err(SinkError::Missing { index }),
        };
        let rule = self
            .rules
            .get_mut(at)
            .ok_or(SinkError::Missing { index })?;
        mutate_rule(rule, children, diff, self.profile)
    }

    fn check_change(&self, index: usize, diff: &RuleDiff) -> PatchResult<()> {
        check_live_rule(&self.rules, &self.slots, index, diff)
    }
}

/// Kind and nested fit of a field diff against the rule at `index`.
/// A dummy holds nothing to check; mutating it is a counted failure.
fn check_live_rule(
    rules: &CssRuleList,
    slots: &[Slot],
    index: usize,
    diff: &RuleDiff,
) -> PatchResult<()> {
    let Some(Slot::Live(children)) = slots.get(index) else {
        return Ok(());
    };
    let Some(rule) = rules.get(engine_index(slots, index)) else {
        return Ok(());
    };
    match (rule, diff) {
        (CssRule::Style(_), RuleDiff::Plain(_)) => Ok(()),
        (CssRule::Media(media), RuleDiff::Media(diff)) => match &diff.rules {
            Some(nested) => check_entries(children.len(), nested, |at, change| {
                check_live_rule(&media.css_rules, children, at, change)
            }),
            None => Ok(()),
        },
        (CssRule::Keyframes(_), RuleDiff::Keyframes(diff)) => match &diff.keyframes {
            Some(nested) => check_entries(children.len(), nested, |_, _| Ok(())),
            None => Ok(()),
        },
        (rule, diff) => Err(PatchError::KindMismatch {
            expected: rule.kind(),
            found: diff.kind(),
        }),
    }
}

fn mutate_rule(
    rule: &mut CssRule,
    children: &mut Vec<Slot>,
    diff: &RuleDiff,
    profile: &EngineProfile,
) -> SinkResult<()> {
    // Text setters the engine refuses leave the rest of the diff to apply.
    let mut refused = Ok(());
    match (rule, diff) {
        (CssRule::Style(rule), RuleDiff::Plain(diff)) => {
            if let Some(selector_text) = &diff.selector_text {
                let text = selector_text.as_deref().unwrap_or_default();
                refused = rule.set_selector_text(text, profile).map_err(rejected);
            }
            if let Some(style) = &diff.style {
                assign_style(&mut rule.style, style, profile);
            }
        }
        (CssRule::Media(rule), RuleDiff::Media(diff)) => {
            if let Some(media_text) = &diff.media_text {
                refused = rule.set_media_text(media_text).map_err(rejected);
            }
            if let Some(rules) = &diff.rules {
                let mut nested = RuleListSink {
                    rules: &mut rule.css_rules,
                    slots: children,
                    profile,
                };
                apply(&mut nested, rules)?;
            }
        }
        (CssRule::Keyframes(rule), RuleDiff::Keyframes(diff)) => {
            if let Some(name) = &diff.name {
                refused = rule.set_name(name).map_err(rejected);
            }
            if let Some(vendor_prefix) = &diff.vendor_prefix {
                refused = refused.and(rule.set_vendor_prefix(vendor_prefix, profile).map_err(rejected));
            }
            if let Some(keyframes) = &diff.keyframes {
                let mut nested = KeyframeListSink {
                    rule,
                    slots: children,
                    profile,
                };
                apply(&mut nested, keyframes)?;
            }
        }
        (rule, diff) => {
            return Err(SinkError::KindMismatch {
                expected: rule.kind(),
                found: diff.kind(),
            })
        }
    }
    refused
}

/// Sink over the keyframes of an engine keyframes rule
pub struct KeyframeListSink<'a> {
    rule: &'a mut CssKeyframesRule,
    slots: &'a mut Vec<Slot>,
    profile: &'a EngineProfile,
}

impl Sink for KeyframeListSink<'_> {
    type Item = Keyframe;
    type Diff = KeyframeDiff;

    fn count(&self) -> usize {
        self.slots.len()
    }

    fn get_at(&self, index: usize) -> Option<Keyframe> {
        match self.slots.get(index)? {
            Slot::Dummy => None,
            Slot::Live(_) => self
                .rule
                .iter()
                .nth(engine_index(&self.slots, index))
                .map(|keyframe| keyframe.to_keyframe()),
        }
    }

    fn insert_at(&mut self, index: usize, keyframe: Keyframe) -> SinkResult<()> {
        let index = index.min(self.slots.len());
        let at = engine_index(&self.slots, index);
        self.rule
            .insert_rule(&keyframe_text(&keyframe), at, self.profile)
            .map_err(rejected)?;
        self.slots.insert(index, Slot::leaf());
        Ok(())
    }

    fn insert_dummy(&mut self, index: usize) {
        let index = index.min(self.slots.len());
        self.slots.insert(index, Slot::Dummy);
    }

    fn remove_at(&mut self, index: usize) -> SinkResult<()> {
        if index >= self.slots.len() {
            return Err(SinkError::Missing { index });
        }
        let at = engine_index(&self.slots, index);
        if self.slots.remove(index).is_live() {
            self.rule
                .delete_rule(at)
                .map_err(|_| SinkError::Missing { index })?;
        }
        Ok(())
    }

    fn mutate_at(&mut self, index: usize, diff: &KeyframeDiff) -> SinkResult<()> {
        if !matches!(self.slots.get(index), Some(Slot::Live(_))) {
            return Err(SinkError::Missing { index });
        }
        let keyframe = self
            .rule
            .get_mut(engine_index(&self.slots, index))
            .ok_or(SinkError::Missing { index })?;

        let mut refused = Ok(());
        if let Some(key_text) = &diff.key_text {
            refused = keyframe.set_key_text(key_text).map_err(rejected);
        }
        if let Some(style) = &diff.style {
            assign_style(&mut keyframe.style, style, self.profile);
        }
        refused
    }
}
