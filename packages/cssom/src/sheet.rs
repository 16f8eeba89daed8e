use crate::error::EngineResult;
use crate::profile::EngineProfile;
use crate::rule::{CssRule, CssRuleList};
use scissors_rules::{parse, ParseResult, RuleTree};
use tracing::debug;

/// A style sheet owned by an emulated engine
#[derive(Debug, Clone, PartialEq)]
pub struct StyleSheet {
    profile: EngineProfile,
    css_rules: CssRuleList,
}

impl StyleSheet {
    pub fn new(profile: EngineProfile) -> Self {
        Self {
            profile,
            css_rules: CssRuleList::new(),
        }
    }

    /// Load source text as a `<style>` element would. Rules the engine
    /// rejects are dropped; only text that does not parse at all fails.
    pub fn from_text(source: &str, profile: EngineProfile) -> ParseResult<Self> {
        let mut sheet = Self::new(profile);
        for rule in parse(source)?.iter().filter(|rule| !rule.is_comment()) {
            match CssRule::from_rule(rule, &sheet.profile) {
                Ok(rule) => sheet.css_rules.push(rule),
                Err(error) => debug!(%error, "Dropping rule"),
            }
        }
        Ok(sheet)
    }

    pub fn profile(&self) -> &EngineProfile {
        &self.profile
    }

    pub fn css_rules(&self) -> &CssRuleList {
        &self.css_rules
    }

    /// The rule list together with the profile it is validated against
    pub fn parts_mut(&mut self) -> (&mut CssRuleList, &EngineProfile) {
        (&mut self.css_rules, &self.profile)
    }

    pub fn insert_rule(&mut self, text: &str, index: usize) -> EngineResult<usize> {
        self.css_rules.insert_rule(text, index, &self.profile)
    }

    pub fn delete_rule(&mut self, index: usize) -> EngineResult<()> {
        self.css_rules.delete_rule(index)
    }

    pub fn to_rule_tree(&self) -> RuleTree {
        self.css_rules.to_rule_tree()
    }
}
