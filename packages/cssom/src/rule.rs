//! Engine-side rule objects

use crate::declaration::CssStyleDeclaration;
use crate::error::{EngineError, EngineResult};
use crate::profile::EngineProfile;
use scissors_rules::{parse, Keyframe, KeyframesRule, Rule, RuleKind, RuleTree};
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum CssRule {
    Style(CssStyleRule),
    Media(CssMediaRule),
    Keyframes(CssKeyframesRule),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CssStyleRule {
    selector_text: String,
    pub style: CssStyleDeclaration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CssMediaRule {
    media_text: String,
    pub css_rules: CssRuleList,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CssKeyframesRule {
    name: String,
    vendor_prefix: String,
    css_rules: Vec<CssKeyframeRule>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CssKeyframeRule {
    key_text: String,
    pub style: CssStyleDeclaration,
}

/// Ordered list of rules, as held by a sheet or a media rule
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CssRuleList(Vec<CssRule>);

impl CssRule {
    /// Convert a tree rule, validating it against the engine.
    ///
    /// Nested rules and keyframes the engine cannot use are dropped, the way
    /// a browser drops them while parsing a block.
    pub fn from_rule(rule: &Rule, profile: &EngineProfile) -> EngineResult<Self> {
        match rule {
            Rule::Plain(plain) => {
                validate_selector(&plain.selector_text, profile)?;
                Ok(CssRule::Style(CssStyleRule {
                    selector_text: plain.selector_text.clone(),
                    style: CssStyleDeclaration::from_style(&plain.style, profile),
                }))
            }
            Rule::Media(media) => {
                if !profile.supports_media {
                    return Err(EngineError::syntax("@media is not supported"));
                }
                validate_media(&media.media_text)?;
                let mut css_rules = CssRuleList::new();
                for child in &media.rules {
                    match CssRule::from_rule(child, profile) {
                        Ok(child) => css_rules.0.push(child),
                        Err(error) => debug!(%error, "Dropping nested rule"),
                    }
                }
                Ok(CssRule::Media(CssMediaRule {
                    media_text: media.media_text.clone(),
                    css_rules,
                }))
            }
            Rule::Keyframes(keyframes) => {
                validate_keyframes_prefix(&keyframes.vendor_prefix, profile)?;
                validate_name(&keyframes.name)?;
                let css_rules = keyframes
                    .keyframes
                    .iter()
                    .filter_map(|keyframe| match CssKeyframeRule::from_keyframe(keyframe, profile) {
                        Ok(keyframe) => Some(keyframe),
                        Err(error) => {
                            debug!(%error, "Dropping keyframe");
                            None
                        }
                    })
                    .collect();
                Ok(CssRule::Keyframes(CssKeyframesRule {
                    name: keyframes.name.clone(),
                    vendor_prefix: keyframes.vendor_prefix.clone(),
                    css_rules,
                }))
            }
            Rule::Comment(_) => Err(EngineError::syntax("a comment is not a rule")),
        }
    }

    pub fn kind(&self) -> RuleKind {
        match self {
            CssRule::Style(_) => RuleKind::Plain,
            CssRule::Media(_) => RuleKind::Media,
            CssRule::Keyframes(_) => RuleKind::Keyframes,
        }
    }

    /// Read back as a tree rule
    pub fn to_rule(&self) -> Rule {
        match self {
            CssRule::Style(rule) => Rule::plain(rule.selector_text.clone(), rule.style.to_style()),
            CssRule::Media(rule) => Rule::media(rule.media_text.clone(), rule.css_rules.to_rule_tree()),
            CssRule::Keyframes(rule) => Rule::Keyframes(KeyframesRule {
                name: rule.name.clone(),
                vendor_prefix: rule.vendor_prefix.clone(),
                keyframes: rule.css_rules.iter().map(CssKeyframeRule::to_keyframe).collect(),
            }),
        }
    }

    pub fn css_text(&self) -> String {
        RuleTree::from_rules(vec![self.to_rule()]).to_css()
    }
}

impl CssStyleRule {
    pub fn selector_text(&self) -> &str {
        &self.selector_text
    }

    /// Replace the selector. An invalid selector leaves the rule as it was.
    pub fn set_selector_text(&mut self, text: &str, profile: &EngineProfile) -> EngineResult<()> {
        validate_selector(text, profile)?;
        self.selector_text = text.to_string();
        Ok(())
    }
}

impl CssMediaRule {
    pub fn media_text(&self) -> &str {
        &self.media_text
    }

    pub fn set_media_text(&mut self, text: &str) -> EngineResult<()> {
        validate_media(text)?;
        self.media_text = text.to_string();
        Ok(())
    }
}

impl CssKeyframesRule {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vendor_prefix(&self) -> &str {
        &self.vendor_prefix
    }

    pub fn set_name(&mut self, name: &str) -> EngineResult<()> {
        validate_name(name)?;
        self.name = name.to_string();
        Ok(())
    }

    pub fn set_vendor_prefix(&mut self, prefix: &str, profile: &EngineProfile) -> EngineResult<()> {
        validate_keyframes_prefix(prefix, profile)?;
        self.vendor_prefix = prefix.to_string();
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.css_rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.css_rules.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CssKeyframeRule> {
        self.css_rules.iter()
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut CssKeyframeRule> {
        self.css_rules.get_mut(index)
    }

    /// Last keyframe with the given key, as `findRule` resolves duplicates
    pub fn find_rule(&self, key_text: &str) -> Option<&CssKeyframeRule> {
        self.css_rules.iter().rev().find(|k| k.key_text == key_text)
    }

    /// Parse a single keyframe block such as `50% { top: 0 }` and insert it
    pub fn insert_rule(
        &mut self,
        text: &str,
        index: usize,
        profile: &EngineProfile,
    ) -> EngineResult<usize> {
        if index > self.css_rules.len() {
            return Err(EngineError::IndexSize {
                index,
                len: self.css_rules.len(),
            });
        }
        // A keyframe block has the shape of a style rule with the key as selector.
        let keyframe = match parse_single(text)? {
            Rule::Plain(plain) => Keyframe::new(plain.selector_text, plain.style),
            other => {
                return Err(EngineError::syntax(format!(
                    "expected a keyframe, found a {} rule",
                    other.kind()
                )))
            }
        };
        let keyframe = CssKeyframeRule::from_keyframe(&keyframe, profile)?;
        self.css_rules.insert(index, keyframe);
        Ok(index)
    }

    pub fn delete_rule(&mut self, index: usize) -> EngineResult<()> {
        if index >= self.css_rules.len() {
            return Err(EngineError::IndexSize {
                index,
                len: self.css_rules.len(),
            });
        }
        self.css_rules.remove(index);
        Ok(())
    }
}

impl CssKeyframeRule {
    pub fn from_keyframe(keyframe: &Keyframe, profile: &EngineProfile) -> EngineResult<Self> {
        validate_key_text(&keyframe.key_text)?;
        Ok(Self {
            key_text: keyframe.key_text.clone(),
            style: CssStyleDeclaration::from_style(&keyframe.style, profile),
        })
    }

    pub fn key_text(&self) -> &str {
        &self.key_text
    }

    pub fn set_key_text(&mut self, text: &str) -> EngineResult<()> {
        validate_key_text(text)?;
        self.key_text = text.to_string();
        Ok(())
    }

    pub fn to_keyframe(&self) -> Keyframe {
        Keyframe::new(self.key_text.clone(), self.style.to_style())
    }
}

impl CssRuleList {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CssRule> {
        self.0.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut CssRule> {
        self.0.get_mut(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CssRule> {
        self.0.iter()
    }

    /// Parse exactly one rule from `text` and insert it at `index`
    pub fn insert_rule(
        &mut self,
        text: &str,
        index: usize,
        profile: &EngineProfile,
    ) -> EngineResult<usize> {
        if index > self.0.len() {
            return Err(EngineError::IndexSize {
                index,
                len: self.0.len(),
            });
        }
        let rule = CssRule::from_rule(&parse_single(text)?, profile)?;
        self.0.insert(index, rule);
        Ok(index)
    }

    pub fn delete_rule(&mut self, index: usize) -> EngineResult<()> {
        if index >= self.0.len() {
            return Err(EngineError::IndexSize {
                index,
                len: self.0.len(),
            });
        }
        self.0.remove(index);
        Ok(())
    }

    pub fn to_rule_tree(&self) -> RuleTree {
        self.0.iter().map(CssRule::to_rule).collect()
    }

    pub(crate) fn push(&mut self, rule: CssRule) {
        self.0.push(rule);
    }
}

fn parse_single(text: &str) -> EngineResult<Rule> {
    let mut rules = parse(text)
        .map_err(|e| EngineError::syntax(e.to_string()))?
        .into_iter()
        .filter(|rule| !rule.is_comment());
    match (rules.next(), rules.next()) {
        (Some(rule), None) => Ok(rule),
        (None, _) => Err(EngineError::syntax("no rule found")),
        (Some(_), Some(_)) => Err(EngineError::syntax("expected a single rule")),
    }
}

fn validate_selector(text: &str, profile: &EngineProfile) -> EngineResult<()> {
    if text.trim().is_empty() {
        return Err(EngineError::syntax("empty selector"));
    }
    if let Some(prefix) = profile.foreign_prefix_in(text) {
        return Err(EngineError::syntax(format!(
            "'{}' uses {} syntax unknown to {}",
            text, prefix, profile.name
        )));
    }
    Ok(())
}

fn validate_media(text: &str) -> EngineResult<()> {
    if text.trim().is_empty() {
        return Err(EngineError::syntax("empty media query"));
    }
    Ok(())
}

fn validate_name(name: &str) -> EngineResult<()> {
    if name.trim().is_empty() || name.contains(char::is_whitespace) {
        return Err(EngineError::syntax(format!("invalid keyframes name '{}'", name)));
    }
    Ok(())
}

fn validate_keyframes_prefix(prefix: &str, profile: &EngineProfile) -> EngineResult<()> {
    if !profile.accepts_prefix(prefix) {
        return Err(EngineError::syntax(format!(
            "@{}keyframes is unknown to {}",
            prefix, profile.name
        )));
    }
    Ok(())
}

/// `from`, `to` or percentages, comma separated
fn validate_key_text(text: &str) -> EngineResult<()> {
    let valid = !text.trim().is_empty()
        && text.split(',').map(str::trim).all(|key| match key {
            "from" | "to" => true,
            _ => key
                .strip_suffix('%')
                .and_then(|n| n.parse::<f64>().ok())
                .map_or(false, |n| (0.0..=100.0).contains(&n)),
        });
    if valid {
        Ok(())
    } else {
        Err(EngineError::syntax(format!("invalid keyframe selector '{}'", text)))
    }
}

/// Plain tree style of a keyframe block, for building insertion text
pub(crate) fn keyframe_text(keyframe: &Keyframe) -> String {
    rule_text(&Rule::plain(keyframe.key_text.clone(), keyframe.style.clone()))
}

pub(crate) fn rule_text(rule: &Rule) -> String {
    RuleTree::from_rules(vec![rule.clone()]).to_css()
}

/// Text of a media or keyframes rule with its children left out
pub(crate) fn shell_text(rule: &Rule) -> String {
    match rule {
        Rule::Media(media) => rule_text(&Rule::media(media.media_text.clone(), RuleTree::new())),
        Rule::Keyframes(keyframes) => rule_text(&Rule::Keyframes(KeyframesRule {
            name: keyframes.name.clone(),
            vendor_prefix: keyframes.vendor_prefix.clone(),
            keyframes: Vec::new(),
        })),
        other => rule_text(other),
    }
}
