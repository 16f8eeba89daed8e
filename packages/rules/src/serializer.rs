use crate::rule::{Keyframe, Rule};
use crate::style::Style;
use crate::tree::RuleTree;

/// Serializer converts a rule tree back to CSS text
///
/// Rules are separated by a blank line, declarations go one per line. The
/// output re-parses to the same tree; whitespace inside selectors and values
/// is whatever the tree holds.
pub struct Serializer {
    indent_level: usize,
    indent_string: String,
}

impl Serializer {
    pub fn new() -> Self {
        Self {
            indent_level: 0,
            indent_string: "\t".to_string(),
        }
    }

    pub fn with_indent(indent: &str) -> Self {
        Self {
            indent_level: 0,
            indent_string: indent.to_string(),
        }
    }

    /// Serialize a rule tree to CSS
    pub fn serialize(&mut self, tree: &RuleTree) -> String {
        let mut output = String::new();
        self.serialize_rules(tree, &mut output);
        output
    }

    fn serialize_rules(&mut self, tree: &RuleTree, output: &mut String) {
        for (i, rule) in tree.iter().enumerate() {
            if i > 0 {
                output.push_str("\n\n");
            }
            self.serialize_rule(rule, output);
        }
    }

    fn serialize_rule(&mut self, rule: &Rule, output: &mut String) {
        match rule {
            Rule::Plain(plain) => self.serialize_block(&plain.selector_text, &plain.style, output),
            Rule::Media(media) => {
                self.write_indent(output);
                output.push_str("@media ");
                output.push_str(&media.media_text);
                output.push_str(" {\n");
                if !media.rules.is_empty() {
                    self.indent_level += 1;
                    self.serialize_rules(&media.rules, output);
                    self.indent_level -= 1;
                    output.push('\n');
                }
                self.write_indent(output);
                output.push('}');
            }
            Rule::Keyframes(keyframes) => {
                self.write_indent(output);
                output.push('@');
                output.push_str(&keyframes.vendor_prefix);
                output.push_str("keyframes ");
                output.push_str(&keyframes.name);
                output.push_str(" {\n");
                self.indent_level += 1;
                for keyframe in &keyframes.keyframes {
                    self.serialize_keyframe(keyframe, output);
                    output.push('\n');
                }
                self.indent_level -= 1;
                self.write_indent(output);
                output.push('}');
            }
            Rule::Comment(comment) => {
                self.write_indent(output);
                output.push_str("/*");
                output.push_str(&comment.text);
                output.push_str("*/");
            }
        }
    }

    fn serialize_keyframe(&mut self, keyframe: &Keyframe, output: &mut String) {
        self.serialize_block(&keyframe.key_text, &keyframe.style, output);
    }

    fn serialize_block(&mut self, prelude: &str, style: &Style, output: &mut String) {
        self.write_indent(output);
        output.push_str(prelude);
        output.push_str(" {\n");
        self.indent_level += 1;
        for (property, value) in style.iter() {
            self.write_indent(output);
            output.push_str(property);
            output.push_str(": ");
            output.push_str(value);
            output.push_str(";\n");
        }
        self.indent_level -= 1;
        self.write_indent(output);
        output.push('}');
    }

    fn write_indent(&self, output: &mut String) {
        for _ in 0..self.indent_level {
            output.push_str(&self.indent_string);
        }
    }
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience function to serialize a tree with default formatting
pub fn serialize(tree: &RuleTree) -> String {
    Serializer::new().serialize(tree)
}
