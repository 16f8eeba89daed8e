use crate::profile::EngineProfile;
use indexmap::IndexMap;
use scissors_rules::Style;
use tracing::debug;

const IMPORTANT: &str = "!important";

#[derive(Debug, Clone, PartialEq, Eq)]
struct Declaration {
    value: String,
    important: bool,
}

/// Ordered property declarations of a rule, with priority kept apart from
/// the value as a browser does
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CssStyleDeclaration {
    declarations: IndexMap<String, Declaration>,
}

impl CssStyleDeclaration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a tree style, dropping what the engine does not understand
    pub fn from_style(style: &Style, profile: &EngineProfile) -> Self {
        let mut declaration = Self::new();
        for (property, value) in style.iter() {
            declaration.assign(property, value, profile);
        }
        declaration
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    pub fn get_property_value(&self, property: &str) -> Option<&str> {
        self.declarations.get(property).map(|d| d.value.as_str())
    }

    /// `"important"` or `""`
    pub fn get_property_priority(&self, property: &str) -> &'static str {
        match self.declarations.get(property) {
            Some(d) if d.important => "important",
            _ => "",
        }
    }

    pub fn set_property(&mut self, property: &str, value: &str, priority: &str) {
        if value.is_empty() {
            self.remove_property(property);
            return;
        }
        let declaration = Declaration {
            value: value.to_string(),
            important: priority.eq_ignore_ascii_case("important"),
        };
        match self.declarations.get_mut(property) {
            Some(existing) => *existing = declaration,
            None => {
                self.declarations.insert(property.to_string(), declaration);
            }
        }
    }

    pub fn remove_property(&mut self, property: &str) -> Option<String> {
        self.declarations.shift_remove(property).map(|d| d.value)
    }

    /// Set a property from tree text, where priority is part of the value.
    /// An empty value removes the property. Returns false when the engine
    /// ignores the property.
    pub fn assign(&mut self, property: &str, text: &str, profile: &EngineProfile) -> bool {
        if !profile.accepts_property(property) {
            debug!(engine = %profile.name, property, "Ignoring unsupported property");
            return false;
        }
        let text = text.trim();
        match text.strip_suffix(IMPORTANT) {
            Some(value) => self.set_property(property, value.trim_end(), "important"),
            None => self.set_property(property, text, ""),
        }
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, bool)> {
        self.declarations
            .iter()
            .map(|(property, d)| (property.as_str(), d.value.as_str(), d.important))
    }

    /// Read back as a tree style, folding priority into the value
    pub fn to_style(&self) -> Style {
        self.iter()
            .map(|(property, value, important)| {
                let value = if important {
                    format!("{} {}", value, IMPORTANT)
                } else {
                    value.to_string()
                };
                (property, value)
            })
            .collect()
    }

    pub fn css_text(&self) -> String {
        self.iter()
            .map(|(property, value, important)| {
                if important {
                    format!("{}: {} {};", property, value, IMPORTANT)
                } else {
                    format!("{}: {};", property, value)
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_split_and_restored() {
        let profile = EngineProfile::permissive();
        let mut decl = CssStyleDeclaration::new();
        assert!(decl.assign("padding", "4px !important", &profile));
        assert_eq!(decl.get_property_value("padding"), Some("4px"));
        assert_eq!(decl.get_property_priority("padding"), "important");
        assert_eq!(decl.to_style(), Style::new().with("padding", "4px !important"));
        assert_eq!(decl.css_text(), "padding: 4px !important;");
    }

    #[test]
    fn test_empty_value_removes() {
        let profile = EngineProfile::permissive();
        let mut decl = CssStyleDeclaration::new();
        decl.assign("color", "red", &profile);
        decl.assign("color", "", &profile);
        assert!(decl.is_empty());
    }

    #[test]
    fn test_update_keeps_position() {
        let mut decl = CssStyleDeclaration::new();
        decl.set_property("a", "1", "");
        decl.set_property("b", "2", "");
        decl.set_property("a", "3", "");
        let props: Vec<_> = decl.iter().map(|(p, _, _)| p).collect();
        assert_eq!(props, vec!["a", "b"]);
    }

    #[test]
    fn test_foreign_properties_ignored() {
        let style = Style::new()
            .with("-moz-appearance", "none")
            .with("-webkit-appearance", "none")
            .with("color", "red");
        let decl = CssStyleDeclaration::from_style(&style, &EngineProfile::webkit());
        assert_eq!(decl.len(), 2);
        assert_eq!(decl.get_property_value("-moz-appearance"), None);
    }
}
