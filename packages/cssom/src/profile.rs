//! What syntax an engine understands

/// Vendor prefixes the engine knows about. Only its own is accepted.
pub const KNOWN_PREFIXES: &[&str] = &["-webkit-", "-moz-", "-ms-", "-o-"];

/// Capabilities of an emulated engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineProfile {
    pub name: String,
    /// `None` accepts every prefix
    pub vendor_prefix: Option<String>,
    pub supports_media: bool,
}

impl EngineProfile {
    pub fn permissive() -> Self {
        Self {
            name: "permissive".to_string(),
            vendor_prefix: None,
            supports_media: true,
        }
    }

    pub fn webkit() -> Self {
        Self {
            name: "webkit".to_string(),
            vendor_prefix: Some("-webkit-".to_string()),
            supports_media: true,
        }
    }

    pub fn gecko() -> Self {
        Self {
            name: "gecko".to_string(),
            vendor_prefix: Some("-moz-".to_string()),
            supports_media: true,
        }
    }

    /// Whether `@<prefix>keyframes` is understood
    pub fn accepts_prefix(&self, prefix: &str) -> bool {
        match &self.vendor_prefix {
            _ if prefix.is_empty() => true,
            None => true,
            Some(own) => own == prefix,
        }
    }

    /// First known prefix in `text` that belongs to another engine
    pub fn foreign_prefix_in(&self, text: &str) -> Option<&'static str> {
        let own = self.vendor_prefix.as_deref()?;
        KNOWN_PREFIXES
            .iter()
            .copied()
            .filter(|prefix| *prefix != own)
            .find(|prefix| text.contains(prefix))
    }

    pub fn accepts_property(&self, property: &str) -> bool {
        match &self.vendor_prefix {
            None => true,
            Some(own) => {
                property.starts_with(own.as_str())
                    || !KNOWN_PREFIXES.iter().any(|p| property.starts_with(p))
            }
        }
    }
}

impl Default for EngineProfile {
    fn default() -> Self {
        Self::permissive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_webkit_prefixes() {
        let profile = EngineProfile::webkit();
        assert!(profile.accepts_prefix(""));
        assert!(profile.accepts_prefix("-webkit-"));
        assert!(!profile.accepts_prefix("-moz-"));

        assert!(profile.accepts_property("color"));
        assert!(profile.accepts_property("-webkit-transform"));
        assert!(!profile.accepts_property("-moz-transform"));

        assert_eq!(profile.foreign_prefix_in("input::-moz-placeholder"), Some("-moz-"));
        assert_eq!(profile.foreign_prefix_in("input::-webkit-input-placeholder"), None);
    }

    #[test]
    fn test_permissive_accepts_everything() {
        let profile = EngineProfile::permissive();
        assert!(profile.accepts_prefix("-o-"));
        assert!(profile.accepts_property("-ms-filter"));
        assert_eq!(profile.foreign_prefix_in("a::-moz-selection"), None);
    }
}
