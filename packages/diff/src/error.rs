//! Error types for diff decoding and patch application

use scissors_rules::RuleKind;
use thiserror::Error;

/// A wire diff that could not be decoded. The whole message is ignored.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Malformed diff: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// A diff that does not fit the sink it is applied to
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatchError {
    #[error("Diff entry {entry} changes index {index}, but only {len} entries exist at that point")]
    OutOfBounds { entry: usize, index: usize, len: usize },

    #[error("Cannot apply a {found} diff to a {expected} rule")]
    KindMismatch { expected: RuleKind, found: RuleKind },

    #[error("Diff entry {entry} does not fit: {source}")]
    Misfit {
        entry: usize,
        source: Box<PatchError>,
    },
}

/// Failure reported by a sink for a single operation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SinkError {
    #[error("Insertion rejected: {reason}")]
    Rejected { reason: String },

    #[error("No entry at index {index}")]
    Missing { index: usize },

    #[error("Cannot apply a {found} diff to a {expected} rule")]
    KindMismatch { expected: RuleKind, found: RuleKind },

    #[error("Nested patch failed: {0}")]
    Nested(#[from] PatchError),
}

impl SinkError {
    pub fn rejected(reason: impl Into<String>) -> Self {
        SinkError::Rejected {
            reason: reason.into(),
        }
    }
}

pub type PatchResult<T> = Result<T, PatchError>;
pub type SinkResult<T> = Result<T, SinkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = SinkError::KindMismatch {
            expected: RuleKind::Media,
            found: RuleKind::Plain,
        };
        assert_eq!(err.to_string(), "Cannot apply a rule diff to a media rule");

        let err: SinkError = PatchError::OutOfBounds {
            entry: 2,
            index: 5,
            len: 3,
        }
        .into();
        assert!(err.to_string().contains("changes index 5"));

        let err = PatchError::Misfit {
            entry: 1,
            source: Box::new(PatchError::KindMismatch {
                expected: RuleKind::Media,
                found: RuleKind::Plain,
            }),
        };
        assert_eq!(
            err.to_string(),
            "Diff entry 1 does not fit: Cannot apply a rule diff to a media rule"
        );
    }

    #[test]
    fn test_codec_error_wraps_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = CodecError::from(json_err);
        assert!(err.to_string().starts_with("Malformed diff"));
    }
}
