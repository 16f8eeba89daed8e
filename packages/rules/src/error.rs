//! Error types for building rule trees

use thiserror::Error;

/// Result type for parsing operations
pub type ParseResult<T> = Result<T, ParseError>;

/// Result type for structured (JSON) rule input
pub type StructureResult<T> = Result<T, StructureError>;

/// Byte range into the parsed source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceSpan {
    pub start: usize,
    pub end: usize,
}

impl SourceSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

impl From<std::ops::Range<usize>> for SourceSpan {
    fn from(range: std::ops::Range<usize>) -> Self {
        Self::new(range.start, range.end)
    }
}

/// Parse error with location and context
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected token at {span:?}: expected {expected}, found {found}")]
    UnexpectedToken {
        span: SourceSpan,
        expected: String,
        found: String,
    },

    #[error("Unexpected end of input: expected {expected}")]
    UnexpectedEof { expected: String },

    #[error("Invalid syntax at {span:?}: {message}")]
    InvalidSyntax { span: SourceSpan, message: String },

    #[error("Lexer error at {span:?}")]
    LexError { span: SourceSpan },
}

impl ParseError {
    pub fn unexpected_token(
        span: impl Into<SourceSpan>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::UnexpectedToken {
            span: span.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn unexpected_eof(expected: impl Into<String>) -> Self {
        Self::UnexpectedEof {
            expected: expected.into(),
        }
    }

    pub fn invalid_syntax(span: impl Into<SourceSpan>, message: impl Into<String>) -> Self {
        Self::InvalidSyntax {
            span: span.into(),
            message: message.into(),
        }
    }

    pub fn lex_error(span: impl Into<SourceSpan>) -> Self {
        Self::LexError { span: span.into() }
    }

    pub fn span(&self) -> Option<SourceSpan> {
        match self {
            ParseError::UnexpectedToken { span, .. } => Some(*span),
            ParseError::UnexpectedEof { .. } => None,
            ParseError::InvalidSyntax { span, .. } => Some(*span),
            ParseError::LexError { span } => Some(*span),
        }
    }
}

/// Structured rule input that does not have the shape of a rule tree
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StructureError {
    #[error("Expected {expected} at {path}")]
    WrongType { path: String, expected: &'static str },

    #[error("Missing field '{field}' at {path}")]
    MissingField { path: String, field: &'static str },

    #[error("Rule text at {path} failed to parse: {source}")]
    RuleText {
        path: String,
        #[source]
        source: ParseError,
    },
}

/// Pretty-print a parse error with source context using ariadne
#[cfg(feature = "pretty-errors")]
pub fn format_error(source: &str, filename: &str, error: &ParseError) -> String {
    use ariadne::{Color, Label, Report, ReportKind, Source};

    let span = error.span().unwrap_or(SourceSpan {
        start: source.len().saturating_sub(1),
        end: source.len(),
    });

    let label = match error {
        ParseError::UnexpectedToken { expected, .. } | ParseError::UnexpectedEof { expected } => {
            format!("expected {}", expected)
        }
        ParseError::InvalidSyntax { message, .. } => message.clone(),
        ParseError::LexError { .. } => "unrecognized input".to_string(),
    };

    let mut output = Vec::new();
    let written = Report::build(ReportKind::Error, filename, span.start)
        .with_message(error.to_string())
        .with_label(
            Label::new((filename, span.start..span.end))
                .with_color(Color::Red)
                .with_message(label),
        )
        .finish()
        .write((filename, Source::from(source)), &mut output);

    match written {
        Ok(()) => String::from_utf8(output).unwrap_or_else(|_| error.to_string()),
        Err(_) => error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_span() {
        let err = ParseError::invalid_syntax(4..9, "bad");
        assert_eq!(err.span(), Some(SourceSpan::new(4, 9)));
        assert_eq!(ParseError::unexpected_eof("'}'").span(), None);
    }

    #[cfg(feature = "pretty-errors")]
    #[test]
    fn test_format_error_mentions_message() {
        let source = "a { color red }";
        let err = ParseError::invalid_syntax(4..13, "expected ':' after property name");
        let formatted = format_error(source, "test.css", &err);
        assert!(formatted.contains("expected ':' after property name"));
    }
}
