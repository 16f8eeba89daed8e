//! # Scissors Rules
//!
//! Typed model of a stylesheet as an ordered tree of rules, plus the two
//! ways of building one:
//!
//! - [`RuleTree::from_text`]: parse CSS source text
//! - [`RuleTree::from_structured`]: import the JSON form sent by a client
//!
//! and the two ways of reading it back out ([`RuleTree::to_json`],
//! [`RuleTree::to_css`]).

pub mod error;
pub mod parser;
pub mod rule;
pub mod serializer;
pub mod style;
mod structured;
pub mod tokenizer;
pub mod tree;

pub use error::{ParseError, ParseResult, SourceSpan, StructureError, StructureResult};
#[cfg(feature = "pretty-errors")]
pub use error::format_error;
pub use parser::{parse, Parser};
pub use rule::{Comment, Keyframe, KeyframesRule, MediaRule, PlainRule, Rule, RuleKind};
pub use serializer::{serialize, Serializer};
pub use style::Style;
pub use tokenizer::{tokenize, Token};
pub use tree::RuleTree;
