//! # Scissors CSSOM
//!
//! A small emulation of a browser's CSS object model and [`LiveSheet`], the
//! patch sink that keeps one in step with a rule tree.
//!
//! The engine is deliberately picky: an [`EngineProfile`] decides which
//! vendor syntax it understands, and `insert_rule` refuses the rest with a
//! syntax error. `LiveSheet` absorbs those refusals with dummy slots so that
//! positional diffs keep landing on the right rules.

pub mod declaration;
pub mod error;
pub mod live;
pub mod profile;
pub mod rule;
pub mod sheet;

pub use declaration::CssStyleDeclaration;
pub use error::{EngineError, EngineResult};
pub use live::{KeyframeListSink, LiveSheet, RuleListSink};
pub use profile::{EngineProfile, KNOWN_PREFIXES};
pub use rule::{CssKeyframeRule, CssKeyframesRule, CssMediaRule, CssRule, CssRuleList, CssStyleRule};
pub use sheet::StyleSheet;
