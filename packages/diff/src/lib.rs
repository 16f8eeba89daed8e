//! # Scissors Diff
//!
//! Positional diff and patch of rule trees.
//!
//! ```text
//! diff(old, new) -> RulesDiff -> to_json() ==> wire ==> from_json() -> apply(sink)
//! ```
//!
//! The differ aligns lists by index only. Reordered or interior removals show
//! up as a run of field diffs and replacements rather than moves.

pub mod codec;
pub mod differ;
pub mod error;
pub mod field;
pub mod memory;
pub mod patcher;

pub use codec::{Diff, DiffEntry, KeyframeEntry, KeyframesDiff, RuleEntry, RulesDiff, WireItem};
pub use differ::{diff, diff_sequence, diff_style, Delta, Diffable};
pub use error::{CodecError, PatchError, PatchResult, SinkError, SinkResult};
pub use field::{KeyframeDiff, KeyframesRuleDiff, MediaRuleDiff, PlainRuleDiff, RuleDiff, StyleDiff};
pub use memory::{apply_keyframe_diff, apply_rule_diff, apply_style_diff, check_rule_diff};
pub use patcher::{apply, check_bounds, check_entries, PatchReport, Sink};
