//! Applies a diff to a [`Sink`] with an explicit cursor.
//!
//! - a `skip` advances the cursor
//! - a removal deletes at the cursor and leaves it in place
//! - an insertion places at the cursor and moves past it
//! - a field diff mutates at the cursor and moves past it
//!
//! A bare `{skip}` marker does not occupy a slot. An insertion the sink
//! rejects leaves a dummy in its place so later indices stay aligned.
//!
//! Before anything is touched the whole diff, nested lists included, is
//! walked against the sink; a diff that does not fit is refused whole.

use crate::codec::{Diff, DiffEntry};
use crate::error::{PatchError, PatchResult, SinkResult};
use std::fmt::Debug;
use tracing::{trace, warn};

/// Indexable, mutable list that diffs are applied to
pub trait Sink {
    type Item;
    type Diff;

    fn count(&self) -> usize;

    fn get_at(&self, index: usize) -> Option<Self::Item>;

    fn insert_at(&mut self, index: usize, item: Self::Item) -> SinkResult<()>;

    /// Insert an inert entry that only holds a position
    fn insert_dummy(&mut self, index: usize);

    fn remove_at(&mut self, index: usize) -> SinkResult<()>;

    fn mutate_at(&mut self, index: usize, diff: &Self::Diff) -> SinkResult<()>;

    /// Check a field diff against the entry at `index` without applying it.
    /// Sinks whose entries hold nested lists check those lists here.
    fn check_change(&self, _index: usize, _diff: &Self::Diff) -> PatchResult<()> {
        Ok(())
    }
}

/// What happened while applying a diff
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchReport {
    pub inserted: usize,
    pub removed: usize,
    pub mutated: usize,
    pub dummies: usize,
    pub failed_removals: usize,
    pub failed_mutations: usize,
}

impl PatchReport {
    /// Every operation went through as described by the diff
    pub fn is_clean(&self) -> bool {
        self.dummies == 0 && self.failed_removals == 0 && self.failed_mutations == 0
    }
}

/// Apply `diff` to `sink`.
///
/// The diff is checked against the sink before anything is touched; a
/// field diff addressing a missing entry, or one of the wrong kind, fails
/// the whole call. Individual sink failures after that are logged and
/// counted.
pub fn apply<S>(sink: &mut S, diff: &Diff<S::Item, S::Diff>) -> PatchResult<PatchReport>
where
    S: Sink,
    S::Item: Clone + Debug,
{
    check_bounds(sink, diff)?;

    let mut report = PatchReport::default();
    let mut cursor = 0;

    for entry in diff {
        cursor += entry.skip();
        match entry {
            DiffEntry::Skip(_) => {}
            DiffEntry::Remove { remove, .. } => {
                remove_run(sink, cursor, *remove, &mut report);
            }
            DiffEntry::Insert { remove, item, .. } => {
                remove_run(sink, cursor, *remove, &mut report);
                insert(sink, cursor, item.clone(), &mut report);
                cursor += 1;
            }
            DiffEntry::Append(item) => {
                insert(sink, cursor, item.clone(), &mut report);
                cursor += 1;
            }
            DiffEntry::Change { diff, .. } => {
                match sink.mutate_at(cursor, diff) {
                    Ok(()) => report.mutated += 1,
                    Err(error) => {
                        warn!(index = cursor, %error, "Unable to apply field diff");
                        report.failed_mutations += 1;
                    }
                }
                cursor += 1;
            }
        }
    }

    Ok(report)
}

/// Walk the diff against `sink` without touching it
pub fn check_bounds<S: Sink>(sink: &S, diff: &Diff<S::Item, S::Diff>) -> PatchResult<()> {
    check_entries(sink.count(), diff, |index, change| sink.check_change(index, change))
}

/// Walk the diff against a list of `len` entries.
///
/// Every field diff must land on an entry that exists at that point; it is
/// handed to `check_existing` with that entry's index before patching.
pub fn check_entries<T, D, F>(len: usize, diff: &Diff<T, D>, mut check_existing: F) -> PatchResult<()>
where
    F: FnMut(usize, &D) -> PatchResult<()>,
{
    let mut len = len;
    let mut cursor = 0;
    // Insertions and removals so far; all of them sit before the cursor
    let mut inserted = 0;
    let mut removed = 0;

    for (entry_index, entry) in diff.iter().enumerate() {
        cursor += entry.skip();
        match entry {
            DiffEntry::Skip(_) => {}
            DiffEntry::Remove { remove, .. } => {
                let count = (*remove).min(len.saturating_sub(cursor));
                len -= count;
                removed += count;
            }
            DiffEntry::Insert { remove, .. } => {
                let count = (*remove).min(len.saturating_sub(cursor));
                len = len - count + 1;
                removed += count;
                inserted += 1;
                cursor += 1;
            }
            DiffEntry::Append(_) => {
                len += 1;
                inserted += 1;
                cursor += 1;
            }
            DiffEntry::Change { diff: change, .. } => {
                if cursor >= len {
                    return Err(PatchError::OutOfBounds {
                        entry: entry_index,
                        index: cursor,
                        len,
                    });
                }
                check_existing(cursor + removed - inserted, change).map_err(|source| {
                    PatchError::Misfit {
                        entry: entry_index,
                        source: Box::new(source),
                    }
                })?;
                cursor += 1;
            }
        }
    }

    Ok(())
}

fn remove_run<S>(sink: &mut S, index: usize, count: usize, report: &mut PatchReport)
where
    S: Sink,
    S::Item: Debug,
{
    for _ in 0..count {
        trace!(index, item = ?sink.get_at(index), "Removing");
        match sink.remove_at(index) {
            Ok(()) => report.removed += 1,
            Err(error) => {
                warn!(index, %error, "Unable to remove entry");
                report.failed_removals += 1;
            }
        }
    }
}

fn insert<S: Sink>(sink: &mut S, index: usize, item: S::Item, report: &mut PatchReport) {
    match sink.insert_at(index, item) {
        Ok(()) => report.inserted += 1,
        Err(error) => {
            warn!(index, %error, "Insertion rejected, holding the position with a dummy");
            sink.insert_dummy(index);
            report.dummies += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::RulesDiff;
    use crate::error::SinkError;
    use crate::field::RuleDiff;
    use scissors_rules::{Rule, RuleTree, Style};
    use serde_json::json;

    /// Holds `None` for dummies and refuses rules whose selector starts with `!`
    #[derive(Default)]
    struct PickySink {
        slots: Vec<Option<Rule>>,
    }

    impl Sink for PickySink {
        type Item = Rule;
        type Diff = RuleDiff;

        fn count(&self) -> usize {
            self.slots.len()
        }

        fn get_at(&self, index: usize) -> Option<Rule> {
            self.slots.get(index).cloned().flatten()
        }

        fn insert_at(&mut self, index: usize, rule: Rule) -> SinkResult<()> {
            if let Rule::Plain(plain) = &rule {
                if plain.selector_text.starts_with('!') {
                    return Err(SinkError::rejected("unsupported selector"));
                }
            }
            self.slots.insert(index.min(self.slots.len()), Some(rule));
            Ok(())
        }

        fn insert_dummy(&mut self, index: usize) {
            self.slots.insert(index.min(self.slots.len()), None);
        }

        fn remove_at(&mut self, index: usize) -> SinkResult<()> {
            if index >= self.slots.len() {
                return Err(SinkError::Missing { index });
            }
            self.slots.remove(index);
            Ok(())
        }

        fn mutate_at(&mut self, index: usize, diff: &RuleDiff) -> SinkResult<()> {
            match self.slots.get_mut(index) {
                Some(Some(rule)) => crate::memory::apply_rule_diff(rule, diff),
                _ => Err(SinkError::Missing { index }),
            }
        }
    }

    fn rules_diff(value: serde_json::Value) -> RulesDiff {
        RulesDiff::from_json(&value).unwrap()
    }

    fn plain(selector: &str) -> Rule {
        Rule::plain(selector, Style::new())
    }

    #[test]
    fn test_rejected_insert_becomes_dummy() {
        let mut sink = PickySink::default();
        let diff = rules_diff(json!([
            {"type": "rule", "selectorText": "a", "style": {}},
            {"type": "rule", "selectorText": "!bad", "style": {}},
            {"type": "rule", "selectorText": "c", "style": {}}
        ]));

        let report = apply(&mut sink, &diff).unwrap();
        assert_eq!(report.inserted, 2);
        assert_eq!(report.dummies, 1);
        assert!(!report.is_clean());
        assert_eq!(sink.slots, vec![Some(plain("a")), None, Some(plain("c"))]);
    }

    #[test]
    fn test_later_entries_stay_aligned_after_dummy() {
        let mut sink = PickySink::default();
        apply(
            &mut sink,
            &rules_diff(json!([
                {"type": "rule", "selectorText": "!x", "style": {}},
                {"type": "rule", "selectorText": "b", "style": {}}
            ])),
        )
        .unwrap();

        apply(&mut sink, &rules_diff(json!([{"skip": 1, "selectorText": "bb"}]))).unwrap();
        assert_eq!(sink.slots, vec![None, Some(plain("bb"))]);

        apply(&mut sink, &rules_diff(json!([{"remove": 1}]))).unwrap();
        assert_eq!(sink.slots, vec![Some(plain("bb"))]);
    }

    #[test]
    fn test_mutating_a_dummy_is_logged_not_fatal() {
        let mut sink = PickySink {
            slots: vec![None, Some(plain("b"))],
        };
        let report = apply(
            &mut sink,
            &rules_diff(json!([{"selectorText": "a"}, {"selectorText": "c"}])),
        )
        .unwrap();
        assert_eq!(report.failed_mutations, 1);
        assert_eq!(report.mutated, 1);
        assert_eq!(sink.slots, vec![None, Some(plain("c"))]);
    }

    #[test]
    fn test_out_of_bounds_change_touches_nothing() {
        let mut tree = RuleTree::from_rules(vec![plain("a")]);
        let diff = rules_diff(json!([
            {"remove": 1},
            {"selectorText": "b"}
        ]));

        let err = apply(&mut tree, &diff).unwrap_err();
        assert_eq!(
            err,
            PatchError::OutOfBounds {
                entry: 1,
                index: 0,
                len: 0
            }
        );
        assert_eq!(tree, RuleTree::from_rules(vec![plain("a")]));
    }

    #[test]
    fn test_missing_removals_are_counted() {
        let mut tree = RuleTree::from_rules(vec![plain("a")]);
        let report = apply(&mut tree, &rules_diff(json!([{"remove": 3}]))).unwrap();
        assert_eq!(report.removed, 1);
        assert_eq!(report.failed_removals, 2);
        assert!(tree.is_empty());
    }

    #[test]
    fn test_skip_marker_does_not_occupy_a_slot() {
        let mut tree = RuleTree::from_rules(vec![plain("a"), plain("b")]);
        apply(
            &mut tree,
            &rules_diff(json!([{"skip": 1}, {"type": "rule", "selectorText": "x", "style": {}}])),
        )
        .unwrap();
        assert_eq!(
            tree,
            RuleTree::from_rules(vec![plain("a"), plain("x"), plain("b")])
        );
    }

    #[test]
    fn test_check_bounds_follows_length() {
        let diff = rules_diff(json!([
            {"skip": 2},
            {"type": "rule", "selectorText": "c", "style": {}},
            {"style": {"top": "0"}}
        ]));
        // The change lands on index 3, which exists only if the sink had 3 entries.
        let three = RuleTree::from_rules(vec![plain("a"), plain("b"), plain("d")]);
        assert!(check_bounds(&three, &diff).is_ok());
        let two = RuleTree::from_rules(vec![plain("a"), plain("b")]);
        assert!(check_bounds(&two, &diff).is_err());
    }

    #[test]
    fn test_nested_out_of_bounds_touches_nothing() {
        let before = RuleTree::from_text("a { top: 0 } @media print { b { top: 0 } }").unwrap();
        let mut tree = before.clone();
        let diff = rules_diff(json!([
            {"style": {"top": "9px"}},
            {"rules": [{"skip": 4, "style": {"top": "1px"}}]}
        ]));

        let err = apply(&mut tree, &diff).unwrap_err();
        assert_eq!(
            err,
            PatchError::Misfit {
                entry: 1,
                source: Box::new(PatchError::OutOfBounds {
                    entry: 0,
                    index: 4,
                    len: 1
                }),
            }
        );
        assert_eq!(tree, before);
    }

    #[test]
    fn test_kind_mismatch_touches_nothing() {
        let before = RuleTree::from_text("a { top: 0 } b { top: 0 }").unwrap();
        let mut tree = before.clone();
        let diff = rules_diff(json!([
            {"style": {"top": "9px"}},
            {"mediaText": "print"}
        ]));

        assert!(matches!(
            apply(&mut tree, &diff),
            Err(PatchError::Misfit { entry: 1, .. })
        ));
        assert_eq!(tree, before);
    }

    #[test]
    fn test_changes_are_checked_against_the_entry_they_land_on() {
        // After removing `a` and replacing `b`, the change lands on the media rule
        let tree = RuleTree::from_text("a { top: 0 } b { top: 0 } @media print { c { top: 0 } }").unwrap();
        let fits = rules_diff(json!([
            {"remove": 1},
            {"insert": {"type": "rule", "selectorText": "x", "style": {}}, "remove": 1},
            {"mediaText": "screen"}
        ]));
        assert!(check_bounds(&tree, &fits).is_ok());

        let wrong_kind = rules_diff(json!([
            {"remove": 1},
            {"insert": {"type": "rule", "selectorText": "x", "style": {}}, "remove": 1},
            {"selectorText": "y"}
        ]));
        assert!(matches!(
            check_bounds(&tree, &wrong_kind),
            Err(PatchError::Misfit { entry: 2, .. })
        ));
    }
}
