use super::{fmt::render_tree, read_tree};
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use scissors_diff::{apply, PatchReport, RulesDiff};
use scissors_rules::RuleTree;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct PatchArgs {
    /// Stylesheet to patch
    pub base: PathBuf,

    /// Wire diff as JSON
    pub diff: PathBuf,

    /// Print the result as a JSON rule tree instead of CSS
    #[arg(long)]
    pub json: bool,
}

pub fn patch(args: PatchArgs, _cwd: &str) -> Result<()> {
    let mut tree = read_tree(&args.base)?;
    let text = std::fs::read_to_string(&args.diff)
        .with_context(|| format!("Cannot read {}", args.diff.display()))?;

    let report = patch_tree(&mut tree, &text)
        .with_context(|| format!("Cannot apply {}", args.diff.display()))?;
    if !report.is_clean() {
        eprintln!(
            "{} {} removals and {} field changes did not apply",
            "Warning:".yellow().bold(),
            report.failed_removals,
            report.failed_mutations
        );
    }

    println!("{}", render_tree(&tree, args.json)?);
    Ok(())
}

/// Decode a wire diff and apply it to `tree`
pub fn patch_tree(tree: &mut RuleTree, diff_text: &str) -> Result<PatchReport> {
    let rules_diff = RulesDiff::from_json_str(diff_text)?;
    Ok(apply(tree, &rules_diff)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_tree() {
        let mut tree = RuleTree::from_text("a { color: red } b { top: 0 }").unwrap();
        let report = patch_tree(&mut tree, r#"[{"style":{"color":"blue"}},{"remove":1}]"#).unwrap();
        assert_eq!(tree, RuleTree::from_text("a { color: blue }").unwrap());
        assert_eq!(report.mutated, 1);
        assert_eq!(report.removed, 1);
    }

    #[test]
    fn test_bad_diffs_leave_tree_alone() {
        let original = RuleTree::from_text("a { color: red }").unwrap();
        let mut tree = original.clone();
        assert!(patch_tree(&mut tree, r#"[{"remove":0}]"#).is_err());
        assert!(patch_tree(&mut tree, r#"[{"skip":3,"style":{"top":"0"}}]"#).is_err());
        assert_eq!(tree, original);
    }
}
