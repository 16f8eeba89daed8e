use super::read_tree;
use anyhow::Result;
use clap::Args;
use scissors_rules::RuleTree;
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Args)]
pub struct DiffArgs {
    /// Stylesheet before the edit
    pub old: PathBuf,

    /// Stylesheet after the edit
    pub new: PathBuf,

    /// Indent the JSON output
    #[arg(long)]
    pub pretty: bool,
}

pub fn diff(args: DiffArgs, _cwd: &str) -> Result<()> {
    let old = read_tree(&args.old)?;
    let new = read_tree(&args.new)?;
    println!("{}", render_diff(&old, &new, args.pretty)?);
    Ok(())
}

/// Wire form of the diff from `old` to `new`
pub fn render_diff(old: &RuleTree, new: &RuleTree, pretty: bool) -> Result<String> {
    let rules_diff = scissors_diff::diff(old, new);
    debug!(entries = rules_diff.len(), "Computed diff");
    let value = rules_diff.to_json();
    Ok(if pretty {
        serde_json::to_string_pretty(&value)?
    } else {
        serde_json::to_string(&value)?
    })
}
