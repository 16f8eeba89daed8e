use super::read_tree;
use anyhow::Result;
use clap::Args;
use scissors_rules::RuleTree;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct FmtArgs {
    /// Stylesheet to reprint
    pub file: PathBuf,

    /// Print the rule tree as JSON instead of CSS
    #[arg(long)]
    pub json: bool,
}

pub fn fmt(args: FmtArgs, _cwd: &str) -> Result<()> {
    let tree = read_tree(&args.file)?;
    println!("{}", render_tree(&tree, args.json)?);
    Ok(())
}

pub fn render_tree(tree: &RuleTree, json: bool) -> Result<String> {
    if json {
        Ok(serde_json::to_string_pretty(&tree.to_json())?)
    } else {
        Ok(tree.to_css())
    }
}
