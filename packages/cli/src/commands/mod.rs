pub mod diff;
pub mod fmt;
pub mod patch;
pub mod serve;

pub use diff::{diff, DiffArgs};
pub use fmt::{fmt, FmtArgs};
pub use patch::{patch, PatchArgs};
pub use serve::{serve, ServeArgs};

use anyhow::{anyhow, Context, Result};
use scissors_rules::{format_error, RuleTree};
use std::path::Path;

/// Read and parse a stylesheet, pretty-printing parse errors
pub(crate) fn read_tree(path: &Path) -> Result<RuleTree> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read {}", path.display()))?;
    parse_tree(&source, path)
}

pub(crate) fn parse_tree(source: &str, path: &Path) -> Result<RuleTree> {
    RuleTree::from_text(source).map_err(|e| {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown");
        anyhow!("\n{}", format_error(source, file_name, &e))
    })
}
