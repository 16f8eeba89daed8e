mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{diff, fmt, patch, serve, DiffArgs, FmtArgs, PatchArgs, ServeArgs};
use tracing_subscriber::EnvFilter;

/// Scissors - live stylesheet sync between editors and browsers
#[derive(Parser, Debug)]
#[command(name = "scissors")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log filter, e.g. `debug` or `scissors_diff=trace` (defaults to RUST_LOG, then info)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the wire diff between two stylesheets
    Diff(DiffArgs),

    /// Apply a wire diff to a stylesheet
    Patch(PatchArgs),

    /// Reprint a stylesheet through the rule tree
    Fmt(FmtArgs),

    /// Run the synchronization server
    Serve(ServeArgs),
}

fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    let result = std::env::current_dir()
        .map_err(anyhow::Error::from)
        .and_then(|cwd| {
            let cwd = cwd.display().to_string();
            match cli.command {
                Command::Diff(args) => diff(args, &cwd),
                Command::Patch(args) => patch(args, &cwd),
                Command::Fmt(args) => fmt(args, &cwd),
                Command::Serve(args) => serve(args, &cwd),
            }
        });

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
