use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Interface to listen on (overrides config and HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (overrides config and PORT)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Directory that sheet file names resolve against
    #[arg(long)]
    pub root: Option<String>,

    /// Do not watch sheet sources
    #[arg(long)]
    pub no_watch: bool,
}

pub fn serve(args: ServeArgs, cwd: &str) -> Result<()> {
    let mut config = Config::load(cwd)?.with_env(|name| std::env::var(name).ok())?;
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(root) = args.root {
        config.root_dir = root;
    }
    if args.no_watch {
        config.watch = false;
    }

    let server_config = config.server_config(cwd);
    println!(
        "{} scissors on {}",
        "Starting".green().bold(),
        server_config.address().cyan()
    );

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(scissors_workspace::serve(server_config))?;
    Ok(())
}
