//! unitgraph CLI - unit dependency analysis for Pascal sources.
//!
//! Usage:
//!   unitgraph uses Project.dpr --root src            # Write Project.txt
//!   unitgraph uses Project.dpr -r src -o deps.dot    # Graphviz output
//!   unitgraph uses Project.dpr -r src --why Utils    # Why is Utils included
//!   unitgraph cycles Project.dpr -r src              # Circular interface uses
//!   unitgraph tokenize Unit1.pas --comments          # Token stream
//!   unitgraph search-path src                        # Search path for a tree

use anyhow::Result;
use clap::Parser;
use std::io::{self, Write};
use tracing_subscriber::EnvFilter;
use unitgraph::cli::{run, Cli};

fn main() {
    let cli = Cli::parse();

    // Reports go to stdout; diagnostics stay on stderr.
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    if let Err(e) = execute(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn execute(cli: Cli) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    run(cli, &mut out)?;
    out.flush()?;
    Ok(())
}
