//! Keel CLI binary.
//!
//! This is the entry point for the `keel` command-line tool. It parses
//! arguments with `clap`, initializes logging via `tracing`, and dispatches
//! to the appropriate command handler.

mod cli;
mod commands;

use miette::Result;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::parse();

    let default = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .init();

    commands::dispatch(args).await
}
