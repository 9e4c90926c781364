//! Command dispatch and handler modules.

mod build;
mod bundle;
mod publish;
mod tree;

use std::path::PathBuf;

use miette::Result;

use keel_util::errors::KeelError;

use crate::cli::{Cli, Command};

/// Route a parsed CLI invocation to the appropriate command handler.
pub async fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Build { packages, locked } => build::exec(packages, locked),
        Command::Publish {
            targets,
            packages,
            json,
        } => publish::exec(packages, targets, json).await,
        Command::Tree {
            scope,
            depth,
            inverted,
            why,
            conflicts,
            packages,
        } => tree::exec(&scope, depth, inverted, why, conflicts, packages),
        Command::Bundle { packages } => bundle::exec(packages),
    }
}

fn current_dir() -> Result<PathBuf> {
    Ok(std::env::current_dir().map_err(KeelError::Io)?)
}
