//! CLI argument definitions for Keel.
//!
//! Uses `clap` derive macros to define the command surface. Each command
//! corresponds to a handler in the [`super::commands`] module.

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "keel",
    version,
    about = "Dependency reconciliation and build planning for JVM workspaces",
    long_about = "Keel reconciles library versions across the modules of a workspace, \
                  plans each module's build from its plugins, and publishes the results \
                  to one or more Maven repositories."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve dependencies, write Keel.lock and plan every module
    Build {
        /// Build only these modules (and what they depend on)
        #[arg(short = 'p', long = "package")]
        packages: Vec<String>,
        /// Fail if Keel.lock would change
        #[arg(long)]
        locked: bool,
    },

    /// Publish built modules to the configured targets
    Publish {
        /// Publish only to these targets
        #[arg(short, long = "target")]
        targets: Vec<String>,
        /// Publish only these modules
        #[arg(short = 'p', long = "package")]
        packages: Vec<String>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Display the reconciled dependency tree
    Tree {
        /// Resolution scope to show
        #[arg(long, default_value = "main", value_parser = ["main", "test"])]
        scope: String,
        /// Maximum depth
        #[arg(long)]
        depth: Option<usize>,
        /// Show dependents instead of dependencies
        #[arg(long)]
        inverted: bool,
        /// Explain why a library is included
        #[arg(long)]
        why: Option<String>,
        /// Show only version decisions that changed something
        #[arg(long)]
        conflicts: bool,
        /// Show only these modules
        #[arg(short = 'p', long = "package")]
        packages: Vec<String>,
    },

    /// Merge module jars and their runtime libraries into fat jars
    Bundle {
        /// Bundle only these modules
        #[arg(short = 'p', long = "package")]
        packages: Vec<String>,
    },
}

/// Parse command-line arguments.
pub fn parse() -> Cli {
    Cli::parse()
}
