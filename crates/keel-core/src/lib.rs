//! Core data types for the Keel build engine.
//!
//! This crate defines what a Keel project *declares*: manifest parsing,
//! modules and workspaces, dependency references, the version catalog,
//! forced-version and exclusion rules, source sets, the lockfile, global
//! configuration, and `.keel.env` interpolation.
//!
//! This crate is intentionally free of async code and network I/O.

/// Name of the manifest file at the workspace root and in every member.
pub const MANIFEST_FILE: &str = "Keel.toml";

/// Name of the lockfile written next to the root manifest.
pub const LOCKFILE_FILE: &str = "Keel.lock";

pub mod config;
pub mod dependency;
pub mod lockfile;
pub mod manifest;
pub mod module;
pub mod properties;
pub mod rules;
pub mod source_set;
pub mod version_catalog;
pub mod workspace;
