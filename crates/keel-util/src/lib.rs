//! Shared utilities for the Keel build engine.
//!
//! Cross-cutting concerns used by every other Keel crate: the unified
//! error type, filesystem helpers, content digests, and Cargo-style
//! status output.

pub mod errors;
pub mod fs;
pub mod hash;
pub mod progress;
