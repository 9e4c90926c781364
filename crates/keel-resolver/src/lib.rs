//! Dependency reconciliation for Keel: version ordering, the pass-based
//! highest-wins/forced selection over the transitive closure, the
//! resulting dependency graph, and workspace-level resolution into a
//! lockfile.

pub mod conflict;
pub mod graph;
pub mod metadata;
pub mod reconcile;
pub mod resolver;
pub mod version;
