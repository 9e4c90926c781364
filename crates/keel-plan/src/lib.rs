//! Module graph builder for Keel.
//!
//! Orders the selected modules by their project dependencies, applies
//! each module's plugins as explicit transformation steps, composes
//! source paths (authored before generated, no overwrites) and orders
//! the registered tasks into an immutable [`builder::BuildPlan`].

pub mod builder;
pub mod ordering;
pub mod plugins;
pub mod sources;
pub mod tasks;
