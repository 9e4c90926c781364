//! Operation: resolve, plan and lock the workspace.
//!
//! The pipeline is load -> resolve -> lock -> plan. Resolution errors
//! abort before any task is planned.

use std::time::Instant;

use keel_core::lockfile::Lockfile;
use keel_plan::builder::{self, BuildPlan};
use keel_resolver::resolver::{resolve, ResolveInput};
use keel_util::errors::KeelError;
use keel_util::progress::{status, status_info};

use crate::BuildContext;

/// Options for a build invocation.
#[derive(Debug, Default, Clone)]
pub struct BuildOptions {
    /// Modules to build; empty means all.
    pub packages: Vec<String>,
    /// Fail instead of rewriting a stale `Keel.lock`.
    pub locked: bool,
    /// Suppress the per-module summary (used by `publish` and `bundle`).
    pub quiet: bool,
}

/// The loaded context and the plan built from it.
pub struct BuildResult {
    pub context: BuildContext,
    pub plan: BuildPlan,
}

/// Run the build pipeline from the workspace containing `start_dir`.
pub fn build(start_dir: &std::path::Path, opts: &BuildOptions) -> miette::Result<BuildResult> {
    let start = Instant::now();
    let context = BuildContext::load(start_dir, &opts.packages)?;
    let workspace = &context.workspace;
    let selected = workspace.select(&opts.packages)?;

    status(
        "Resolving",
        &format!("{} module(s) in {}", selected.len(), workspace.root_dir.display()),
    );
    let metadata = context.metadata();
    let resolution = resolve(&ResolveInput {
        workspace,
        modules: selected.clone(),
        metadata: &metadata,
    })?;

    let conflicts = resolution.report();
    for decision in conflicts.conflicts() {
        tracing::info!("{decision}");
    }

    if context.is_full_selection() {
        write_lockfile(&context, &resolution.lockfile(), opts.locked)?;
    } else {
        tracing::debug!("partial selection; Keel.lock left untouched");
    }

    let plan = builder::build(workspace, &selected, resolution)?;

    if !opts.quiet {
        for module in plan.modules() {
            status_info(
                "Planned",
                &format!(
                    "{} v{} ({} task(s){})",
                    module.name,
                    module.version,
                    module.tasks.len(),
                    if module.publishable { ", publishable" } else { "" }
                ),
            );
            println!("{}: {}", module.name, module.task_names().join(" -> "));
        }
        let libraries = plan
            .resolution()
            .scope(keel_core::dependency::ResolutionScope::Test)
            .map(|r| r.selected.len())
            .unwrap_or(0);
        status(
            "Finished",
            &format!(
                "{} module(s), {libraries} librar{} in {:.2}s",
                plan.modules().len(),
                if libraries == 1 { "y" } else { "ies" },
                start.elapsed().as_secs_f64()
            ),
        );
    }

    Ok(BuildResult { context, plan })
}

fn write_lockfile(context: &BuildContext, lockfile: &Lockfile, locked: bool) -> miette::Result<()> {
    let path = context.workspace.lockfile_path();
    let existing = if path.is_file() {
        Some(Lockfile::from_path(&path)?)
    } else {
        None
    };
    if existing.as_ref() == Some(lockfile) {
        tracing::debug!("Keel.lock is up to date");
        return Ok(());
    }
    if locked {
        return Err(KeelError::Generic {
            message: "Keel.lock needs to be updated but --locked was passed".to_string(),
        }
        .into());
    }
    lockfile.write_to(&path)?;
    status("Locked", &format!("{} package(s) in {}", lockfile.package.len(), path.display()));
    Ok(())
}
