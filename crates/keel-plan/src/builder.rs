//! Assembly of the [`BuildPlan`].
//!
//! Modules are ordered by their project dependencies, then each module's
//! plugins are applied as ordered steps: generated source roots are
//! merged into the source sets, the no-overwrite check runs, and the
//! registered tasks are put in order.

use std::path::PathBuf;

use keel_core::module::Module;
use keel_core::source_set::SourceSet;
use keel_core::workspace::Workspace;
use keel_resolver::resolver::Resolution;

use crate::ordering::OrderGraph;
use crate::plugins::PluginRegistry;
use crate::sources;
use crate::tasks::{PlannedTask, TaskSet};

/// The plan for one module.
#[derive(Debug)]
pub struct ModulePlan {
    pub name: String,
    pub dir: PathBuf,
    pub group: String,
    pub version: String,
    pub artifact_id: String,
    /// Workspace modules this one depends on.
    pub depends_on: Vec<String>,
    /// Plugins whose steps were applied, in order.
    pub applied: Vec<String>,
    /// Plugins skipped because a required task was missing.
    pub skipped: Vec<String>,
    pub source_sets: Vec<SourceSet>,
    pub tasks: Vec<PlannedTask>,
    pub publishable: bool,
    pub bundled: bool,
}

impl ModulePlan {
    /// Authored then generated directories of `set`.
    pub fn source_path(&self, set: &str) -> Vec<PathBuf> {
        self.source_sets
            .iter()
            .find(|s| s.name == set)
            .map(SourceSet::source_path)
            .unwrap_or_default()
    }

    pub fn task_names(&self) -> Vec<&str> {
        self.tasks.iter().map(|t| t.name.as_str()).collect()
    }
}

/// The resolved and ordered build of the selected modules.
///
/// Built once by [`build`]; there is no way to change it afterwards.
pub struct BuildPlan {
    modules: Vec<ModulePlan>,
    resolution: Resolution,
}

impl BuildPlan {
    /// Modules in build order.
    pub fn modules(&self) -> &[ModulePlan] {
        &self.modules
    }

    pub fn module(&self, name: &str) -> Option<&ModulePlan> {
        self.modules.iter().find(|m| m.name == name)
    }

    pub fn resolution(&self) -> &Resolution {
        &self.resolution
    }

    /// Modules that get published, in build order.
    pub fn publishable(&self) -> impl Iterator<Item = &ModulePlan> {
        self.modules.iter().filter(|m| m.publishable)
    }
}

/// Plan `selected` on top of an already reconciled `resolution`.
pub fn build(workspace: &Workspace, selected: &[&Module], resolution: Resolution) -> miette::Result<BuildPlan> {
    let order = module_order(selected)?;
    let registry = PluginRegistry::new(&workspace.root.plugin_defs);
    let published: &[String] = workspace
        .root
        .publishing
        .as_ref()
        .map(|p| p.modules.as_slice())
        .unwrap_or_default();

    let mut modules = Vec::with_capacity(order.len());
    for name in order {
        let Some(module) = selected.iter().find(|m| m.name == name) else {
            continue;
        };
        let mut plan = plan_module(module, &registry)?;
        if published.contains(&plan.name) {
            plan.publishable = true;
        }
        tracing::info!(
            "planned {}: {} task(s), plugins [{}]",
            plan.name,
            plan.tasks.len(),
            plan.applied.join(", ")
        );
        modules.push(plan);
    }

    Ok(BuildPlan {
        modules,
        resolution,
    })
}

/// Module names ordered by project dependencies, ties broken by name.
fn module_order(selected: &[&Module]) -> miette::Result<Vec<String>> {
    let mut names: Vec<&str> = selected.iter().map(|m| m.name.as_str()).collect();
    names.sort();

    let mut graph = OrderGraph::new();
    for name in &names {
        graph.add(name);
    }
    for module in selected {
        let Some(dependent) = graph.index_of(&module.name) else {
            continue;
        };
        for dep in module.project_dependencies() {
            if let Some(dependency) = graph.index_of(dep) {
                graph.before(dependency, dependent);
            }
        }
    }
    graph.order()
}

fn plan_module(module: &Module, registry: &PluginRegistry<'_>) -> miette::Result<ModulePlan> {
    let set_names: Vec<&str> = module.source_sets.iter().map(|s| s.name.as_str()).collect();
    let mut source_sets = module.source_sets.clone();
    let mut tasks = TaskSet::new();
    let mut applied = Vec::new();
    let mut skipped = Vec::new();
    let mut publishable = false;
    let mut bundled = false;

    for id in &module.plugins {
        let step = registry.step(id, &set_names, &module.name)?;
        if let Some(missing) = step.requires.iter().find(|t| !tasks.contains(t)) {
            tracing::warn!(
                "{}: skipping plugin `{id}`, it needs task `{missing}` which no earlier plugin registers",
                module.name
            );
            skipped.push(id.clone());
            continue;
        }

        for template in &step.tasks {
            tasks.register(id, template);
        }
        for set in &mut source_sets {
            let roots = step.generated_for(&set.name);
            sources::add_generated(set, &module.dir, &roots);
        }
        publishable |= step.publishable;
        bundled |= step.bundled;
        applied.push(id.clone());
    }

    for set in &source_sets {
        sources::check_overlap(&module.name, &module.dir, set)?;
    }

    Ok(ModulePlan {
        name: module.name.clone(),
        dir: module.dir.clone(),
        group: module.group.clone(),
        version: module.version.clone(),
        artifact_id: module.artifact_id.clone(),
        depends_on: module
            .project_dependencies()
            .into_iter()
            .map(str::to_string)
            .collect(),
        applied,
        skipped,
        source_sets,
        tasks: tasks.order()?,
        publishable,
        bundled,
    })
}

