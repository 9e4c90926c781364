//! Operation: publish built modules to every configured target.
//!
//! All targets are attempted even when some fail; the report lists each
//! outcome and the caller turns failures into a non-zero exit.

use std::path::Path;

use keel_core::dependency::{Dependency, DependencyScope, ResolutionScope};
use keel_core::module::Module;
use keel_maven::pom::{Pom, PomDependency};
use keel_maven::publish::{self, Artifact, PublicationTarget, PublishReport, PublishResult};
use keel_plan::builder::{BuildPlan, ModulePlan};
use keel_util::errors::KeelError;
use keel_util::progress::{spinner, status};

use crate::ops_build::{self, BuildOptions};
use crate::ops_bundle;
use crate::BuildContext;

/// Options for `keel publish`.
#[derive(Debug, Default, Clone)]
pub struct PublishOptions {
    pub packages: Vec<String>,
    /// Target names; empty means every `[publishing.targets]` entry.
    pub targets: Vec<String>,
}

/// Plan and run every publication of the selected publishable modules.
pub async fn publish(start_dir: &Path, opts: &PublishOptions) -> miette::Result<PublishReport> {
    let result = ops_build::build(
        start_dir,
        &BuildOptions {
            packages: opts.packages.clone(),
            locked: false,
            quiet: true,
        },
    )?;
    let context = &result.context;
    let targets = resolve_targets(context, &opts.targets)?;

    let mut operations = Vec::new();
    let mut failures = Vec::new();
    for planned in result.plan.publishable() {
        let Some(module) = context.workspace.module(&planned.name) else {
            continue;
        };
        let planned_ops = artifact_for(context, &result.plan, planned, module)
            .and_then(|artifact| publish::plan(&artifact, &targets));
        match planned_ops {
            Ok(ops) => operations.extend(ops),
            Err(e) => {
                tracing::warn!("cannot publish {}: {e}", module.name);
                let coordinate = format!("{}:{}:{}", module.group, module.artifact_id, module.version);
                for target in &targets {
                    failures.push(PublishResult {
                        target: target.name.clone(),
                        coordinate: coordinate.clone(),
                        location: String::new(),
                        sha256: String::new(),
                        files: 0,
                        error: Some(e.to_string()),
                    });
                }
            }
        }
    }

    if operations.is_empty() && failures.is_empty() {
        status("Skipped", "no publishable module selected");
        return Ok(PublishReport::default());
    }

    status(
        "Publishing",
        &format!("{} publication(s) to {} target(s)", operations.len(), targets.len()),
    );
    let pb = spinner("uploading");
    let mut report = publish::execute(operations, context.global.build.jobs as usize).await?;
    pb.finish_and_clear();
    report.results.extend(failures);
    Ok(report)
}

fn resolve_targets(context: &BuildContext, names: &[String]) -> miette::Result<Vec<PublicationTarget>> {
    let workspace = &context.workspace;
    let configured = workspace
        .root
        .publishing
        .as_ref()
        .map(|p| &p.targets)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| KeelError::Manifest {
            message: "no [publishing.targets] configured in the root Keel.toml".to_string(),
        })?;

    let mut targets = Vec::new();
    if names.is_empty() {
        for (name, config) in configured {
            targets.push(PublicationTarget::resolve(name, config, &context.global, &workspace.root_dir)?);
        }
    } else {
        for name in names {
            let config = configured.get(name).ok_or_else(|| KeelError::Manifest {
                message: format!("unknown publishing target `{name}`"),
            })?;
            targets.push(PublicationTarget::resolve(name, config, &context.global, &workspace.root_dir)?);
        }
    }
    Ok(targets)
}

/// The jar and POM published for `module`. Bundled modules publish their
/// fat jar, which is written first and declares no dependencies.
fn artifact_for(
    context: &BuildContext,
    plan: &BuildPlan,
    planned: &ModulePlan,
    module: &Module,
) -> miette::Result<Artifact> {
    let (artifact_id, path, dependencies) = if planned.bundled {
        let outcome = ops_bundle::bundle_module(context, plan, module)?;
        (module.bundle_artifact_id(), outcome.path, Vec::new())
    } else {
        (
            module.artifact_id.clone(),
            module.artifact_path(),
            pom_dependencies(context, plan, module)?,
        )
    };
    let pom = Pom {
        group: Some(module.group.clone()),
        artifact: Some(artifact_id.clone()),
        version: Some(module.version.clone()),
        packaging: Some("jar".to_string()),
        description: module.manifest.module.as_ref().and_then(|m| m.description.clone()),
        dependencies,
        ..Pom::default()
    };
    Ok(Artifact {
        group: module.group.clone(),
        artifact_id,
        version: module.version.clone(),
        path,
        pom,
    })
}

/// Main-scope declarations at their reconciled versions.
fn pom_dependencies(context: &BuildContext, plan: &BuildPlan, module: &Module) -> miette::Result<Vec<PomDependency>> {
    let workspace = &context.workspace;
    let mut out = Vec::new();
    for decl in module.declarations() {
        if !decl.scope.visible_in(ResolutionScope::Main) {
            continue;
        }
        let scope = Some(pom_scope(decl.scope).to_string());
        if let Dependency::Project(p) = &decl.dependency {
            if let Some(dep) = workspace.module(&p.project) {
                out.push(PomDependency {
                    group: dep.group.clone(),
                    artifact: dep.artifact_id.clone(),
                    version: Some(dep.version.clone()),
                    scope,
                    ..PomDependency::default()
                });
            }
            continue;
        }
        for reference in workspace.catalog.references(&decl.key, &decl.dependency)? {
            let version = plan
                .resolution()
                .version_of(ResolutionScope::Main, &reference.coordinate)
                .map(str::to_string);
            out.push(PomDependency {
                group: reference.coordinate.group.clone(),
                artifact: reference.coordinate.artifact.clone(),
                version,
                scope: scope.clone(),
                ..PomDependency::default()
            });
        }
    }
    Ok(out)
}

fn pom_scope(scope: DependencyScope) -> &'static str {
    match scope {
        DependencyScope::Compile => "compile",
        DependencyScope::Runtime => "runtime",
        DependencyScope::Provided => "provided",
        DependencyScope::Test => "test",
    }
}
