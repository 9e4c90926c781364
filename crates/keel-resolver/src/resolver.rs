//! Workspace-level resolution: turns module declarations into requests,
//! reconciles each scope and produces the lockfile.

use std::collections::BTreeSet;

use keel_core::dependency::{Coordinate, Dependency, DependencyScope, ResolutionScope};
use keel_core::lockfile::{LockedDependencyRef, LockedPackage, Lockfile};
use keel_core::module::Module;
use keel_core::rules::ExclusionSet;
use keel_core::workspace::Workspace;

use crate::conflict::ConflictReport;
use crate::metadata::MetadataSource;
use crate::reconcile::{reconcile, ReconcileInput, Reconciled, Request};

/// What to resolve.
pub struct ResolveInput<'a> {
    pub workspace: &'a Workspace,
    /// Selected modules, already closed over project dependencies.
    pub modules: Vec<&'a Module>,
    pub metadata: &'a dyn MetadataSource,
}

/// The reconciled versions of every scope.
pub struct Resolution {
    pub scopes: Vec<Reconciled>,
    /// Coordinates declared `provided` by a selected module.
    pub provided: BTreeSet<Coordinate>,
}

impl Resolution {
    pub fn scope(&self, scope: ResolutionScope) -> Option<&Reconciled> {
        self.scopes.iter().find(|r| r.scope == scope)
    }

    pub fn version_of(&self, scope: ResolutionScope, coordinate: &Coordinate) -> Option<&str> {
        self.scope(scope).and_then(|r| r.version_of(coordinate))
    }

    /// Decisions of every scope together.
    pub fn report(&self) -> ConflictReport {
        let mut report = ConflictReport::new();
        for reconciled in &self.scopes {
            report.extend(reconciled.report.clone());
        }
        report
    }

    /// Main-scope libraries module `name` ships at runtime, with their
    /// versions. `provided` declarations are left out.
    pub fn runtime_libraries(&self, name: &str) -> Vec<(Coordinate, String)> {
        let Some(main) = self.scope(ResolutionScope::Main) else {
            return Vec::new();
        };
        main.graph
            .libraries_of_module(name)
            .into_iter()
            .filter(|lib| !self.provided.contains(&lib.coordinate))
            .map(|lib| (lib.coordinate.clone(), lib.version.clone()))
            .collect()
    }

    /// Lock every scope's selection and edges.
    pub fn lockfile(&self) -> Lockfile {
        let mut packages = Vec::new();
        for reconciled in &self.scopes {
            for (coordinate, selection) in &reconciled.selected {
                let dependencies = reconciled
                    .edges
                    .get(coordinate)
                    .into_iter()
                    .flatten()
                    .filter_map(|dep| {
                        reconciled.version_of(dep).map(|v| LockedDependencyRef {
                            name: dep.artifact.clone(),
                            group: dep.group.clone(),
                            version: v.to_string(),
                        })
                    })
                    .collect();
                packages.push(LockedPackage {
                    name: coordinate.artifact.clone(),
                    group: coordinate.group.clone(),
                    version: selection.version.clone(),
                    scope: reconciled.scope,
                    forced: selection.forced,
                    dependencies,
                });
            }
        }
        Lockfile::generate(packages)
    }
}

/// Resolve the selected modules in both scopes.
///
/// Forced rules are validated before any graph is walked; every
/// resolution error aborts the whole run.
pub fn resolve(input: &ResolveInput<'_>) -> miette::Result<Resolution> {
    let workspace = input.workspace;
    let forced = workspace.force_set(&input.modules)?;
    let exclusions = workspace.exclusions(&input.modules)?;

    let modules: Vec<(String, Vec<String>)> = input
        .modules
        .iter()
        .map(|m| {
            (
                m.name.clone(),
                m.project_dependencies().into_iter().map(str::to_string).collect(),
            )
        })
        .collect();

    let mut provided = BTreeSet::new();
    let mut scopes = Vec::new();
    for scope in ResolutionScope::ALL {
        let mut requests = Vec::new();
        for module in &input.modules {
            for decl in module.declarations() {
                if !decl.scope.visible_in(scope) {
                    continue;
                }
                let declared = match &decl.dependency {
                    Dependency::Detailed(d) => ExclusionSet::from_patterns(&d.exclusions)?,
                    _ => ExclusionSet::default(),
                };
                for reference in workspace.catalog.references(&decl.key, &decl.dependency)? {
                    if exclusions.excludes(&reference.coordinate, scope) {
                        tracing::debug!("{} excluded in {scope} scope; not resolved", reference.coordinate);
                        continue;
                    }
                    let version = workspace.catalog.resolve(&reference, scope, &forced)?;
                    if decl.scope == DependencyScope::Provided {
                        provided.insert(reference.coordinate.clone());
                    }
                    requests.push(Request {
                        module: module.name.clone(),
                        coordinate: reference.coordinate,
                        version,
                        exclusions: declared.clone(),
                    });
                }
            }
        }

        tracing::debug!("{scope} scope: {} direct request(s)", requests.len());
        scopes.push(reconcile(&ReconcileInput {
            scope,
            modules: modules.clone(),
            requests,
            forced: &forced,
            exclusions: &exclusions,
            metadata: input.metadata,
        })?);
    }

    Ok(Resolution { scopes, provided })
}
