//! Version reconciliation over the transitive dependency closure.
//!
//! Each pass walks the closure breadth-first from the module requests and
//! expands every coordinate at the version chosen by the previous pass. A
//! coordinate reached again along a path that excludes less is expanded
//! again under the narrower exclusions, so only exclusions shared by every
//! path prune its dependencies. The pass then picks a new version per coordinate: the
//! most specific forced rule, or the highest version requested. Passes
//! repeat until the versions expanded equal the versions selected, so
//! dependencies of an evicted version never reach the result.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use keel_core::dependency::{Coordinate, ResolutionScope};
use keel_core::rules::{ExclusionSet, ForceSet};
use keel_util::errors::KeelError;

use crate::conflict::{ConflictReport, Decision, SelectionReason};
use crate::graph::{DependencyGraph, ResolvedLibrary};
use crate::metadata::MetadataSource;
use crate::version;

/// Passes that pick the exact winner before selections may only rise.
const EXACT_PASSES: usize = 32;
const MAX_PASSES: usize = 256;

/// A library requested directly by a module.
#[derive(Debug, Clone)]
pub struct Request {
    pub module: String,
    pub coordinate: Coordinate,
    pub version: String,
    /// Pruned from everything below this request.
    pub exclusions: ExclusionSet,
}

/// Everything one scope's reconciliation needs.
pub struct ReconcileInput<'a> {
    pub scope: ResolutionScope,
    /// Module roots in workspace order, with the modules each depends on.
    pub modules: Vec<(String, Vec<String>)>,
    pub requests: Vec<Request>,
    pub forced: &'a ForceSet,
    pub exclusions: &'a ExclusionSet,
    pub metadata: &'a dyn MetadataSource,
}

/// The version chosen for one coordinate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub version: String,
    pub forced: bool,
}

/// Output of [`reconcile`] for one scope.
pub struct Reconciled {
    pub scope: ResolutionScope,
    pub selected: BTreeMap<Coordinate, Selection>,
    /// Direct library dependencies of each selected library.
    pub edges: BTreeMap<Coordinate, BTreeSet<Coordinate>>,
    pub graph: DependencyGraph,
    pub report: ConflictReport,
}

impl Reconciled {
    pub fn version_of(&self, coordinate: &Coordinate) -> Option<&str> {
        self.selected.get(coordinate).map(|s| s.version.as_str())
    }
}

#[derive(Default)]
struct Pass {
    requested: BTreeMap<Coordinate, Vec<String>>,
    expanded: BTreeMap<Coordinate, String>,
    module_edges: Vec<(String, Coordinate, String)>,
    library_edges: Vec<(Coordinate, Coordinate, String)>,
}

struct Pending {
    coordinate: Coordinate,
    version: String,
    exclusions: ExclusionSet,
}

/// Select one version per coordinate reachable from `input.requests`.
pub fn reconcile(input: &ReconcileInput<'_>) -> miette::Result<Reconciled> {
    input.forced.validate()?;

    let mut previous: BTreeMap<Coordinate, String> = BTreeMap::new();
    let mut floor: BTreeMap<Coordinate, String> = BTreeMap::new();

    for round in 1..=MAX_PASSES {
        let pass = walk(input, &previous)?;
        let monotone = round > EXACT_PASSES;

        let mut selection = BTreeMap::new();
        for (coordinate, requested) in &pass.requested {
            let mut chosen = match input.forced.lookup(coordinate, input.scope) {
                Some(rule) => rule.version.clone(),
                None => version::highest(requested.iter().map(String::as_str))
                    .unwrap_or_default()
                    .to_string(),
            };
            if monotone && input.forced.lookup(coordinate, input.scope).is_none() {
                if let Some(low) = floor.get(coordinate) {
                    if version::compare(low, &chosen) == Ordering::Greater {
                        chosen = low.clone();
                    }
                }
                floor.insert(coordinate.clone(), chosen.clone());
            }
            selection.insert(coordinate.clone(), chosen);
        }

        if selection == pass.expanded {
            tracing::debug!(
                "{} scope settled after {round} pass(es) with {} libraries",
                input.scope,
                selection.len()
            );
            return Ok(finish(input, pass));
        }
        previous = selection;
    }

    Err(KeelError::Generic {
        message: format!(
            "version selection for the {} scope did not settle after {MAX_PASSES} passes",
            input.scope
        ),
    }
    .into())
}

fn walk(input: &ReconcileInput<'_>, previous: &BTreeMap<Coordinate, String>) -> miette::Result<Pass> {
    let scope = input.scope;
    let mut pass = Pass::default();
    let mut queue = VecDeque::new();

    for request in &input.requests {
        if input.exclusions.excludes(&request.coordinate, scope) {
            tracing::debug!("{} excluded in {scope} scope", request.coordinate);
            continue;
        }
        pass.module_edges.push((
            request.module.clone(),
            request.coordinate.clone(),
            request.version.clone(),
        ));
        queue.push_back(Pending {
            coordinate: request.coordinate.clone(),
            version: request.version.clone(),
            exclusions: request.exclusions.clone(),
        });
    }

    // Exclusions in force at each expanded coordinate: only the rules every
    // path to it agrees on.
    let mut effective: BTreeMap<Coordinate, ExclusionSet> = BTreeMap::new();

    while let Some(mut item) = queue.pop_front() {
        pass.requested
            .entry(item.coordinate.clone())
            .or_default()
            .push(item.version.clone());

        let expand = match (effective.get(&item.coordinate), pass.expanded.get(&item.coordinate)) {
            (Some(current), Some(expanded)) => {
                let narrowed = current.intersection(&item.exclusions);
                if narrowed.len() == current.len() {
                    continue;
                }
                tracing::debug!("re-expanding {} with fewer exclusions", item.coordinate);
                item.exclusions = narrowed;
                expanded.clone()
            }
            _ => match input.forced.lookup(&item.coordinate, scope) {
                Some(rule) => rule.version.clone(),
                None => previous
                    .get(&item.coordinate)
                    .cloned()
                    .unwrap_or_else(|| item.version.clone()),
            },
        };
        effective.insert(item.coordinate.clone(), item.exclusions.clone());

        let deps = match input.metadata.dependencies(&item.coordinate, &expand)? {
            Some(deps) => deps,
            None => {
                tracing::debug!("no metadata for {}:{expand}; treating as a leaf", item.coordinate);
                Vec::new()
            }
        };
        pass.expanded.insert(item.coordinate.clone(), expand);

        for dep in deps {
            if input.exclusions.excludes(&dep.coordinate, scope)
                || item.exclusions.excludes(&dep.coordinate, scope)
            {
                tracing::debug!("{} excluded below {}", dep.coordinate, item.coordinate);
                continue;
            }
            let exclusions = if dep.exclusions.is_empty() {
                item.exclusions.clone()
            } else {
                item.exclusions.union(&ExclusionSet::from_patterns(&dep.exclusions)?)
            };
            let edge = (item.coordinate.clone(), dep.coordinate.clone(), dep.version.clone());
            if !pass.library_edges.contains(&edge) {
                pass.library_edges.push(edge);
            }
            queue.push_back(Pending {
                coordinate: dep.coordinate,
                version: dep.version,
                exclusions,
            });
        }
    }

    Ok(pass)
}

fn finish(input: &ReconcileInput<'_>, pass: Pass) -> Reconciled {
    let scope = input.scope;
    let mut selected = BTreeMap::new();
    let mut report = ConflictReport::new();

    for (coordinate, chosen) in &pass.expanded {
        let rule = input.forced.lookup(coordinate, scope);
        let mut requested = pass.requested.get(coordinate).cloned().unwrap_or_default();
        requested.sort_by(|a, b| version::compare(a, b));
        requested.dedup();

        let reason = match rule {
            Some(rule) => SelectionReason::Forced {
                origin: rule.origin.clone(),
            },
            None => SelectionReason::HighestWins,
        };
        let decision = Decision {
            scope,
            coordinate: coordinate.clone(),
            requested,
            selected: chosen.clone(),
            reason,
        };
        if decision.is_conflict() {
            tracing::debug!("{decision}");
        }
        report.add(decision);
        selected.insert(
            coordinate.clone(),
            Selection {
                version: chosen.clone(),
                forced: rule.is_some(),
            },
        );
    }

    let mut edges: BTreeMap<Coordinate, BTreeSet<Coordinate>> = BTreeMap::new();
    let mut graph = DependencyGraph::new();
    for (name, _) in &input.modules {
        graph.add_module(name);
    }
    for (name, depends_on) in &input.modules {
        let from = graph.add_module(name);
        for other in depends_on {
            let to = graph.add_module(other);
            graph.add_edge(from, to, "project");
        }
    }

    let library = |graph: &mut DependencyGraph, coordinate: &Coordinate| {
        let choice = &selected[coordinate];
        graph.add_library(ResolvedLibrary {
            coordinate: coordinate.clone(),
            version: choice.version.clone(),
            forced: choice.forced,
        })
    };
    for (module, coordinate, requested) in &pass.module_edges {
        let from = graph.add_module(module);
        let to = library(&mut graph, coordinate);
        graph.add_edge(from, to, requested);
    }
    for (parent, child, requested) in &pass.library_edges {
        let from = library(&mut graph, parent);
        let to = library(&mut graph, child);
        graph.add_edge(from, to, requested);
        edges.entry(parent.clone()).or_default().insert(child.clone());
    }

    Reconciled {
        scope,
        selected,
        edges,
        graph,
        report,
    }
}
