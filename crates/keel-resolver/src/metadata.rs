//! Sources of transitive dependency metadata.

use std::collections::HashMap;
use std::path::PathBuf;

use keel_core::dependency::Coordinate;
use keel_maven::repository::LocalRepository;

/// A dependency of a library as its metadata declares it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitiveDependency {
    pub coordinate: Coordinate,
    pub version: String,
    /// `group` or `group:artifact` patterns pruned below this edge.
    pub exclusions: Vec<String>,
}

impl TransitiveDependency {
    pub fn new(group: &str, artifact: &str, version: &str) -> Self {
        Self {
            coordinate: Coordinate::new(group, artifact),
            version: version.to_string(),
            exclusions: Vec::new(),
        }
    }
}

/// Where the reconciler learns what a library version depends on.
pub trait MetadataSource {
    /// Direct runtime dependencies of `coordinate` at `version`.
    /// `Ok(None)` means the source knows nothing about it; the library is
    /// then treated as a leaf.
    fn dependencies(
        &self,
        coordinate: &Coordinate,
        version: &str,
    ) -> miette::Result<Option<Vec<TransitiveDependency>>>;
}

/// Metadata from POM files in Maven-layout directories, searched in order.
#[derive(Debug, Clone, Default)]
pub struct RepositoryMetadata {
    repositories: Vec<LocalRepository>,
}

impl RepositoryMetadata {
    pub fn new(roots: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            repositories: roots.into_iter().map(LocalRepository::new).collect(),
        }
    }
}

impl MetadataSource for RepositoryMetadata {
    fn dependencies(
        &self,
        coordinate: &Coordinate,
        version: &str,
    ) -> miette::Result<Option<Vec<TransitiveDependency>>> {
        for repo in &self.repositories {
            let Some(pom) = repo.read_pom(&coordinate.group, &coordinate.artifact, version)? else {
                continue;
            };
            let mut deps = Vec::new();
            for dep in pom.effective_dependencies() {
                if !dep.is_transitive() {
                    continue;
                }
                let Some(dep_version) = dep.version else {
                    tracing::warn!(
                        "{}:{} in {coordinate}:{version} has no version; skipping",
                        dep.group,
                        dep.artifact
                    );
                    continue;
                };
                deps.push(TransitiveDependency {
                    coordinate: Coordinate::new(dep.group, dep.artifact),
                    version: dep_version,
                    exclusions: dep
                        .exclusions
                        .iter()
                        .map(|(g, a)| if a.is_empty() { g.clone() } else { format!("{g}:{a}") })
                        .collect(),
                });
            }
            return Ok(Some(deps));
        }
        Ok(None)
    }
}

/// Metadata held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMetadata {
    entries: HashMap<(Coordinate, String), Vec<TransitiveDependency>>,
}

impl InMemoryMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare that `group:artifact:version` depends on `deps`.
    pub fn insert(&mut self, library: &str, deps: Vec<TransitiveDependency>) -> &mut Self {
        if let Some((coord, version)) = library.rsplit_once(':') {
            if let Some(coordinate) = Coordinate::parse(coord) {
                self.entries.insert((coordinate, version.to_string()), deps);
            }
        }
        self
    }
}

impl MetadataSource for InMemoryMetadata {
    fn dependencies(
        &self,
        coordinate: &Coordinate,
        version: &str,
    ) -> miette::Result<Option<Vec<TransitiveDependency>>> {
        Ok(self
            .entries
            .get(&(coordinate.clone(), version.to_string()))
            .cloned())
    }
}
