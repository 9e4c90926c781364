use serde::{Deserialize, Serialize};
use std::fmt;

/// A dependency specification in Keel.toml.
///
/// Supports the shorthand `"group:artifact[:version]"`, a project reference
/// to another workspace module, a version catalog reference, and a detailed
/// table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Dependency {
    Short(String),
    Project(ProjectDependency),
    Catalog(CatalogDependency),
    Detailed(DetailedDependency),
}

/// A dependency on another module of the same workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectDependency {
    pub project: String,
}

/// A reference to a version catalog entry (or bundle, with `bundle = true`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogDependency {
    pub catalog: String,
    #[serde(default)]
    pub bundle: bool,
    #[serde(default)]
    pub scope: Option<DependencyScope>,
}

/// A dependency with explicit coordinates and optional metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailedDependency {
    pub group: String,
    pub artifact: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub scope: Option<DependencyScope>,
    /// `group` or `group:artifact` patterns pruned below this dependency.
    #[serde(default)]
    pub exclusions: Vec<String>,
}

impl Dependency {
    /// The scope declared on the dependency itself, if any.
    pub fn declared_scope(&self) -> Option<DependencyScope> {
        match self {
            Dependency::Catalog(c) => c.scope,
            Dependency::Detailed(d) => d.scope,
            Dependency::Short(_) | Dependency::Project(_) => None,
        }
    }
}

/// Maven-compatible dependency scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyScope {
    #[default]
    Compile,
    Runtime,
    Provided,
    Test,
}

impl DependencyScope {
    /// Whether a dependency of this scope takes part in resolving `scope`.
    pub fn visible_in(self, scope: ResolutionScope) -> bool {
        match scope {
            ResolutionScope::Main => self != DependencyScope::Test,
            ResolutionScope::Test => true,
        }
    }

    /// Whether the dependency ships inside a runtime bundle.
    pub fn is_runtime(self) -> bool {
        matches!(self, DependencyScope::Compile | DependencyScope::Runtime)
    }
}

/// A dependency graph that is reconciled as one unit.
///
/// `main` covers compile, runtime and provided dependencies; `test`
/// additionally covers test dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionScope {
    Main,
    Test,
}

impl ResolutionScope {
    pub const ALL: [ResolutionScope; 2] = [ResolutionScope::Main, ResolutionScope::Test];

    pub fn as_str(self) -> &'static str {
        match self {
            ResolutionScope::Main => "main",
            ResolutionScope::Test => "test",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "main" => Some(ResolutionScope::Main),
            "test" => Some(ResolutionScope::Test),
            _ => None,
        }
    }
}

impl fmt::Display for ResolutionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `group:artifact` identity of a library, without a version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coordinate {
    pub group: String,
    pub artifact: String,
}

impl Coordinate {
    pub fn new(group: impl Into<String>, artifact: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            artifact: artifact.into(),
        }
    }

    /// Parse `"group:artifact"`.
    pub fn parse(s: &str) -> Option<Self> {
        let (group, artifact) = s.split_once(':')?;
        if group.is_empty() || artifact.is_empty() || artifact.contains(':') {
            return None;
        }
        Some(Self::new(group, artifact))
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.artifact)
    }
}

/// A declared request for a library: coordinate plus the requested version.
///
/// The version is `None` when the declaration leaves it to the catalog or
/// to a forced rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DependencyRef {
    pub coordinate: Coordinate,
    pub version: Option<String>,
}

impl DependencyRef {
    pub fn new(group: &str, artifact: &str, version: Option<&str>) -> Self {
        Self {
            coordinate: Coordinate::new(group, artifact),
            version: version.map(str::to_string),
        }
    }

    /// Parse `"group:artifact:version"` or `"group:artifact"`.
    pub fn parse(s: &str) -> Option<Self> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        match parts.as_slice() {
            [g, a] if !g.is_empty() && !a.is_empty() => Some(Self::new(g, a, None)),
            [g, a, v] if !g.is_empty() && !a.is_empty() && !v.is_empty() => {
                Some(Self::new(g, a, Some(v)))
            }
            _ => None,
        }
    }
}

impl fmt::Display for DependencyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(v) => write!(f, "{}:{v}", self.coordinate),
            None => write!(f, "{}", self.coordinate),
        }
    }
}
