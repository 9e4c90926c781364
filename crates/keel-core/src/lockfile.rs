use serde::{Deserialize, Serialize};
use std::path::Path;

use keel_util::errors::KeelError;

use crate::dependency::ResolutionScope;

/// Deterministic lockfile recording the reconciled version of every
/// library, per resolution scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lockfile {
    #[serde(default)]
    pub package: Vec<LockedPackage>,
}

/// One reconciled library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedPackage {
    pub name: String,
    pub group: String,
    pub version: String,
    pub scope: ResolutionScope,
    /// Set when a forced rule chose the version.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub forced: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<LockedDependencyRef>,
}

/// A resolved edge from a locked package to another one in the same scope.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LockedDependencyRef {
    pub name: String,
    pub group: String,
    pub version: String,
}

impl Lockfile {
    /// Build a lockfile from packages in any order.
    pub fn generate(mut packages: Vec<LockedPackage>) -> Self {
        packages.sort_by(|a, b| {
            (a.scope, &a.group, &a.name).cmp(&(b.scope, &b.group, &b.name))
        });
        for pkg in &mut packages {
            pkg.dependencies.sort();
            pkg.dependencies.dedup();
        }
        Self { package: packages }
    }

    /// Load and parse a `Keel.lock` file from the given path.
    pub fn from_path(path: &Path) -> miette::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| KeelError::Generic {
            message: format!("Failed to read lockfile: {e}"),
        })?;
        toml::from_str(&content).map_err(|e| {
            KeelError::Generic {
                message: format!("Failed to parse lockfile: {e}"),
            }
            .into()
        })
    }

    /// Serialize the lockfile to a pretty-printed TOML string.
    pub fn to_string_pretty(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Write the lockfile with a header comment.
    pub fn write_to(&self, path: &Path) -> miette::Result<()> {
        let body = self.to_string_pretty().map_err(|e| KeelError::Generic {
            message: format!("Failed to serialize lockfile: {e}"),
        })?;
        let content = format!("# This file is generated by keel. Do not edit it by hand.\n\n{body}");
        std::fs::write(path, content).map_err(KeelError::Io)?;
        Ok(())
    }

    /// The locked version of `group:name` in `scope`.
    pub fn locked_version(&self, scope: ResolutionScope, group: &str, name: &str) -> Option<&str> {
        self.package
            .iter()
            .find(|p| p.scope == scope && p.group == group && p.name == name)
            .map(|p| p.version.as_str())
    }
}
