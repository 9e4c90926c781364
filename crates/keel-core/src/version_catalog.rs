//! The version catalog: symbolic library aliases, shared version
//! variables and bundles, declared under `[catalog]` in the root manifest.

use std::collections::BTreeMap;

use keel_util::errors::KeelError;

use crate::dependency::{Coordinate, Dependency, DependencyRef, ResolutionScope};
use crate::manifest::{CatalogConfig, CatalogLibrary};
use crate::rules::ForceSet;

/// A catalog library with its `version.ref` already substituted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub alias: String,
    pub coordinate: Coordinate,
    pub version: Option<String>,
}

/// Read-only view over `[catalog]`.
#[derive(Debug, Clone, Default)]
pub struct VersionCatalog {
    versions: BTreeMap<String, String>,
    libraries: BTreeMap<String, CatalogLibrary>,
    bundles: BTreeMap<String, Vec<String>>,
}

impl VersionCatalog {
    pub fn new(config: Option<&CatalogConfig>) -> Self {
        match config {
            Some(c) => Self {
                versions: c.versions.clone(),
                libraries: c.libraries.clone(),
                bundles: c.bundles.clone(),
            },
            None => Self::default(),
        }
    }

    /// Look up a library alias.
    ///
    /// The returned reference carries the catalog version, or `None` when
    /// the entry leaves the version to a forced rule.
    pub fn library(&self, alias: &str) -> miette::Result<DependencyRef> {
        let lib = self.libraries.get(alias).ok_or_else(|| KeelError::UnresolvedDependency {
            coordinate: alias.to_string(),
            message: "no such alias in [catalog.libraries]".to_string(),
        })?;
        let version = self.entry_version(alias, lib)?;
        Ok(DependencyRef {
            coordinate: Coordinate::new(&lib.group, &lib.artifact),
            version,
        })
    }

    /// Expand a bundle into its libraries, in declaration order.
    pub fn bundle(&self, name: &str) -> miette::Result<Vec<DependencyRef>> {
        let aliases = self.bundles.get(name).ok_or_else(|| KeelError::UnresolvedDependency {
            coordinate: name.to_string(),
            message: "no such bundle in [catalog.bundles]".to_string(),
        })?;
        aliases.iter().map(|alias| self.library(alias)).collect()
    }

    /// All libraries, sorted by alias.
    pub fn entries(&self) -> miette::Result<Vec<CatalogEntry>> {
        self.libraries
            .iter()
            .map(|(alias, lib)| {
                Ok(CatalogEntry {
                    alias: alias.clone(),
                    coordinate: Coordinate::new(&lib.group, &lib.artifact),
                    version: self.entry_version(alias, lib)?,
                })
            })
            .collect()
    }

    /// The catalog version of the first library declaring `coordinate`.
    pub fn version_of(&self, coordinate: &Coordinate) -> Option<String> {
        self.libraries
            .iter()
            .filter(|(_, lib)| lib.group == coordinate.group && lib.artifact == coordinate.artifact)
            .find_map(|(alias, lib)| self.entry_version(alias, lib).ok().flatten())
    }

    /// Turn one manifest declaration into library references.
    ///
    /// Project dependencies yield nothing; they are edges between modules,
    /// not library requests.
    pub fn references(&self, key: &str, dependency: &Dependency) -> miette::Result<Vec<DependencyRef>> {
        match dependency {
            Dependency::Short(s) => {
                let reference = DependencyRef::parse(s).ok_or_else(|| KeelError::Manifest {
                    message: format!(
                        "dependency `{key}` = \"{s}\" is not of the form group:artifact[:version]"
                    ),
                })?;
                Ok(vec![reference])
            }
            Dependency::Detailed(d) => Ok(vec![DependencyRef::new(
                &d.group,
                &d.artifact,
                d.version.as_deref(),
            )]),
            Dependency::Catalog(c) if c.bundle => self.bundle(&c.catalog),
            Dependency::Catalog(c) => Ok(vec![self.library(&c.catalog)?]),
            Dependency::Project(_) => Ok(Vec::new()),
        }
    }

    /// Resolve the concrete version requested by `reference`.
    ///
    /// Lookup order: the version on the reference itself (which already
    /// includes an alias' catalog version), a catalog library with the same
    /// coordinate, then the most specific forced rule for `scope`.
    pub fn resolve(
        &self,
        reference: &DependencyRef,
        scope: ResolutionScope,
        forced: &ForceSet,
    ) -> miette::Result<String> {
        if let Some(version) = &reference.version {
            return Ok(version.clone());
        }
        if let Some(version) = self.version_of(&reference.coordinate) {
            return Ok(version);
        }
        if let Some(rule) = forced.lookup(&reference.coordinate, scope) {
            return Ok(rule.version.clone());
        }
        Err(KeelError::UnresolvedDependency {
            coordinate: reference.coordinate.to_string(),
            message: format!("no version declared, cataloged or forced in scope `{scope}`"),
        }
        .into())
    }

    fn entry_version(&self, alias: &str, lib: &CatalogLibrary) -> miette::Result<Option<String>> {
        match (&lib.version_ref, &lib.version) {
            (Some(vref), _) => match self.versions.get(vref) {
                Some(v) => Ok(Some(v.clone())),
                None => Err(KeelError::UnresolvedDependency {
                    coordinate: format!("{}:{}", lib.group, lib.artifact),
                    message: format!(
                        "catalog alias `{alias}` refers to missing version `{vref}` in [catalog.versions]"
                    ),
                }
                .into()),
            },
            (None, Some(v)) => Ok(Some(v.clone())),
            (None, None) => Ok(None),
        }
    }
}
