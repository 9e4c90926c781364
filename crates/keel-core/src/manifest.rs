use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use keel_util::errors::KeelError;

use crate::dependency::Dependency;
use crate::rules::{ExcludeEntry, ForceEntry};
use crate::source_set::SourceDirsConfig;

/// The parsed representation of a `Keel.toml` file.
///
/// The same schema serves the workspace root and every member module. The
/// root usually carries `[workspace]`, `[catalog]`, `[plugin-defs]` and
/// `[publishing]`; members carry `[module]`, dependencies and sources. A
/// root with `[module]` and no `[workspace]` is a single-module project.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub workspace: Option<WorkspaceConfig>,

    #[serde(default)]
    pub module: Option<ModuleMetadata>,

    #[serde(default)]
    pub dependencies: BTreeMap<String, Dependency>,

    #[serde(default, rename = "dev-dependencies")]
    pub dev_dependencies: BTreeMap<String, Dependency>,

    #[serde(default)]
    pub catalog: Option<CatalogConfig>,

    #[serde(default)]
    pub force: Vec<ForceEntry>,

    #[serde(default)]
    pub exclude: Vec<ExcludeEntry>,

    #[serde(default, rename = "plugin-defs")]
    pub plugin_defs: BTreeMap<String, PluginDef>,

    #[serde(default)]
    pub sources: BTreeMap<String, SourceDirsConfig>,

    #[serde(default)]
    pub bundle: Option<BundleConfig>,

    #[serde(default)]
    pub publish: Option<ModulePublishConfig>,

    #[serde(default)]
    pub publishing: Option<PublishingConfig>,

    #[serde(default)]
    pub resolution: Option<ResolutionConfig>,
}

/// Workspace-wide settings from `[workspace]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    /// Prepended to every module name to form its artifact ID.
    #[serde(default, rename = "artifact-prefix")]
    pub artifact_prefix: Option<String>,
    /// Plugins applied to every member before the member's own list.
    #[serde(default)]
    pub plugins: Vec<String>,
}

/// Module identity from `[module]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModuleMetadata {
    /// Defaults to the member directory name.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default, rename = "artifact-id")]
    pub artifact_id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Applied in declaration order.
    #[serde(default)]
    pub plugins: Vec<String>,
}

/// Version catalog configuration from `[catalog]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub versions: BTreeMap<String, String>,
    #[serde(default)]
    pub libraries: BTreeMap<String, CatalogLibrary>,
    #[serde(default)]
    pub bundles: BTreeMap<String, Vec<String>>,
}

/// A library entry in the version catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogLibrary {
    pub group: String,
    pub artifact: String,
    #[serde(default, rename = "version.ref")]
    pub version_ref: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

/// A custom transformation step from `[plugin-defs.<id>]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PluginDef {
    /// Generated source roots; `{set}` expands to the source set name.
    #[serde(default)]
    pub generated: Vec<String>,
    #[serde(default)]
    pub tasks: Vec<TaskDef>,
    /// Tasks that must already exist; otherwise the plugin is skipped.
    #[serde(default)]
    pub requires: Vec<String>,
    #[serde(default)]
    pub publishable: bool,
}

/// A task registered by a custom plugin.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskDef {
    pub name: String,
    #[serde(default)]
    pub after: Vec<String>,
    #[serde(default)]
    pub before: Vec<String>,
}

/// Fat-jar settings from `[bundle]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BundleConfig {
    /// Glob patterns of archive entries to drop.
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Entries whose contents are concatenated instead of first-wins.
    #[serde(default, rename = "merge-service-files")]
    pub merge_service_files: Vec<String>,
    #[serde(default, rename = "artifact-id")]
    pub artifact_id: Option<String>,
}

/// Per-module publication settings from `[publish]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModulePublishConfig {
    /// Path of the built jar, relative to the module directory.
    #[serde(default)]
    pub artifact: Option<String>,
}

/// Workspace publication settings from `[publishing]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublishingConfig {
    /// Modules to publish. Empty means every module applying a publishing plugin.
    #[serde(default)]
    pub modules: Vec<String>,
    #[serde(default)]
    pub targets: BTreeMap<String, PublishTargetConfig>,
}

/// One destination repository from `[publishing.targets.<name>]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishTargetConfig {
    pub url: String,
    /// Name of a `[credentials.<name>]` entry in the global config.
    #[serde(default)]
    pub credentials: Option<String>,
    #[serde(default)]
    pub classifier: Option<String>,
}

/// Resolution inputs from `[resolution]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolutionConfig {
    /// Local Maven-layout repositories consulted for transitive metadata,
    /// relative to the workspace root.
    #[serde(default)]
    pub repositories: Vec<String>,
}

impl Manifest {
    /// Load and parse a `Keel.toml` file from the given path.
    ///
    /// Before parsing, `${env:VAR}` references are resolved using
    /// `.keel.env` (if present alongside the manifest) and the process
    /// environment.
    pub fn from_path(path: &Path) -> miette::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| KeelError::Manifest {
            message: format!("Failed to read {}: {e}", path.display()),
        })?;

        let dir = path.parent().unwrap_or(Path::new("."));
        let env_vars =
            crate::properties::load_env_file(&dir.join(".keel.env")).unwrap_or_default();
        let resolved = crate::properties::interpolate(&content, &env_vars);

        Self::parse_toml(&resolved).map_err(|e| {
            KeelError::Manifest {
                message: format!("{}: {e}", path.display()),
            }
            .into()
        })
    }

    /// Parse a `Keel.toml` from a string (no interpolation).
    pub fn parse_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Whether this manifest declares a workspace root.
    pub fn is_workspace_root(&self) -> bool {
        self.workspace.is_some()
    }
}
