use std::path::{Path, PathBuf};

use keel_util::errors::KeelError;

use crate::dependency::{Dependency, DependencyScope};
use crate::manifest::{Manifest, WorkspaceConfig};
use crate::source_set::{SourceSet, DEFAULT_SOURCE_SETS};

/// Values a member inherits from `[workspace]` when its own `[module]`
/// table leaves them unset.
#[derive(Debug, Clone, Default)]
pub struct ModuleDefaults {
    pub group: Option<String>,
    pub version: Option<String>,
    pub artifact_prefix: Option<String>,
    pub plugins: Vec<String>,
}

impl From<&WorkspaceConfig> for ModuleDefaults {
    fn from(ws: &WorkspaceConfig) -> Self {
        Self {
            group: ws.group.clone(),
            version: ws.version.clone(),
            artifact_prefix: ws.artifact_prefix.clone(),
            plugins: ws.plugins.clone(),
        }
    }
}

/// One dependency declaration of a module, with its effective scope.
#[derive(Debug, Clone)]
pub struct Declaration {
    /// The key in `[dependencies]` or `[dev-dependencies]`.
    pub key: String,
    pub dependency: Dependency,
    pub scope: DependencyScope,
}

/// A loaded workspace member.
///
/// Immutable once the workspace is loaded; the build plan refers to
/// modules by name.
#[derive(Debug, Clone)]
pub struct Module {
    pub name: String,
    pub dir: PathBuf,
    pub group: String,
    pub version: String,
    pub artifact_id: String,
    /// Workspace plugins first, then the module's own, without repeats.
    pub plugins: Vec<String>,
    pub source_sets: Vec<SourceSet>,
    pub manifest: Manifest,
}

impl Module {
    /// Load the module manifest found in `dir`.
    pub fn load(dir: &Path, defaults: &ModuleDefaults) -> miette::Result<Self> {
        let manifest = Manifest::from_path(&dir.join(crate::MANIFEST_FILE))?;
        Self::from_manifest(manifest, dir, defaults)
    }

    pub fn from_manifest(
        manifest: Manifest,
        dir: &Path,
        defaults: &ModuleDefaults,
    ) -> miette::Result<Self> {
        let meta = manifest.module.clone().unwrap_or_default();
        let name = match meta.name {
            Some(n) => n,
            None => dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| KeelError::Manifest {
                    message: format!("cannot derive a module name from {}", dir.display()),
                })?,
        };

        let group = meta
            .group
            .or_else(|| defaults.group.clone())
            .ok_or_else(|| KeelError::Manifest {
                message: format!("module `{name}` has no group and the workspace sets none"),
            })?;
        let version = meta
            .version
            .or_else(|| defaults.version.clone())
            .ok_or_else(|| KeelError::Manifest {
                message: format!("module `{name}` has no version and the workspace sets none"),
            })?;
        let artifact_id = meta.artifact_id.unwrap_or_else(|| {
            format!("{}{name}", defaults.artifact_prefix.as_deref().unwrap_or(""))
        });

        let mut plugins: Vec<String> = Vec::new();
        for plugin in defaults.plugins.iter().chain(&meta.plugins) {
            if !plugins.contains(plugin) {
                plugins.push(plugin.clone());
            }
        }

        let mut set_names: Vec<&str> = DEFAULT_SOURCE_SETS.to_vec();
        for configured in manifest.sources.keys() {
            if !set_names.contains(&configured.as_str()) {
                set_names.push(configured.as_str());
            }
        }
        let source_sets = set_names
            .into_iter()
            .map(|set| SourceSet::from_config(set, dir, manifest.sources.get(set)))
            .collect();

        Ok(Self {
            name,
            dir: dir.to_path_buf(),
            group,
            version,
            artifact_id,
            plugins,
            source_sets,
            manifest,
        })
    }

    /// Library and project declarations. Dev-dependencies default to the
    /// `test` scope.
    pub fn declarations(&self) -> Vec<Declaration> {
        let main = self.manifest.dependencies.iter().map(|(key, dep)| Declaration {
            key: key.clone(),
            scope: dep.declared_scope().unwrap_or(DependencyScope::Compile),
            dependency: dep.clone(),
        });
        let dev = self.manifest.dev_dependencies.iter().map(|(key, dep)| Declaration {
            key: key.clone(),
            scope: dep.declared_scope().unwrap_or(DependencyScope::Test),
            dependency: dep.clone(),
        });
        main.chain(dev).collect()
    }

    /// Names of workspace modules this module depends on, in declaration order.
    pub fn project_dependencies(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for dep in self
            .manifest
            .dependencies
            .values()
            .chain(self.manifest.dev_dependencies.values())
        {
            if let Dependency::Project(p) = dep {
                if !names.contains(&p.project.as_str()) {
                    names.push(&p.project);
                }
            }
        }
        names
    }

    pub fn source_set(&self, name: &str) -> Option<&SourceSet> {
        self.source_sets.iter().find(|s| s.name == name)
    }

    pub fn applies(&self, plugin: &str) -> bool {
        self.plugins.iter().any(|p| p == plugin)
    }

    /// The built module jar: `[publish].artifact`, or
    /// `build/libs/<name>-<version>.jar`.
    pub fn artifact_path(&self) -> PathBuf {
        match self.manifest.publish.as_ref().and_then(|p| p.artifact.as_ref()) {
            Some(path) => self.dir.join(path),
            None => self
                .dir
                .join("build")
                .join("libs")
                .join(format!("{}-{}.jar", self.name, self.version)),
        }
    }

    /// Where `keel bundle` writes the fat jar.
    pub fn bundle_path(&self) -> PathBuf {
        self.dir
            .join("build")
            .join("libs")
            .join(format!("{}-{}-all.jar", self.name, self.version))
    }

    /// Artifact ID of the fat jar; defaults to the module's own.
    pub fn bundle_artifact_id(&self) -> String {
        self.manifest
            .bundle
            .as_ref()
            .and_then(|b| b.artifact_id.clone())
            .unwrap_or_else(|| self.artifact_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> ModuleDefaults {
        ModuleDefaults {
            group: Some("io.spine.tools".into()),
            version: Some("2.0.0".into()),
            artifact_prefix: Some("spine-".into()),
            plugins: vec!["java".into()],
        }
    }

    #[test]
    fn inherits_workspace_identity() {
        let manifest = Manifest::parse_toml(
            r#"
[module]
plugins = ["protobuf", "java"]
"#,
        )
        .unwrap();
        let module = Module::from_manifest(manifest, Path::new("/ws/model-check"), &defaults()).unwrap();
        assert_eq!(module.name, "model-check");
        assert_eq!(module.group, "io.spine.tools");
        assert_eq!(module.artifact_id, "spine-model-check");
        assert_eq!(module.plugins, vec!["java", "protobuf"]);
        assert_eq!(
            module.artifact_path(),
            PathBuf::from("/ws/model-check/build/libs/model-check-2.0.0.jar")
        );
    }

    #[test]
    fn missing_group_is_a_manifest_error() {
        let manifest = Manifest::parse_toml("[module]\nname = \"x\"\nversion = \"1\"\n").unwrap();
        let err = Module::from_manifest(manifest, Path::new("/x"), &ModuleDefaults::default())
            .unwrap_err()
            .to_string();
        assert!(err.contains("no group"));
    }

    #[test]
    fn dev_dependencies_default_to_test_scope() {
        let manifest = Manifest::parse_toml(
            r#"
[module]
name = "core"

[dependencies]
guava = "com.google.guava:guava:32.0"
base = { project = "base" }

[dev-dependencies]
junit = "junit:junit:4.13"
"#,
        )
        .unwrap();
        let module = Module::from_manifest(manifest, Path::new("/ws/core"), &defaults()).unwrap();
        let decls = module.declarations();
        let junit = decls.iter().find(|d| d.key == "junit").unwrap();
        assert_eq!(junit.scope, DependencyScope::Test);
        assert_eq!(module.project_dependencies(), vec!["base"]);
    }
}
