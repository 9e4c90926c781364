use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use globset::Glob;
use tracing::debug;

use keel_util::errors::KeelError;

use crate::manifest::Manifest;
use crate::module::{Module, ModuleDefaults};
use crate::rules::{ExclusionRule, ExclusionSet, ForceSet, ForcedRule};
use crate::version_catalog::VersionCatalog;
use crate::{LOCKFILE_FILE, MANIFEST_FILE};

/// A Keel workspace: the root manifest plus every loaded member.
///
/// All member manifests are read up front, so resolution always sees the
/// complete configuration.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub root_dir: PathBuf,
    pub root: Manifest,
    pub modules: Vec<Module>,
    pub catalog: VersionCatalog,
}

impl Workspace {
    /// Find the workspace containing `start` and load it.
    ///
    /// The outermost `Keel.toml` declaring `[workspace]` wins; otherwise the
    /// nearest `Keel.toml` is treated as a single-module project.
    pub fn discover(start: &Path) -> miette::Result<Self> {
        let nearest = keel_util::fs::find_ancestor_with(start, MANIFEST_FILE).ok_or_else(|| {
            KeelError::Manifest {
                message: format!(
                    "could not find {MANIFEST_FILE} in {} or any parent directory",
                    start.display()
                ),
            }
        })?;

        let mut root = nearest.clone();
        let mut cursor = nearest.parent();
        while let Some(dir) = cursor {
            let candidate = dir.join(MANIFEST_FILE);
            if candidate.is_file() && Manifest::from_path(&candidate)?.is_workspace_root() {
                root = dir.to_path_buf();
            }
            cursor = dir.parent();
        }
        Self::load(&root)
    }

    /// Load the workspace rooted at `root_dir`.
    pub fn load(root_dir: &Path) -> miette::Result<Self> {
        let root = Manifest::from_path(&root_dir.join(MANIFEST_FILE))?;
        let catalog = VersionCatalog::new(root.catalog.as_ref());

        let modules = match &root.workspace {
            Some(ws) => {
                let defaults = ModuleDefaults::from(ws);
                let mut modules = Vec::new();
                for dir in member_dirs(root_dir, &ws.members, &ws.exclude)? {
                    debug!("loading member {}", dir.display());
                    modules.push(Module::load(&dir, &defaults)?);
                }
                if root.module.is_some() {
                    modules.push(Module::from_manifest(root.clone(), root_dir, &defaults)?);
                }
                modules
            }
            None => vec![Module::from_manifest(
                root.clone(),
                root_dir,
                &ModuleDefaults::default(),
            )?],
        };

        let workspace = Self {
            root_dir: root_dir.to_path_buf(),
            root,
            modules,
            catalog,
        };
        workspace.check_modules()?;
        Ok(workspace)
    }

    fn check_modules(&self) -> miette::Result<()> {
        let mut seen = BTreeSet::new();
        for module in &self.modules {
            if !seen.insert(module.name.as_str()) {
                return Err(KeelError::Manifest {
                    message: format!("two workspace members are named `{}`", module.name),
                }
                .into());
            }
        }
        for module in &self.modules {
            for dep in module.project_dependencies() {
                if !seen.contains(dep) {
                    return Err(KeelError::Manifest {
                        message: format!(
                            "module `{}` depends on unknown project `{dep}`",
                            module.name
                        ),
                    }
                    .into());
                }
            }
        }
        Ok(())
    }

    pub fn module(&self, name: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.name == name)
    }

    /// The named modules plus every module they depend on, in workspace
    /// order. An empty selection means every module.
    pub fn select(&self, names: &[String]) -> miette::Result<Vec<&Module>> {
        if names.is_empty() {
            return Ok(self.modules.iter().collect());
        }
        let mut wanted: BTreeSet<&str> = BTreeSet::new();
        let mut stack: Vec<&str> = Vec::new();
        for name in names {
            let module = self.module(name).ok_or_else(|| KeelError::Manifest {
                message: format!("no module named `{name}` in this workspace"),
            })?;
            stack.push(&module.name);
        }
        while let Some(name) = stack.pop() {
            if !wanted.insert(name) {
                continue;
            }
            if let Some(module) = self.module(name) {
                stack.extend(module.project_dependencies());
            }
        }
        Ok(self
            .modules
            .iter()
            .filter(|m| wanted.contains(m.name.as_str()))
            .collect())
    }

    /// Forced rules from the root manifest and the selected members.
    ///
    /// Member rules are only active while the member is selected. The set
    /// is validated before it is returned.
    pub fn force_set(&self, selected: &[&Module]) -> miette::Result<ForceSet> {
        let mut rules = Vec::new();
        for entry in &self.root.force {
            rules.push(ForcedRule::from_entry(entry, &self.catalog, MANIFEST_FILE)?);
        }
        for module in selected.iter().filter(|m| m.dir != self.root_dir) {
            let origin = format!("{}/{MANIFEST_FILE}", module.name);
            for entry in &module.manifest.force {
                rules.push(ForcedRule::from_entry(entry, &self.catalog, &origin)?);
            }
        }
        let set = ForceSet::new(rules);
        set.validate()?;
        Ok(set)
    }

    /// Exclusion rules from the root manifest and the selected members.
    pub fn exclusions(&self, selected: &[&Module]) -> miette::Result<ExclusionSet> {
        let mut rules = Vec::new();
        for entry in &self.root.exclude {
            rules.push(ExclusionRule::from_entry(entry)?);
        }
        for module in selected.iter().filter(|m| m.dir != self.root_dir) {
            for entry in &module.manifest.exclude {
                rules.push(ExclusionRule::from_entry(entry)?);
            }
        }
        Ok(ExclusionSet::new(rules))
    }

    pub fn lockfile_path(&self) -> PathBuf {
        self.root_dir.join(LOCKFILE_FILE)
    }

    /// Returns `true` if members live in subdirectories of the root.
    pub fn is_virtual(&self) -> bool {
        self.modules.iter().any(|m| m.dir != self.root_dir)
    }
}

/// Expand `[workspace].members`. A `*` in the last path component lists
/// the matching subdirectories that contain a manifest.
fn member_dirs(root: &Path, members: &[String], exclude: &[String]) -> miette::Result<Vec<PathBuf>> {
    let excluded = exclude
        .iter()
        .map(|p| compile(p))
        .collect::<miette::Result<Vec<_>>>()?;

    let mut dirs = Vec::new();
    for pattern in members {
        if pattern.contains('*') {
            let matcher = compile(pattern)?;
            let parent = Path::new(pattern).parent().unwrap_or(Path::new(""));
            let mut found = Vec::new();
            for entry in std::fs::read_dir(root.join(parent)).map_err(KeelError::Io)? {
                let path = entry.map_err(KeelError::Io)?.path();
                if !path.join(MANIFEST_FILE).is_file() {
                    continue;
                }
                if let Ok(rel) = path.strip_prefix(root) {
                    if matcher.is_match(rel) {
                        found.push((rel.to_path_buf(), path));
                    }
                }
            }
            found.sort();
            for (rel, path) in found {
                if !excluded.iter().any(|m| m.is_match(&rel)) {
                    dirs.push(path);
                }
            }
        } else {
            let path = root.join(pattern);
            if !path.join(MANIFEST_FILE).is_file() {
                return Err(KeelError::Manifest {
                    message: format!("workspace member `{pattern}` has no {MANIFEST_FILE}"),
                }
                .into());
            }
            if !excluded.iter().any(|m| m.is_match(pattern)) {
                dirs.push(path);
            }
        }
    }
    Ok(dirs)
}

fn compile(pattern: &str) -> miette::Result<globset::GlobMatcher> {
    Ok(Glob::new(pattern)
        .map_err(|e| KeelError::Manifest {
            message: format!("invalid workspace pattern `{pattern}`: {e}"),
        })?
        .compile_matcher())
}
