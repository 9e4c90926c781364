//! High-level operations wiring CLI commands to the Keel subsystems:
//! build, publish, tree and bundle.

pub mod ops_build;
pub mod ops_bundle;
pub mod ops_publish;
pub mod ops_tree;

use std::path::{Path, PathBuf};

use keel_core::config::GlobalConfig;
use keel_core::workspace::Workspace;
use keel_maven::repository::{MavenRepository, RepositoryLocation};
use keel_resolver::metadata::RepositoryMetadata;

/// Everything an operation needs before resolution starts.
pub struct BuildContext {
    pub workspace: Workspace,
    pub global: GlobalConfig,
    /// `-p` selections as given; empty means every module.
    pub packages: Vec<String>,
}

impl BuildContext {
    /// Load the workspace around `start_dir` and the global config.
    pub fn load(start_dir: &Path, packages: &[String]) -> miette::Result<Self> {
        let workspace = Workspace::discover(start_dir)?;
        let global = GlobalConfig::load()?;
        tracing::info!(
            "workspace at {} with {} module(s)",
            workspace.root_dir.display(),
            workspace.modules.len()
        );
        Ok(Self {
            workspace,
            global,
            packages: packages.to_vec(),
        })
    }

    /// Whether every module takes part.
    pub fn is_full_selection(&self) -> bool {
        self.packages.is_empty()
    }

    /// Directories searched for POM metadata: `[resolution].repositories`
    /// of the root manifest, then the local repository.
    pub fn metadata_roots(&self) -> Vec<PathBuf> {
        let mut roots = Vec::new();
        let configured = self
            .workspace
            .root
            .resolution
            .as_ref()
            .map(|r| r.repositories.as_slice())
            .unwrap_or_default();
        for (i, url) in configured.iter().enumerate() {
            match MavenRepository::from_url(&format!("repository-{i}"), url) {
                Ok(MavenRepository {
                    location: RepositoryLocation::Directory(dir),
                    ..
                }) => roots.push(if dir.is_relative() {
                    self.workspace.root_dir.join(dir)
                } else {
                    dir
                }),
                Ok(_) => tracing::warn!("remote repository {url} is not searched for metadata"),
                Err(e) => tracing::warn!("ignoring repository {url}: {e}"),
            }
        }
        roots.push(self.global.local_repository());
        roots
    }

    pub fn metadata(&self) -> RepositoryMetadata {
        RepositoryMetadata::new(self.metadata_roots())
    }
}
