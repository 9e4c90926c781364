//! Publication planning and execution.
//!
//! [`plan`] reads an artifact once and turns it into one
//! [`PublishOperation`] per target, all sharing the same bytes.
//! [`execute`] runs the operations concurrently; each target succeeds or
//! fails on its own and the outcome is collected in a [`PublishReport`].

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use keel_core::config::GlobalConfig;
use keel_core::manifest::PublishTargetConfig;
use keel_util::errors::KeelError;

use crate::auth::Credentials;
use crate::checksum;
use crate::pom::Pom;
use crate::repository::{coordinate_path, file_name, MavenRepository, RepositoryLocation};
use crate::transport;

/// How a target's credentials reference resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetCredentials {
    None,
    Resolved(Credentials),
    /// The target names a `[credentials.<name>]` entry that does not exist.
    Missing(String),
}

/// One destination repository.
#[derive(Debug, Clone)]
pub struct PublicationTarget {
    pub name: String,
    pub repository: MavenRepository,
    pub credentials: TargetCredentials,
    pub classifier: Option<String>,
}

impl PublicationTarget {
    /// Resolve a `[publishing.targets.<name>]` entry against the global
    /// config. Relative directory URLs are taken from `base`.
    pub fn resolve(
        name: &str,
        config: &PublishTargetConfig,
        global: &GlobalConfig,
        base: &std::path::Path,
    ) -> miette::Result<Self> {
        let mut repository = MavenRepository::from_url(name, &config.url)?;
        if let RepositoryLocation::Directory(dir) = &repository.location {
            if dir.is_relative() {
                repository.location = RepositoryLocation::Directory(base.join(dir));
            }
        }
        let credentials = match &config.credentials {
            None => TargetCredentials::None,
            Some(key) => match global.credentials.get(key) {
                Some(entry) => TargetCredentials::Resolved(Credentials::from(entry)),
                None => TargetCredentials::Missing(key.clone()),
            },
        };
        Ok(Self {
            name: name.to_string(),
            repository,
            credentials,
            classifier: config.classifier.clone(),
        })
    }
}

/// A built artifact ready to publish.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub group: String,
    pub artifact_id: String,
    pub version: String,
    pub path: PathBuf,
    pub pom: Pom,
}

impl Artifact {
    pub fn coordinate(&self) -> String {
        format!("{}:{}:{}", self.group, self.artifact_id, self.version)
    }
}

/// Publishing one artifact to one target.
#[derive(Debug, Clone)]
pub struct PublishOperation {
    pub target: PublicationTarget,
    pub coordinate: String,
    pub group: String,
    pub artifact_id: String,
    pub version: String,
    /// Shared by every operation planned from the same artifact.
    pub bytes: Arc<[u8]>,
    pub sha256: String,
    pub pom: Arc<str>,
}

impl PublishOperation {
    /// Repository-relative paths and contents of every file this operation
    /// writes: the jar, the POM, and their checksum sidecars.
    pub fn files(&self) -> Vec<(String, Vec<u8>)> {
        let dir = coordinate_path(&self.group, &self.artifact_id, &self.version);
        let jar = file_name(
            &self.artifact_id,
            &self.version,
            self.target.classifier.as_deref(),
            "jar",
        );
        let pom = file_name(&self.artifact_id, &self.version, None, "pom");

        let mut files = Vec::with_capacity(8);
        for (name, data) in [(jar, self.bytes.to_vec()), (pom, self.pom.as_bytes().to_vec())] {
            let sidecars = checksum::sidecars(&name, &data);
            files.push((format!("{dir}/{name}"), data));
            for (sidecar, hex) in sidecars {
                files.push((format!("{dir}/{sidecar}"), hex.into_bytes()));
            }
        }
        files
    }
}

/// Read `artifact` once and plan one operation per target.
pub fn plan(artifact: &Artifact, targets: &[PublicationTarget]) -> miette::Result<Vec<PublishOperation>> {
    let bytes: Arc<[u8]> = std::fs::read(&artifact.path)
        .map_err(|e| KeelError::Publish {
            target: artifact.coordinate(),
            message: format!("cannot read {}: {e}", artifact.path.display()),
        })?
        .into();
    let sha256 = keel_util::hash::sha256_bytes(&bytes);
    let pom: Arc<str> = artifact.pom.to_xml()?.into();

    Ok(targets
        .iter()
        .map(|target| PublishOperation {
            target: target.clone(),
            coordinate: artifact.coordinate(),
            group: artifact.group.clone(),
            artifact_id: artifact.artifact_id.clone(),
            version: artifact.version.clone(),
            bytes: Arc::clone(&bytes),
            sha256: sha256.clone(),
            pom: Arc::clone(&pom),
        })
        .collect())
}

/// Outcome of one operation.
#[derive(Debug, Clone, Serialize)]
pub struct PublishResult {
    pub target: String,
    pub coordinate: String,
    pub location: String,
    pub sha256: String,
    pub files: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PublishResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// The failure as a typed error, for display.
    pub fn to_error(&self) -> Option<KeelError> {
        self.error.as_ref().map(|message| KeelError::Publish {
            target: self.target.clone(),
            message: format!("{}: {message}", self.coordinate),
        })
    }
}

/// Every result of a publish run, in plan order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PublishReport {
    pub results: Vec<PublishResult>,
}

impl PublishReport {
    pub fn failed(&self) -> impl Iterator<Item = &PublishResult> {
        self.results.iter().filter(|r| !r.is_success())
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    /// `Err(PublishIncomplete)` if any target failed.
    pub fn into_result(self) -> miette::Result<()> {
        let failed = self.failed().count();
        if failed == 0 {
            Ok(())
        } else {
            Err(KeelError::PublishIncomplete {
                failed,
                total: self.results.len(),
            }
            .into())
        }
    }
}

/// Run `operations` with at most `jobs` in flight.
///
/// A failing operation only affects its own result.
pub async fn execute(operations: Vec<PublishOperation>, jobs: usize) -> miette::Result<PublishReport> {
    let needs_http = operations
        .iter()
        .any(|op| matches!(op.target.repository.location, RepositoryLocation::Http(_)));
    let client = if needs_http {
        Some(transport::build_client()?)
    } else {
        None
    };

    let semaphore = Arc::new(Semaphore::new(jobs.max(1)));
    let mut join_set = JoinSet::new();
    let pending: Vec<PublishResult> = operations
        .iter()
        .map(|op| result_for(op, Err("publish task did not complete".to_string())))
        .collect();

    for (index, op) in operations.into_iter().enumerate() {
        let sem = Arc::clone(&semaphore);
        let client = client.clone();
        join_set.spawn(async move {
            let _permit = sem.acquire().await;
            let outcome = run_operation(&op, client.as_ref()).await;
            (index, result_for(&op, outcome))
        });
    }

    Ok(PublishReport {
        results: collect(join_set, pending).await,
    })
}

/// Fill `slots` from finished tasks. A task that panicked or was cancelled
/// leaves its failed placeholder in place.
async fn collect(
    mut join_set: JoinSet<(usize, PublishResult)>,
    mut slots: Vec<PublishResult>,
) -> Vec<PublishResult> {
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((index, result)) => {
                match &result.error {
                    None => tracing::info!("published {} to {}", result.coordinate, result.target),
                    Some(e) => tracing::warn!("{} to {} failed: {e}", result.coordinate, result.target),
                }
                if let Some(slot) = slots.get_mut(index) {
                    *slot = result;
                }
            }
            Err(e) => tracing::warn!("publish task aborted: {e}"),
        }
    }
    slots
}

fn result_for(op: &PublishOperation, outcome: Result<usize, String>) -> PublishResult {
    let location = op
        .target
        .repository
        .locate(&coordinate_path(&op.group, &op.artifact_id, &op.version));
    let (files, error) = match outcome {
        Ok(n) => (n, None),
        Err(e) => (0, Some(e)),
    };
    PublishResult {
        target: op.target.name.clone(),
        coordinate: op.coordinate.clone(),
        location,
        sha256: op.sha256.clone(),
        files,
        error,
    }
}

async fn run_operation(op: &PublishOperation, client: Option<&reqwest::Client>) -> Result<usize, String> {
    let credentials = match &op.target.credentials {
        TargetCredentials::Missing(key) => {
            return Err(format!("no [credentials.{key}] entry in the global config"));
        }
        TargetCredentials::Resolved(c) => Some(c),
        TargetCredentials::None => None,
    };

    let files = op.files();
    let count = files.len();
    match &op.target.repository.location {
        RepositoryLocation::Directory(root) => {
            for (relative, data) in files {
                let path = root.join(&relative);
                if let Some(parent) = path.parent() {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .map_err(|e| format!("cannot create {}: {e}", parent.display()))?;
                }
                tokio::fs::write(&path, data)
                    .await
                    .map_err(|e| format!("cannot write {}: {e}", path.display()))?;
            }
        }
        RepositoryLocation::Http(base) => {
            let client = client.ok_or_else(|| "no HTTP client available".to_string())?;
            for (relative, data) in files {
                transport::put_bytes(client, &format!("{base}/{relative}"), data, credentials).await?;
            }
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(dir: &std::path::Path) -> Artifact {
        let path = dir.join("lib-1.0.jar");
        std::fs::write(&path, b"jar bytes").unwrap();
        Artifact {
            group: "org.example".into(),
            artifact_id: "lib".into(),
            version: "1.0".into(),
            path,
            pom: Pom {
                group: Some("org.example".into()),
                artifact: Some("lib".into()),
                version: Some("1.0".into()),
                ..Pom::default()
            },
        }
    }

    fn dir_target(name: &str, dir: PathBuf) -> PublicationTarget {
        PublicationTarget {
            name: name.into(),
            repository: MavenRepository::directory(name, dir),
            credentials: TargetCredentials::None,
            classifier: None,
        }
    }

    #[test]
    fn operations_share_bytes() {
        let tmp = tempfile::tempdir().unwrap();
        let ops = plan(
            &artifact(tmp.path()),
            &[
                dir_target("a", tmp.path().join("a")),
                dir_target("b", tmp.path().join("b")),
            ],
        )
        .unwrap();
        assert_eq!(ops.len(), 2);
        assert!(Arc::ptr_eq(&ops[0].bytes, &ops[1].bytes));
        assert_eq!(ops[0].sha256, ops[1].sha256);
    }

    #[test]
    fn files_include_pom_and_sidecars() {
        let tmp = tempfile::tempdir().unwrap();
        let mut target = dir_target("a", tmp.path().join("a"));
        target.classifier = Some("all".into());
        let ops = plan(&artifact(tmp.path()), &[target]).unwrap();
        let names: Vec<String> = ops[0].files().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names.len(), 8);
        assert_eq!(names[0], "org/example/lib/1.0/lib-1.0-all.jar");
        assert!(names.contains(&"org/example/lib/1.0/lib-1.0.pom.sha1".to_string()));
    }

    #[test]
    fn unreadable_artifact_fails_planning() {
        let tmp = tempfile::tempdir().unwrap();
        let mut a = artifact(tmp.path());
        a.path = tmp.path().join("missing.jar");
        assert!(plan(&a, &[dir_target("a", tmp.path().join("a"))]).is_err());
    }

    #[test]
    fn missing_credentials_are_per_target() {
        let global = GlobalConfig::default();
        let config = PublishTargetConfig {
            url: "https://repo.example/releases".into(),
            credentials: Some("cloud".into()),
            classifier: None,
        };
        let target = PublicationTarget::resolve("cloud", &config, &global, std::path::Path::new("/")).unwrap();
        assert_eq!(target.credentials, TargetCredentials::Missing("cloud".into()));
    }

    #[tokio::test]
    async fn aborted_task_is_reported_as_failed() {
        let tmp = tempfile::tempdir().unwrap();
        let ops = plan(
            &artifact(tmp.path()),
            &[
                dir_target("a", tmp.path().join("a")),
                dir_target("b", tmp.path().join("b")),
            ],
        )
        .unwrap();
        let pending: Vec<PublishResult> = ops
            .iter()
            .map(|op| result_for(op, Err("publish task did not complete".to_string())))
            .collect();

        let mut join_set = JoinSet::new();
        let done = result_for(&ops[0], Ok(2));
        join_set.spawn(async move { (0, done) });
        let lost = result_for(&ops[1], Ok(2));
        join_set.spawn(async move {
            if lost.files > 0 {
                panic!("upload task crashed");
            }
            (1, lost)
        });

        let report = PublishReport {
            results: collect(join_set, pending).await,
        };
        assert_eq!(report.results.len(), 2);
        assert_eq!(report.results[0].error, None);
        assert_eq!(report.results[1].target, "b");
        assert_eq!(report.results[1].error.as_deref(), Some("publish task did not complete"));
        let err = report.into_result().err().unwrap().to_string();
        assert_eq!(err, "1 of 2 publication(s) failed");
    }
}
