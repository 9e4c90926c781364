//! Maven repository layout and the two kinds of repository Keel talks to:
//! directories (`file://`, or a plain path) and HTTP servers.

use std::path::{Path, PathBuf};

use keel_util::errors::KeelError;

use crate::pom::Pom;

/// `org.example:lib:1.0` becomes `org/example/lib/1.0`.
pub fn coordinate_path(group: &str, artifact: &str, version: &str) -> String {
    format!("{}/{artifact}/{version}", group.replace('.', "/"))
}

/// `lib-1.0.jar`, `lib-1.0-all.jar`, `lib-1.0.pom`.
pub fn file_name(artifact: &str, version: &str, classifier: Option<&str>, extension: &str) -> String {
    match classifier {
        Some(c) => format!("{artifact}-{version}-{c}.{extension}"),
        None => format!("{artifact}-{version}.{extension}"),
    }
}

/// Where a repository lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryLocation {
    Directory(PathBuf),
    Http(String),
}

/// A named Maven repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MavenRepository {
    pub name: String,
    pub location: RepositoryLocation,
}

impl MavenRepository {
    /// Parse a repository URL. `file://` URLs and bare paths are
    /// directories; `http://` and `https://` are servers.
    pub fn from_url(name: &str, url: &str) -> miette::Result<Self> {
        let location = if let Some(path) = url.strip_prefix("file://") {
            RepositoryLocation::Directory(PathBuf::from(path))
        } else if url.starts_with("https://") || url.starts_with("http://") {
            RepositoryLocation::Http(url.trim_end_matches('/').to_string())
        } else if url.contains("://") {
            return Err(KeelError::Manifest {
                message: format!("repository `{name}` has unsupported URL scheme: {url}"),
            }
            .into());
        } else {
            RepositoryLocation::Directory(PathBuf::from(url))
        };
        Ok(Self {
            name: name.to_string(),
            location,
        })
    }

    pub fn directory(name: &str, dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            location: RepositoryLocation::Directory(dir.into()),
        }
    }

    /// Absolute URL or path of a file in this repository, as a string.
    pub fn locate(&self, relative: &str) -> String {
        match &self.location {
            RepositoryLocation::Directory(dir) => dir.join(relative).display().to_string(),
            RepositoryLocation::Http(base) => format!("{base}/{relative}"),
        }
    }
}

/// Read-only view of a Maven-layout directory, such as `~/.m2/repository`.
#[derive(Debug, Clone)]
pub struct LocalRepository {
    root: PathBuf,
}

impl LocalRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn pom_path(&self, group: &str, artifact: &str, version: &str) -> PathBuf {
        self.root
            .join(coordinate_path(group, artifact, version))
            .join(file_name(artifact, version, None, "pom"))
    }

    pub fn jar_path(&self, group: &str, artifact: &str, version: &str) -> PathBuf {
        self.root
            .join(coordinate_path(group, artifact, version))
            .join(file_name(artifact, version, None, "jar"))
    }

    /// Load a POM with its parent chain applied. `Ok(None)` when the POM
    /// is not in this repository.
    pub fn read_pom(&self, group: &str, artifact: &str, version: &str) -> miette::Result<Option<Pom>> {
        let Some(mut pom) = self.read_single(group, artifact, version)? else {
            return Ok(None);
        };
        let mut next = pom.parent.clone();
        let mut seen = 0;
        while let Some(parent_ref) = next.take() {
            seen += 1;
            if seen > 16 {
                break;
            }
            match self.read_single(&parent_ref.group, &parent_ref.artifact, &parent_ref.version)? {
                Some(parent) => {
                    pom.inherit(&parent);
                    next = parent.parent.clone();
                }
                None => {
                    tracing::debug!(
                        "parent POM {}:{}:{} not in {}",
                        parent_ref.group,
                        parent_ref.artifact,
                        parent_ref.version,
                        self.root.display()
                    );
                }
            }
        }
        Ok(Some(pom))
    }

    fn read_single(&self, group: &str, artifact: &str, version: &str) -> miette::Result<Option<Pom>> {
        let path = self.pom_path(group, artifact, version);
        if !path.is_file() {
            return Ok(None);
        }
        let xml = std::fs::read_to_string(&path).map_err(KeelError::Io)?;
        Pom::parse(&xml)
            .map(Some)
            .map_err(|e| e.wrap_err(format!("in {}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths() {
        assert_eq!(
            coordinate_path("io.spine.tools", "spine-model-check", "2.0.0"),
            "io/spine/tools/spine-model-check/2.0.0"
        );
        assert_eq!(file_name("lib", "1.0", Some("all"), "jar"), "lib-1.0-all.jar");
        assert_eq!(file_name("lib", "1.0", None, "pom"), "lib-1.0.pom");
    }

    #[test]
    fn url_kinds() {
        let http = MavenRepository::from_url("cloud", "https://repo.example/releases/").unwrap();
        assert_eq!(http.locate("a/b.jar"), "https://repo.example/releases/a/b.jar");
        let file = MavenRepository::from_url("local", "file:///srv/repo").unwrap();
        assert_eq!(file.location, RepositoryLocation::Directory(PathBuf::from("/srv/repo")));
        assert!(MavenRepository::from_url("s3", "s3://bucket").is_err());
    }

    #[test]
    fn missing_pom_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        let repo = LocalRepository::new(tmp.path());
        assert!(repo.read_pom("g", "a", "1").unwrap().is_none());
    }
}
