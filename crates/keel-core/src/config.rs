use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use keel_util::errors::KeelError;

/// Global user configuration loaded from `$KEEL_HOME/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub repository: RepositoryConfig,

    #[serde(default)]
    pub credentials: BTreeMap<String, CredentialEntry>,
}

/// Build settings from `[build]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Upper bound on concurrent publications.
    #[serde(default = "default_jobs")]
    pub jobs: u32,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            jobs: default_jobs(),
        }
    }
}

fn default_jobs() -> u32 {
    std::thread::available_parallelism()
        .map(|n| n.get() as u32)
        .unwrap_or(4)
}

/// Local repository settings from `[repository]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Maven-layout directory holding resolved jars and POMs.
    #[serde(default = "default_local_repository")]
    pub local: String,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            local: default_local_repository(),
        }
    }
}

fn default_local_repository() -> String {
    "~/.m2/repository".to_string()
}

/// Credentials for a named publication target, from `[credentials.<name>]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialEntry {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Sent as a bearer token when set.
    #[serde(default)]
    pub token: Option<String>,
}

impl GlobalConfig {
    /// Load the global configuration, or return defaults if the file doesn't exist.
    pub fn load() -> miette::Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load from an explicit path. `${env:VAR}` references are resolved
    /// against `.keel.env` in the same directory and the environment.
    pub fn load_from(path: &Path) -> miette::Result<Self> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| KeelError::Generic {
            message: format!("Failed to read global config: {e}"),
        })?;
        let dir = path.parent().unwrap_or(Path::new("."));
        let env = crate::properties::load_env_file(&dir.join(".keel.env"))?;
        let content = crate::properties::interpolate(&content, &env);
        toml::from_str(&content).map_err(|e| {
            KeelError::Generic {
                message: format!("Failed to parse global config: {e}"),
            }
            .into()
        })
    }

    /// Returns the default path to the global config file.
    pub fn default_path() -> PathBuf {
        dirs_path().join("config.toml")
    }

    /// The local repository with `~/` expanded.
    pub fn local_repository(&self) -> PathBuf {
        keel_util::fs::expand_home(&self.repository.local)
    }
}

/// Returns the Keel data directory: `$KEEL_HOME`, or `~/.keel`.
pub fn dirs_path() -> PathBuf {
    if let Ok(home) = std::env::var("KEEL_HOME") {
        if !home.is_empty() {
            return PathBuf::from(home);
        }
    }
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    Path::new(&home).join(".keel")
}
