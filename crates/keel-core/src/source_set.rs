use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Source set names every module has, whether or not they are configured.
pub const DEFAULT_SOURCE_SETS: [&str; 2] = ["main", "test"];

/// Directory overrides for one source set, from `[sources.<set>]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceDirsConfig {
    /// Replaces the conventional `src/<set>/java` and `src/<set>/kotlin`.
    #[serde(default)]
    pub authored: Option<Vec<String>>,
    /// Extra generated roots on top of the ones plugins add.
    #[serde(default)]
    pub generated: Vec<String>,
}

/// A named source set of a module (e.g. `main`, `test`).
///
/// Directories are absolute. Authored directories hold hand-written code;
/// generated directories are filled by code generators and must never
/// shadow an authored file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSet {
    pub name: String,
    pub authored: Vec<PathBuf>,
    pub generated: Vec<PathBuf>,
}

impl SourceSet {
    /// A source set with conventional authored directories under `module_dir`.
    pub fn new(name: impl Into<String>, module_dir: &Path) -> Self {
        let name = name.into();
        let base = module_dir.join("src").join(&name);
        Self {
            authored: vec![base.join("java"), base.join("kotlin")],
            generated: Vec::new(),
            name,
        }
    }

    /// Build a source set from its manifest overrides.
    pub fn from_config(name: &str, module_dir: &Path, config: Option<&SourceDirsConfig>) -> Self {
        let mut set = Self::new(name, module_dir);
        if let Some(config) = config {
            if let Some(authored) = &config.authored {
                set.authored = authored.iter().map(|d| module_dir.join(d)).collect();
            }
            for dir in &config.generated {
                set.add_generated(module_dir.join(dir));
            }
        }
        set
    }

    /// Append a generated directory unless it is already present.
    pub fn add_generated(&mut self, dir: PathBuf) {
        if !self.generated.contains(&dir) {
            self.generated.push(dir);
        }
    }

    /// Authored directories followed by generated ones, duplicates removed.
    pub fn source_path(&self) -> Vec<PathBuf> {
        let mut path: Vec<PathBuf> = Vec::with_capacity(self.authored.len() + self.generated.len());
        for dir in self.authored.iter().chain(&self.generated) {
            if !path.contains(dir) {
                path.push(dir.clone());
            }
        }
        path
    }

    /// Returns `true` if any authored directory exists on disk.
    pub fn exists(&self) -> bool {
        self.authored.iter().any(|d| d.is_dir())
    }
}
