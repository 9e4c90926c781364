//! Source path composition and the no-overwrite check.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use keel_core::source_set::SourceSet;
use keel_util::errors::KeelError;

/// Add the generated roots of a plugin step to a source set.
pub fn add_generated(set: &mut SourceSet, module_dir: &Path, roots: &[String]) {
    for root in roots {
        set.add_generated(module_dir.join(root));
    }
}

/// Fail if a generated tree holds a file that an authored tree of the
/// same source set already declares.
///
/// Files are compared by their path relative to their own root, so
/// `src/main/java/io/X.java` and `generated/main/java/io/X.java` collide.
pub fn check_overlap(module: &str, module_dir: &Path, set: &SourceSet) -> miette::Result<()> {
    let mut authored: BTreeMap<PathBuf, &Path> = BTreeMap::new();
    for dir in &set.authored {
        for file in keel_util::fs::relative_files(dir).map_err(KeelError::Io)? {
            authored.entry(file).or_insert(dir.as_path());
        }
    }
    if authored.is_empty() {
        return Ok(());
    }

    for dir in &set.generated {
        if set.authored.contains(dir) {
            continue;
        }
        for file in keel_util::fs::relative_files(dir).map_err(KeelError::Io)? {
            if let Some(owner) = authored.get(&file) {
                return Err(KeelError::SourceOverlap {
                    module: module.to_string(),
                    file: file.display().to_string(),
                    authored: display_dir(module_dir, owner),
                    generated: display_dir(module_dir, dir),
                }
                .into());
            }
        }
    }
    tracing::debug!(
        "{module}/{}: {} authored file(s), no overlap",
        set.name,
        authored.len()
    );
    Ok(())
}

fn display_dir(module_dir: &Path, dir: &Path) -> String {
    dir.strip_prefix(module_dir)
        .unwrap_or(dir)
        .display()
        .to_string()
}
