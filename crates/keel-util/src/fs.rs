use std::path::{Path, PathBuf};

/// The nearest directory at or above `start` holding `filename`.
pub fn find_ancestor_with(start: &Path, filename: &str) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(filename).is_file())
        .map(Path::to_path_buf)
}

/// Create `path` and its parents unless it is already a directory.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if path.is_dir() {
        return Ok(());
    }
    std::fs::create_dir_all(path)
}

/// List every regular file under `root`, as paths relative to `root`.
///
/// The result is sorted. A missing root yields an empty list.
pub fn relative_files(root: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    if root.is_dir() {
        walk(root, root, &mut out)?;
    }
    out.sort();
    Ok(out)
}

fn walk(root: &Path, dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            walk(root, &path, out)?;
        } else if let Ok(rel) = path.strip_prefix(root) {
            out.push(rel.to_path_buf());
        }
    }
    Ok(())
}

/// Expand a leading `~/` using `HOME` (or `USERPROFILE` on Windows).
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string());
        Path::new(&home).join(rest)
    } else {
        PathBuf::from(path)
    }
}
