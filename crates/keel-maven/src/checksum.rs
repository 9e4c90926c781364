//! Checksum sidecars (`.md5`, `.sha1`, `.sha256`) in Maven layout.

use std::path::Path;

use keel_util::errors::KeelError;
use keel_util::hash::Digests;

/// `(file name, contents)` of every sidecar for `file_name`.
pub fn sidecars(file_name: &str, data: &[u8]) -> Vec<(String, String)> {
    Digests::of(data)
        .sidecars()
        .iter()
        .map(|(ext, hex)| (format!("{file_name}.{ext}"), (*hex).to_string()))
        .collect()
}

/// Extract the hex hash from a checksum file.
///
/// Maven checksum files may contain just the hash, or `hash  filename`.
pub fn extract_hash(content: &str) -> &str {
    content.split_whitespace().next().unwrap_or("")
}

/// Check `path` against whichever sidecar sits next to it, strongest
/// first. A file without sidecars passes with a debug note.
pub fn verify_file(path: &Path) -> miette::Result<()> {
    let data = std::fs::read(path).map_err(KeelError::Io)?;
    let digests = Digests::of(&data);
    for (ext, actual) in digests.sidecars().iter().rev() {
        let sidecar = path.with_file_name(format!(
            "{}.{ext}",
            path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default()
        ));
        if !sidecar.is_file() {
            continue;
        }
        let content = std::fs::read_to_string(&sidecar).map_err(KeelError::Io)?;
        let expected = extract_hash(&content);
        if expected.eq_ignore_ascii_case(actual) {
            return Ok(());
        }
        return Err(KeelError::Generic {
            message: format!(
                "{ext} mismatch for {}: expected {expected}, got {actual}",
                path.display()
            ),
        }
        .into());
    }
    tracing::debug!("no checksum sidecar for {}", path.display());
    Ok(())
}
