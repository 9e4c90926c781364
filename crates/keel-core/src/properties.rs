use std::collections::BTreeMap;
use std::path::Path;

use keel_util::errors::KeelError;

/// Loads a `.keel.env` file (shell-style `KEY=value` format).
///
/// `.keel.env` holds publishing credentials and CI tokens that should stay
/// out of version control. Values are visible to `${env:VAR}` references in
/// `Keel.toml` and in the global config.
pub fn load_env_file(path: &Path) -> miette::Result<BTreeMap<String, String>> {
    let mut map = BTreeMap::new();
    if !path.is_file() {
        return Ok(map);
    }
    let content = std::fs::read_to_string(path).map_err(KeelError::Io)?;
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
        if let Some((key, value)) = trimmed.split_once('=') {
            map.insert(key.trim().to_string(), unquote(value.trim()).to_string());
        }
    }
    Ok(map)
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value.strip_prefix(quote).and_then(|v| v.strip_suffix(quote)) {
            return inner;
        }
    }
    value
}

/// Replace `${env:VAR}` and `${env:VAR:-fallback}` references.
///
/// Values come from `overrides` (the `.keel.env` entries) first, then the
/// process environment. An unset variable without a fallback becomes the
/// empty string. Text without a closing brace is left alone.
pub fn interpolate(input: &str, overrides: &BTreeMap<String, String>) -> String {
    const OPEN: &str = "${env:";
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find(OPEN) {
        out.push_str(&rest[..start]);
        let after = &rest[start + OPEN.len()..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let body = &after[..end];
        let (key, fallback) = match body.split_once(":-") {
            Some((k, f)) => (k, Some(f)),
            None => (body, None),
        };
        let value = overrides
            .get(key)
            .cloned()
            .or_else(|| std::env::var(key).ok())
            .or_else(|| fallback.map(str::to_string))
            .unwrap_or_default();
        out.push_str(&value);
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    out
}
