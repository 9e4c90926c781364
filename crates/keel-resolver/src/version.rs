//! Version ordering used to pick the highest requested version.
//!
//! A version string is cut into parts at `.`, `-`, `_` and `+`, and at
//! every switch between digits and letters, so `1.2rc1` becomes
//! `1 2 rc 1`. Parts are compared left to right:
//!
//! * numbers compare numerically and beat any word;
//! * words rank `dev` < other text (alphabetical, so `alpha` < `beta` <
//!   `milestone`) < `rc` < `snapshot` < `release`/`final`/`ga` < `sp`;
//! * when one version runs out of parts, the missing part counts as
//!   `release`: `1.0-rc1` < `1.0` < `1.0-sp1`, and `1.0` < `1.0.1`.

use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone)]
pub struct Version {
    raw: String,
    parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    /// Digits without leading zeros.
    Number(String),
    Word(Word),
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Word {
    Dev,
    Other(String),
    Rc,
    Snapshot,
    Release,
    Sp,
}

impl Word {
    fn classify(text: &str) -> Self {
        let lower = text.to_ascii_lowercase();
        match lower.as_str() {
            "dev" => Word::Dev,
            "rc" | "cr" => Word::Rc,
            "snapshot" => Word::Snapshot,
            "release" | "final" | "ga" => Word::Release,
            "sp" => Word::Sp,
            _ => Word::Other(lower),
        }
    }
}

impl Version {
    pub fn parse(raw: &str) -> Self {
        let mut parts = Vec::new();
        let mut current = String::new();
        let mut digits = false;

        let mut flush = |current: &mut String, digits: bool| {
            if current.is_empty() {
                return;
            }
            let part = if digits {
                let trimmed = current.trim_start_matches('0');
                Part::Number(if trimmed.is_empty() { "0".to_string() } else { trimmed.to_string() })
            } else {
                Part::Word(Word::classify(current))
            };
            parts.push(part);
            current.clear();
        };

        for c in raw.trim().chars() {
            if matches!(c, '.' | '-' | '_' | '+') {
                flush(&mut current, digits);
                continue;
            }
            let is_digit = c.is_ascii_digit();
            if !current.is_empty() && is_digit != digits {
                flush(&mut current, digits);
            }
            digits = is_digit;
            current.push(c);
        }
        flush(&mut current, digits);

        Self {
            raw: raw.to_string(),
            parts,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

fn compare_parts(a: Option<&Part>, b: Option<&Part>) -> Ordering {
    const MISSING: Word = Word::Release;
    match (a, b) {
        (None, None) => Ordering::Equal,
        (Some(Part::Number(x)), Some(Part::Number(y))) => {
            x.len().cmp(&y.len()).then_with(|| x.cmp(y))
        }
        (Some(Part::Number(_)), _) => Ordering::Greater,
        (_, Some(Part::Number(_))) => Ordering::Less,
        (Some(Part::Word(x)), Some(Part::Word(y))) => x.cmp(y),
        (Some(Part::Word(x)), None) => x.cmp(&MISSING),
        (None, Some(Part::Word(y))) => MISSING.cmp(y),
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.parts.len().max(other.parts.len());
        (0..len)
            .map(|i| compare_parts(self.parts.get(i), other.parts.get(i)))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Order version strings; equal versions spelled differently fall back to
/// the spelling so the order is total.
pub fn compare(a: &str, b: &str) -> Ordering {
    Version::parse(a)
        .cmp(&Version::parse(b))
        .then_with(|| a.cmp(b))
}

/// The highest of `versions`, if any.
pub fn highest<'a, I>(versions: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    versions.into_iter().max_by(|a, b| compare(a, b))
}
