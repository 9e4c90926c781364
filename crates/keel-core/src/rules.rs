//! Forced-version and exclusion rules.
//!
//! Rules come from `[[force]]` and `[[exclude]]` entries in the root
//! manifest and in member manifests. A rule is scoped to one resolution
//! scope (`main`, `test`) or to `all` of them; a scope-specific rule is
//! more specific than an `all` rule.

use std::collections::BTreeMap;
use std::fmt;

use globset::{Glob, GlobMatcher};
use serde::{Deserialize, Serialize};

use keel_util::errors::KeelError;

use crate::dependency::{Coordinate, DependencyRef, ResolutionScope};
use crate::version_catalog::VersionCatalog;

/// The scope a rule applies to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleScope {
    #[default]
    All,
    Main,
    Test,
}

impl RuleScope {
    pub fn applies_to(self, scope: ResolutionScope) -> bool {
        match self {
            RuleScope::All => true,
            RuleScope::Main => scope == ResolutionScope::Main,
            RuleScope::Test => scope == ResolutionScope::Test,
        }
    }

    fn specific(scope: ResolutionScope) -> Self {
        match scope {
            ResolutionScope::Main => RuleScope::Main,
            ResolutionScope::Test => RuleScope::Test,
        }
    }
}

impl fmt::Display for RuleScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RuleScope::All => "all",
            RuleScope::Main => "main",
            RuleScope::Test => "test",
        })
    }
}

/// A `[[force]]` entry as written in the manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ForceEntry {
    /// `"group:artifact:version"`, applied to all scopes.
    Short(String),
    Detailed(ForceTable),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForceTable {
    #[serde(default)]
    pub dependency: Option<String>,
    #[serde(default)]
    pub catalog: Option<String>,
    #[serde(default)]
    pub scope: RuleScope,
}

/// An `[[exclude]]` entry as written in the manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExcludeEntry {
    Short(String),
    Detailed {
        pattern: String,
        #[serde(default)]
        scope: RuleScope,
    },
}

/// A forced version for one coordinate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForcedRule {
    pub coordinate: Coordinate,
    pub version: String,
    pub scope: RuleScope,
    /// Where the rule was declared, for error messages.
    pub origin: String,
}

impl ForcedRule {
    /// Turn a manifest entry into a rule, resolving catalog references.
    pub fn from_entry(
        entry: &ForceEntry,
        catalog: &VersionCatalog,
        origin: &str,
    ) -> miette::Result<Self> {
        let (reference, scope) = match entry {
            ForceEntry::Short(s) => (parse_forced_ref(s, origin)?, RuleScope::All),
            ForceEntry::Detailed(t) => {
                let reference = match (&t.dependency, &t.catalog) {
                    (Some(s), None) => parse_forced_ref(s, origin)?,
                    (None, Some(alias)) => catalog.library(alias)?,
                    _ => {
                        return Err(KeelError::Manifest {
                            message: format!(
                                "[[force]] in {origin} needs exactly one of `dependency` or `catalog`"
                            ),
                        }
                        .into())
                    }
                };
                (reference, t.scope)
            }
        };
        let version = reference.version.ok_or_else(|| KeelError::Manifest {
            message: format!(
                "forced rule for {} in {origin} has no version",
                reference.coordinate
            ),
        })?;
        Ok(Self {
            coordinate: reference.coordinate,
            version,
            scope,
            origin: origin.to_string(),
        })
    }
}

fn parse_forced_ref(s: &str, origin: &str) -> miette::Result<DependencyRef> {
    DependencyRef::parse(s).ok_or_else(|| {
        KeelError::Manifest {
            message: format!("invalid forced coordinate `{s}` in {origin}; expected group:artifact:version"),
        }
        .into()
    })
}

/// The active forced rules of one resolution.
#[derive(Debug, Clone, Default)]
pub struct ForceSet {
    rules: Vec<ForcedRule>,
}

impl ForceSet {
    pub fn new(rules: Vec<ForcedRule>) -> Self {
        Self { rules }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ForcedRule> {
        self.rules.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Reject rules of equal specificity that force different versions for
    /// the same coordinate.
    pub fn validate(&self) -> miette::Result<()> {
        let mut grouped: BTreeMap<(&Coordinate, RuleScope), Vec<&ForcedRule>> = BTreeMap::new();
        for rule in &self.rules {
            grouped
                .entry((&rule.coordinate, rule.scope))
                .or_default()
                .push(rule);
        }
        for ((coordinate, scope), rules) in grouped {
            let first = &rules[0].version;
            if rules.iter().any(|r| &r.version != first) {
                let versions = rules
                    .iter()
                    .map(|r| format!("{} ({})", r.version, r.origin))
                    .collect::<Vec<_>>()
                    .join(" vs ");
                return Err(KeelError::Conflict {
                    coordinate: coordinate.to_string(),
                    scope: scope.to_string(),
                    versions,
                }
                .into());
            }
        }
        Ok(())
    }

    /// The most specific rule forcing `coordinate` in `scope`.
    pub fn lookup(&self, coordinate: &Coordinate, scope: ResolutionScope) -> Option<&ForcedRule> {
        let specific = RuleScope::specific(scope);
        let matching = || self.rules.iter().filter(|r| &r.coordinate == coordinate);
        matching()
            .find(|r| r.scope == specific)
            .or_else(|| matching().find(|r| r.scope == RuleScope::All))
    }
}

/// A compiled exclusion pattern.
///
/// A pattern without `:` matches on the group; `group:artifact` matches on
/// both. Either part may contain glob wildcards.
#[derive(Debug, Clone)]
pub struct ExclusionRule {
    pub pattern: String,
    pub scope: RuleScope,
    matcher: GlobMatcher,
}

impl ExclusionRule {
    pub fn new(pattern: &str, scope: RuleScope) -> miette::Result<Self> {
        let matcher = Glob::new(pattern)
            .map_err(|e| KeelError::Manifest {
                message: format!("invalid exclusion pattern `{pattern}`: {e}"),
            })?
            .compile_matcher();
        Ok(Self {
            pattern: pattern.to_string(),
            scope,
            matcher,
        })
    }

    pub fn from_entry(entry: &ExcludeEntry) -> miette::Result<Self> {
        match entry {
            ExcludeEntry::Short(p) => Self::new(p, RuleScope::All),
            ExcludeEntry::Detailed { pattern, scope } => Self::new(pattern, *scope),
        }
    }

    /// Same pattern and scope.
    pub fn same_as(&self, other: &ExclusionRule) -> bool {
        self.pattern == other.pattern && self.scope == other.scope
    }

    pub fn matches(&self, coordinate: &Coordinate) -> bool {
        if self.pattern.contains(':') {
            self.matcher.is_match(coordinate.to_string())
        } else {
            self.matcher.is_match(&coordinate.group)
        }
    }
}

/// A list of exclusion rules checked together.
#[derive(Debug, Clone, Default)]
pub struct ExclusionSet {
    rules: Vec<ExclusionRule>,
}

impl ExclusionSet {
    pub fn new(rules: Vec<ExclusionRule>) -> Self {
        let mut set = Self::default();
        for rule in rules {
            set.push(rule);
        }
        set
    }

    fn push(&mut self, rule: ExclusionRule) {
        if !self.contains(&rule) {
            self.rules.push(rule);
        }
    }

    fn contains(&self, rule: &ExclusionRule) -> bool {
        self.rules.iter().any(|r| r.same_as(rule))
    }

    /// Compile unscoped patterns, as attached to a single declaration.
    pub fn from_patterns(patterns: &[String]) -> miette::Result<Self> {
        let rules = patterns
            .iter()
            .map(|p| ExclusionRule::new(p, RuleScope::All))
            .collect::<miette::Result<Vec<_>>>()?;
        Ok(Self::new(rules))
    }

    pub fn excludes(&self, coordinate: &Coordinate, scope: ResolutionScope) -> bool {
        self.rules
            .iter()
            .any(|r| r.scope.applies_to(scope) && r.matches(coordinate))
    }

    /// A new set holding the rules of both.
    pub fn union(&self, other: &ExclusionSet) -> ExclusionSet {
        let mut set = self.clone();
        for rule in &other.rules {
            set.push(rule.clone());
        }
        set
    }

    /// Only the rules both sets hold.
    pub fn intersection(&self, other: &ExclusionSet) -> ExclusionSet {
        ExclusionSet {
            rules: self.rules.iter().filter(|r| other.contains(r)).cloned().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(coord: &str, version: &str, scope: RuleScope, origin: &str) -> ForcedRule {
        ForcedRule {
            coordinate: Coordinate::parse(coord).unwrap(),
            version: version.to_string(),
            scope,
            origin: origin.to_string(),
        }
    }

    #[test]
    fn agreeing_rules_validate() {
        let set = ForceSet::new(vec![
            rule("org.example:lib", "1.5", RuleScope::All, "Keel.toml"),
            rule("org.example:lib", "1.5", RuleScope::All, "core/Keel.toml"),
        ]);
        assert!(set.validate().is_ok());
    }

    #[test]
    fn disagreeing_rules_in_same_scope_conflict() {
        let set = ForceSet::new(vec![
            rule("org.example:lib", "1.5", RuleScope::Main, "Keel.toml"),
            rule("org.example:lib", "1.6", RuleScope::Main, "core/Keel.toml"),
        ]);
        let err = set.validate().unwrap_err().to_string();
        assert!(err.contains("org.example:lib"));
        assert!(err.contains("1.5 (Keel.toml) vs 1.6 (core/Keel.toml)"));
    }

    #[test]
    fn different_scopes_do_not_conflict() {
        let set = ForceSet::new(vec![
            rule("org.example:lib", "1.5", RuleScope::All, "Keel.toml"),
            rule("org.example:lib", "1.7", RuleScope::Test, "Keel.toml"),
        ]);
        assert!(set.validate().is_ok());
    }

    #[test]
    fn specific_scope_wins_over_all() {
        let set = ForceSet::new(vec![
            rule("org.example:lib", "1.5", RuleScope::All, "Keel.toml"),
            rule("org.example:lib", "1.7", RuleScope::Test, "Keel.toml"),
        ]);
        let coord = Coordinate::new("org.example", "lib");
        assert_eq!(set.lookup(&coord, ResolutionScope::Test).unwrap().version, "1.7");
        assert_eq!(set.lookup(&coord, ResolutionScope::Main).unwrap().version, "1.5");
    }

    #[test]
    fn group_and_artifact_patterns() {
        let lite = ExclusionRule::new("com.google.protobuf:protobuf-lite", RuleScope::All).unwrap();
        let group = ExclusionRule::new("org.gradle*", RuleScope::All).unwrap();
        assert!(lite.matches(&Coordinate::new("com.google.protobuf", "protobuf-lite")));
        assert!(!lite.matches(&Coordinate::new("com.google.protobuf", "protobuf-java")));
        assert!(group.matches(&Coordinate::new("org.gradle.api", "core")));
        assert!(!group.matches(&Coordinate::new("io.grpc", "grpc-core")));
    }

    #[test]
    fn scoped_exclusion_only_applies_to_its_scope() {
        let set = ExclusionSet::new(vec![ExclusionRule::new("junit", RuleScope::Main).unwrap()]);
        let junit = Coordinate::new("junit", "junit");
        assert!(set.excludes(&junit, ResolutionScope::Main));
        assert!(!set.excludes(&junit, ResolutionScope::Test));
    }

    #[test]
    fn invalid_glob_is_a_manifest_error() {
        assert!(ExclusionRule::new("com.[bad", RuleScope::All).is_err());
    }

    #[test]
    fn exclusion_sets_intersect_on_pattern_and_scope() {
        let a = ExclusionSet::from_patterns(&["org:noise".to_string(), "com.bad".to_string()]).unwrap();
        let b = ExclusionSet::new(vec![
            ExclusionRule::new("org:noise", RuleScope::All).unwrap(),
            ExclusionRule::new("com.bad", RuleScope::Test).unwrap(),
        ]);
        let both = a.intersection(&b);
        assert_eq!(both.len(), 1);
        let noise = Coordinate::parse("org:noise").unwrap();
        assert!(both.excludes(&noise, ResolutionScope::Main));
        assert!(!both.excludes(&Coordinate::parse("com.bad:x").unwrap(), ResolutionScope::Test));
        assert_eq!(a.union(&a).len(), 2);
        assert!(a.intersection(&ExclusionSet::default()).is_empty());
    }
}
