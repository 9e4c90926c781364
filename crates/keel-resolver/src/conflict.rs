//! Reporting of version decisions made during reconciliation.

use std::fmt;

use serde::Serialize;

use keel_core::dependency::{Coordinate, ResolutionScope};

/// Why a version was selected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SelectionReason {
    HighestWins,
    Forced { origin: String },
}

impl fmt::Display for SelectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionReason::HighestWins => f.write_str("highest wins"),
            SelectionReason::Forced { origin } => write!(f, "forced by {origin}"),
        }
    }
}

/// The decision for one coordinate in one scope.
#[derive(Debug, Clone, Serialize)]
pub struct Decision {
    pub scope: ResolutionScope,
    pub coordinate: Coordinate,
    /// Distinct requested versions, lowest first.
    pub requested: Vec<String>,
    pub selected: String,
    pub reason: SelectionReason,
}

impl Decision {
    /// More than one version was asked for, or the selection overrode the
    /// only request.
    pub fn is_conflict(&self) -> bool {
        self.requested.len() > 1 || self.requested.iter().any(|r| r != &self.selected)
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}]: requested {} -> {} ({})",
            self.coordinate,
            self.scope,
            self.requested.join(", "),
            self.selected,
            self.reason
        )
    }
}

/// Every decision of a resolution, sorted by scope and coordinate.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConflictReport {
    pub decisions: Vec<Decision>,
}

impl ConflictReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, decision: Decision) {
        self.decisions.push(decision);
    }

    pub fn extend(&mut self, other: ConflictReport) {
        self.decisions.extend(other.decisions);
        self.decisions
            .sort_by(|a, b| (a.scope, &a.coordinate).cmp(&(b.scope, &b.coordinate)));
    }

    pub fn conflicts(&self) -> impl Iterator<Item = &Decision> {
        self.decisions.iter().filter(|d| d.is_conflict())
    }

    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.decisions.len()
    }
}

impl fmt::Display for ConflictReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let conflicts: Vec<&Decision> = self.conflicts().collect();
        if conflicts.is_empty() {
            return write!(f, "No version conflicts.");
        }
        writeln!(f, "Version conflicts ({}):", conflicts.len())?;
        for d in conflicts {
            writeln!(f, "  {d}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decision(requested: &[&str], selected: &str, reason: SelectionReason) -> Decision {
        Decision {
            scope: ResolutionScope::Main,
            coordinate: Coordinate::new("org.example", "lib"),
            requested: requested.iter().map(|s| s.to_string()).collect(),
            selected: selected.to_string(),
            reason,
        }
    }

    #[test]
    fn empty_report() {
        let report = ConflictReport::new();
        assert!(report.is_empty());
        assert_eq!(report.to_string(), "No version conflicts.");
    }

    #[test]
    fn single_request_is_not_a_conflict() {
        let mut report = ConflictReport::new();
        report.add(decision(&["1.0"], "1.0", SelectionReason::HighestWins));
        assert_eq!(report.len(), 1);
        assert_eq!(report.conflicts().count(), 0);
    }

    #[test]
    fn report_lists_conflicts() {
        let mut report = ConflictReport::new();
        report.add(decision(&["1.0", "2.0"], "2.0", SelectionReason::HighestWins));
        report.add(decision(
            &["2.0"],
            "1.5",
            SelectionReason::Forced {
                origin: "Keel.toml".into(),
            },
        ));
        let s = report.to_string();
        assert!(s.starts_with("Version conflicts (2):"));
        assert!(s.contains("org.example:lib [main]: requested 1.0, 2.0 -> 2.0 (highest wins)"));
        assert!(s.contains("-> 1.5 (forced by Keel.toml)"));
    }
}
