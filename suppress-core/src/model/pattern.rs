//! Suppression patterns, attacker bounds and the protection report.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::TableModel;

/// Which cells are withheld from publication.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SuppressionPattern {
    suppressed: Vec<bool>,
}

impl SuppressionPattern {
    /// Pattern over `n` cells with nothing suppressed.
    pub fn empty(n: usize) -> Self {
        Self {
            suppressed: vec![false; n],
        }
    }

    /// Pattern from explicit flags.
    pub fn from_flags(suppressed: Vec<bool>) -> Self {
        Self { suppressed }
    }

    /// Pattern from a 0/1 vector; entries above one half count as suppressed.
    pub fn from_values(x: &[f64]) -> Self {
        Self {
            suppressed: x.iter().map(|&v| v > 0.5).collect(),
        }
    }

    /// Pattern with only the sensitive cells suppressed.
    pub fn primary(model: &TableModel) -> Self {
        Self {
            suppressed: model.cells().iter().map(|c| c.is_sensitive()).collect(),
        }
    }

    /// Number of cells covered.
    pub fn len(&self) -> usize {
        self.suppressed.len()
    }

    /// True if the pattern covers no cells.
    pub fn is_empty(&self) -> bool {
        self.suppressed.is_empty()
    }

    /// Whether cell `idx` is suppressed.
    pub fn is_suppressed(&self, idx: usize) -> bool {
        self.suppressed[idx]
    }

    /// Set the flag of cell `idx`.
    pub fn set(&mut self, idx: usize, suppressed: bool) {
        self.suppressed[idx] = suppressed;
    }

    /// Flags as a slice.
    pub fn as_slice(&self) -> &[bool] {
        &self.suppressed
    }

    /// Flags as a 0/1 vector.
    pub fn to_values(&self) -> Vec<f64> {
        self.suppressed.iter().map(|&s| if s { 1.0 } else { 0.0 }).collect()
    }

    /// Number of suppressed cells.
    pub fn count(&self) -> usize {
        self.suppressed.iter().filter(|&&s| s).count()
    }

    /// Indices of the suppressed cells.
    pub fn suppressed_cells(&self) -> impl Iterator<Item = usize> + '_ {
        self.suppressed
            .iter()
            .enumerate()
            .filter(|(_, &s)| s)
            .map(|(i, _)| i)
    }

    /// True if every cell suppressed in `other` is suppressed here.
    pub fn is_superset_of(&self, other: &SuppressionPattern) -> bool {
        self.suppressed.len() == other.suppressed.len()
            && self
                .suppressed
                .iter()
                .zip(&other.suppressed)
                .all(|(&a, &b)| a || !b)
    }

    /// Suppression cost: total weight of the suppressed non-sensitive cells.
    pub fn cost(&self, model: &TableModel) -> f64 {
        self.suppressed_cells()
            .map(|i| model.cell(i))
            .filter(|c| !c.is_sensitive())
            .map(|c| c.weight)
            .sum()
    }
}

/// Range an attacker can derive for one cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttackerBound {
    /// Smallest value consistent with the published data.
    pub lower: f64,

    /// Largest value consistent with the published data.
    pub upper: f64,
}

impl AttackerBound {
    /// Degenerate range of a published cell.
    pub fn exact(value: f64) -> Self {
        Self {
            lower: value,
            upper: value,
        }
    }

    /// Width of the range.
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// How a protection run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeStatus {
    /// The dive found a fully protected pattern.
    Converged,

    /// The exact search proved the pattern cost-optimal.
    Optimal,

    /// The exact search hit its budget; the pattern is the best protected
    /// one found.
    ExactLimit,

    /// The dive budget ran out; the pattern is the last one evaluated and
    /// is not fully protected.
    Exhausted,
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeStatus::Converged => write!(f, "Converged"),
            OutcomeStatus::Optimal => write!(f, "Optimal"),
            OutcomeStatus::ExactLimit => write!(f, "ExactLimit"),
            OutcomeStatus::Exhausted => write!(f, "Exhausted"),
        }
    }
}

/// One dive iteration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationRecord {
    /// Iteration number (0-based).
    pub iteration: usize,

    /// Pattern proposed by the master selector.
    pub pattern: SuppressionPattern,

    /// Number of suppressed cells in the pattern.
    pub suppressed: usize,

    /// Suppression count the master was required to reach.
    pub min_count: usize,

    /// Suppression cost of the pattern.
    pub cost: f64,

    /// Protection violations found by the checker.
    pub violations: usize,

    /// New cuts added to the pool.
    pub cuts_added: usize,
}

/// Solve statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SolveStats {
    /// Dive iterations performed.
    pub iterations: usize,

    /// Attacker LPs solved.
    pub attacker_solves: usize,

    /// Attacker LPs skipped thanks to witness bounds.
    pub attacker_skips: usize,

    /// Cuts in the pool at the end (starting constraints included).
    pub cuts_total: usize,

    /// Branch-and-bound nodes over all master solves.
    pub master_nodes: u64,

    /// Suppressions removed as redundant.
    pub redundant_removed: usize,

    /// Wall-clock time in milliseconds.
    pub elapsed_ms: u64,
}

/// Final suppression decision with its protection report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuppressionOutcome {
    /// How the run ended.
    pub status: OutcomeStatus,

    /// Final pattern.
    pub pattern: SuppressionPattern,

    /// Suppression cost of the final pattern.
    pub cost: f64,

    /// Whether every sensitive cell meets its protection levels.
    pub fully_protected: bool,

    /// Attacker range per cell under the final pattern.
    pub bounds: Vec<AttackerBound>,

    /// Solve statistics.
    pub stats: SolveStats,

    /// Per-iteration dive trace.
    pub trace: Vec<IterationRecord>,
}

impl SuppressionOutcome {
    /// True if the pattern can be published as is.
    pub fn is_success(&self) -> bool {
        self.fully_protected && self.status != OutcomeStatus::Exhausted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_superset() {
        let a = SuppressionPattern::from_flags(vec![true, false, true]);
        let b = SuppressionPattern::from_flags(vec![true, true, true]);
        assert!(b.is_superset_of(&a));
        assert!(!a.is_superset_of(&b));
        assert!(a.is_superset_of(&a));
        assert!(!a.is_superset_of(&SuppressionPattern::empty(2)));
    }

    #[test]
    fn test_from_values_rounds() {
        let p = SuppressionPattern::from_values(&[0.9999, 1e-7, 1.0]);
        assert_eq!(p.as_slice(), &[true, false, true]);
        assert_eq!(p.count(), 2);
        assert_eq!(p.suppressed_cells().collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(p.to_values(), vec![1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_bound_width() {
        let b = AttackerBound { lower: 3.0, upper: 7.5 };
        assert_eq!(b.width(), 4.5);
        assert_eq!(AttackerBound::exact(2.0).width(), 0.0);
    }
}
