//! Feasibility cuts over the suppression variables.

mod initial;
mod pool;

pub use initial::starting_cuts;
pub use pool::{CutPool, CutPoolStats};

use suppress_lp::LinearRow;

use crate::model::SuppressionPattern;

/// Source of a cut (for tracking and debugging).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutSource {
    /// Attacker raised the cell above its upper protection level.
    UpperProtection {
        /// Sensitive cell index.
        cell: usize,
    },

    /// Attacker pushed the cell below its lower protection level.
    LowerProtection {
        /// Sensitive cell index.
        cell: usize,
    },

    /// Relation-level upper protection seeded before the first iteration.
    RelationUpper {
        /// Relation index.
        relation: usize,
        /// Sensitive cell index.
        cell: usize,
    },

    /// Relation-level lower protection seeded before the first iteration.
    RelationLower {
        /// Relation index.
        relation: usize,
        /// Sensitive cell index.
        cell: usize,
    },

    /// No relation may contain exactly one suppressed cell.
    Bridgeless {
        /// Relation index.
        relation: usize,
        /// Cell that needs a partner.
        cell: usize,
    },

    /// User-provided cut.
    User,
}

/// A linear cut `sum(coef_j * x_j) >= rhs` over suppression variables.
#[derive(Debug, Clone, PartialEq)]
pub struct FeasibilityCut {
    /// Nonzero `(cell index, coefficient)` pairs, sorted by cell index.
    pub terms: Vec<(usize, f64)>,

    /// Right-hand side.
    pub rhs: f64,

    /// Source of this cut.
    pub source: CutSource,
}

impl FeasibilityCut {
    /// Create a cut; terms are sorted and zero coefficients dropped.
    pub fn new(mut terms: Vec<(usize, f64)>, rhs: f64, source: CutSource) -> Self {
        terms.retain(|&(_, a)| a != 0.0);
        terms.sort_by_key(|&(j, _)| j);
        Self { terms, rhs, source }
    }

    /// Left-hand side at a 0/1 (or fractional) point.
    pub fn activity(&self, x: &[f64]) -> f64 {
        self.terms.iter().map(|&(j, a)| a * x[j]).sum()
    }

    /// Left-hand side at a pattern.
    pub fn pattern_activity(&self, pattern: &SuppressionPattern) -> f64 {
        self.terms
            .iter()
            .filter(|&&(j, _)| pattern.is_suppressed(j))
            .map(|&(_, a)| a)
            .sum()
    }

    /// Violation `rhs - lhs` (positive means violated).
    pub fn violation(&self, x: &[f64]) -> f64 {
        self.rhs - self.activity(x)
    }

    /// Check if the cut is violated by more than `tol`.
    pub fn is_violated(&self, x: &[f64], tol: f64) -> bool {
        self.violation(x) > tol
    }

    /// Check if a pattern satisfies the cut.
    pub fn is_satisfied_by(&self, pattern: &SuppressionPattern, tol: f64) -> bool {
        self.pattern_activity(pattern) >= self.rhs - tol
    }

    /// Check that the cut has finite data and can actually bind.
    pub fn is_valid(&self) -> bool {
        let all_finite = self.terms.iter().all(|(_, a)| a.is_finite()) && self.rhs.is_finite();
        all_finite && (self.rhs > 0.0 || self.terms.iter().any(|&(_, a)| a < 0.0))
    }

    /// Constraint row for the master LP.
    pub fn to_row(&self) -> LinearRow {
        LinearRow::ge(self.terms.clone(), self.rhs)
    }
}
