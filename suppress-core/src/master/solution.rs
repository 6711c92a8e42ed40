//! Master selector results and incumbent tracking.

use std::fmt;

use crate::model::SuppressionPattern;

/// Status of a master search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MasterStatus {
    /// Optimal selection found within tolerance.
    Optimal,

    /// No selection satisfies the cuts.
    Infeasible,

    /// Node limit reached, best selection returned.
    NodeLimit,

    /// Time limit reached, best selection returned.
    TimeLimit,

    /// Gap limit reached (selection within gap_tol of optimal).
    GapLimit,
}

impl MasterStatus {
    /// Returns true if a selection was found.
    pub fn has_solution(&self) -> bool {
        !matches!(self, MasterStatus::Infeasible)
    }

    /// Returns true if optimality was proven.
    pub fn is_optimal(&self) -> bool {
        matches!(self, MasterStatus::Optimal | MasterStatus::GapLimit)
    }
}

impl fmt::Display for MasterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MasterStatus::Optimal => write!(f, "Optimal"),
            MasterStatus::Infeasible => write!(f, "Infeasible"),
            MasterStatus::NodeLimit => write!(f, "NodeLimit"),
            MasterStatus::TimeLimit => write!(f, "TimeLimit"),
            MasterStatus::GapLimit => write!(f, "GapLimit"),
        }
    }
}

/// Selection returned by the master search.
#[derive(Debug, Clone)]
pub struct MasterSolution {
    /// Search status.
    pub status: MasterStatus,

    /// Selected pattern.
    pub pattern: SuppressionPattern,

    /// Weighted cost of the selection (primal bound).
    pub objective: f64,

    /// Best dual bound when the search stopped.
    pub bound: f64,

    /// Relative optimality gap.
    pub gap: f64,

    /// Number of nodes explored.
    pub nodes_explored: u64,

    /// Cuts added lazily during the search.
    pub lazy_cuts: u64,

    /// Search time in milliseconds.
    pub solve_time_ms: u64,

    /// Number of times the incumbent was updated.
    pub incumbent_updates: u64,
}

impl MasterSolution {
    /// Compute relative gap.
    pub fn compute_gap(primal: f64, dual: f64) -> f64 {
        if primal.is_infinite() || dual.is_infinite() {
            return f64::INFINITY;
        }
        let denom = primal.abs().max(1e-10);
        (primal - dual).max(0.0) / denom
    }
}

/// Tracks the best known selection (incumbent).
#[derive(Debug, Clone)]
pub struct IncumbentTracker {
    /// Current best 0/1 vector (if any).
    pub solution: Option<Vec<f64>>,

    /// Cost of the incumbent; +inf while there is none.
    pub obj_val: f64,

    /// Number of times incumbent was updated.
    pub update_count: u64,
}

impl Default for IncumbentTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl IncumbentTracker {
    /// Create a new incumbent tracker.
    pub fn new() -> Self {
        Self {
            solution: None,
            obj_val: f64::INFINITY,
            update_count: 0,
        }
    }

    /// Check if we have an incumbent.
    pub fn has_incumbent(&self) -> bool {
        self.solution.is_some()
    }

    /// Try to update incumbent with a new selection.
    ///
    /// Only strict improvements are accepted, so among equal-cost
    /// selections the first one found is kept.
    pub fn update(&mut self, x: &[f64], obj: f64) -> bool {
        if obj < self.obj_val - 1e-9 {
            self.solution = Some(x.to_vec());
            self.obj_val = obj;
            self.update_count += 1;
            true
        } else {
            false
        }
    }

    /// Compute relative gap to a dual bound.
    pub fn gap(&self, dual_bound: f64) -> f64 {
        MasterSolution::compute_gap(self.obj_val, dual_bound)
    }
}
