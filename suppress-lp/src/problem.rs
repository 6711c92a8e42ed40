//! Problem data structures and validation.
//!
//! The engine works with bounded linear programs of the form
//!
//! ```text
//! minimize / maximize   c^T x
//! subject to            a_i^T x  (<= | = | >=)  b_i     for every row i
//!                       l <= x <= u
//! ```
//!
//! Every variable needs at least one finite bound; free variables are not
//! supported because nothing in the suppression model produces them.

use std::fmt;

use sprs::{CsMat, TriMat};

use crate::error::{LpError, LpResult};

/// Sparse matrix in CSR format (one outer vector per constraint row).
pub type SparseCsr = CsMat<f64>;

/// Optimization direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObjSense {
    /// Minimize the objective.
    #[default]
    Minimize,
    /// Maximize the objective.
    Maximize,
}

impl ObjSense {
    /// Multiplier that turns this objective into a minimization.
    pub(crate) fn sign(self) -> f64 {
        match self {
            ObjSense::Minimize => 1.0,
            ObjSense::Maximize => -1.0,
        }
    }
}

/// Sense of a linear constraint row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowSense {
    /// `a^T x <= b`
    Le,
    /// `a^T x = b`
    Eq,
    /// `a^T x >= b`
    Ge,
}

/// A bounded decision variable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Variable {
    /// Lower bound (may be `-inf` if `upper` is finite).
    pub lower: f64,
    /// Upper bound (may be `+inf` if `lower` is finite).
    pub upper: f64,
    /// Objective coefficient.
    pub cost: f64,
}

/// A sparse linear constraint `coefs^T x (sense) rhs`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearRow {
    /// Nonzero coefficients as `(variable, value)` pairs.
    pub coefs: Vec<(usize, f64)>,
    /// Row sense.
    pub sense: RowSense,
    /// Right-hand side.
    pub rhs: f64,
}

impl LinearRow {
    /// Create a new row.
    pub fn new(coefs: Vec<(usize, f64)>, sense: RowSense, rhs: f64) -> Self {
        Self { coefs, sense, rhs }
    }

    /// `coefs^T x >= rhs`
    pub fn ge(coefs: Vec<(usize, f64)>, rhs: f64) -> Self {
        Self::new(coefs, RowSense::Ge, rhs)
    }

    /// `coefs^T x <= rhs`
    pub fn le(coefs: Vec<(usize, f64)>, rhs: f64) -> Self {
        Self::new(coefs, RowSense::Le, rhs)
    }

    /// `coefs^T x = rhs`
    pub fn eq(coefs: Vec<(usize, f64)>, rhs: f64) -> Self {
        Self::new(coefs, RowSense::Eq, rhs)
    }

    /// Evaluate the left-hand side at `x`.
    pub fn activity(&self, x: &[f64]) -> f64 {
        self.coefs.iter().map(|&(j, a)| a * x[j]).sum()
    }

    /// Amount by which `x` violates this row (zero if satisfied).
    pub fn violation(&self, x: &[f64]) -> f64 {
        let lhs = self.activity(x);
        match self.sense {
            RowSense::Le => (lhs - self.rhs).max(0.0),
            RowSense::Ge => (self.rhs - lhs).max(0.0),
            RowSense::Eq => (lhs - self.rhs).abs(),
        }
    }
}

/// A complete linear program.
#[derive(Debug, Clone, Default)]
pub struct LpProblem {
    /// Decision variables.
    pub vars: Vec<Variable>,
    /// Constraint rows.
    pub rows: Vec<LinearRow>,
    /// Optimization direction.
    pub sense: ObjSense,
}

impl LpProblem {
    /// Create an empty minimization problem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of variables.
    pub fn num_vars(&self) -> usize {
        self.vars.len()
    }

    /// Number of constraint rows.
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Number of inequality rows (each needs a slack column).
    pub fn num_inequalities(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| r.sense != RowSense::Eq)
            .count()
    }

    /// Assemble the constraint matrix (rows x vars) in CSR format.
    pub fn constraint_matrix(&self) -> SparseCsr {
        let mut tri = TriMat::new((self.num_rows(), self.num_vars()));
        for (i, row) in self.rows.iter().enumerate() {
            for &(j, a) in &row.coefs {
                if a != 0.0 {
                    tri.add_triplet(i, j, a);
                }
            }
        }
        tri.to_csr()
    }

    /// Validate dimensions, finiteness and bounds.
    pub fn validate(&self) -> LpResult<()> {
        for (j, v) in self.vars.iter().enumerate() {
            Self::validate_variable(j, v)?;
        }
        for (i, row) in self.rows.iter().enumerate() {
            self.validate_row(i, row)?;
        }
        Ok(())
    }

    /// Check a single variable stored at index `j`.
    pub fn validate_variable(j: usize, v: &Variable) -> LpResult<()> {
        if v.lower.is_nan() || v.upper.is_nan() || !v.cost.is_finite() {
            return Err(LpError::InvalidProblem(format!(
                "variable {} has non-finite data",
                j
            )));
        }
        if v.lower > v.upper {
            return Err(LpError::InvalidProblem(format!(
                "variable {} has lower bound {} above upper bound {}",
                j, v.lower, v.upper
            )));
        }
        if !v.lower.is_finite() && !v.upper.is_finite() {
            return Err(LpError::InvalidProblem(format!(
                "variable {} is free; at least one finite bound is required",
                j
            )));
        }
        Ok(())
    }

    /// Check a single row stored at index `i` against the current variables.
    pub fn validate_row(&self, i: usize, row: &LinearRow) -> LpResult<()> {
        let n = self.num_vars();
        if !row.rhs.is_finite() {
            return Err(LpError::InvalidProblem(format!(
                "row {} has non-finite right-hand side",
                i
            )));
        }
        for &(j, a) in &row.coefs {
            if j >= n {
                return Err(LpError::UnknownVariable { var: j, num_vars: n });
            }
            if !a.is_finite() {
                return Err(LpError::InvalidProblem(format!(
                    "row {} has non-finite coefficient on variable {}",
                    i, j
                )));
            }
        }
        Ok(())
    }
}

/// Simplex solver settings.
#[derive(Debug, Clone)]
pub struct LpSettings {
    /// Maximum number of simplex pivots per solve (both phases).
    pub max_iter: usize,

    /// Primal feasibility tolerance (bounds and phase-1 objective).
    pub tol_feas: f64,

    /// Optimality tolerance on reduced costs.
    pub tol_opt: f64,

    /// Smallest pivot element accepted in the ratio test.
    pub tol_pivot: f64,

    /// Consecutive degenerate pivots before switching from Dantzig to
    /// Bland pricing for the rest of the solve.
    pub bland_after_degenerate: usize,

    /// Reuse the previous basis when only bounds, costs or right-hand
    /// sides changed since the last solve.
    pub warm_start: bool,
}

impl Default for LpSettings {
    fn default() -> Self {
        // Allow environment variable override for the pivot budget
        let max_iter = std::env::var("SUPPRESS_LP_MAX_ITER")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(50_000);

        Self {
            max_iter,
            tol_feas: 1e-9,
            tol_opt: 1e-9,
            tol_pivot: 1e-11,
            bland_after_degenerate: 50,
            warm_start: true,
        }
    }
}

impl LpSettings {
    /// Set the pivot budget.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Enable or disable warm starts.
    pub fn with_warm_start(mut self, warm_start: bool) -> Self {
        self.warm_start = warm_start;
        self
    }
}

/// Solution status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LpStatus {
    /// Optimal solution found
    Optimal,

    /// No point satisfies the constraints and bounds
    Infeasible,

    /// Objective is unbounded in the optimization direction
    Unbounded,

    /// Pivot budget exhausted before optimality was proven
    MaxIters,
}

impl fmt::Display for LpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LpStatus::Optimal => write!(f, "Optimal"),
            LpStatus::Infeasible => write!(f, "Infeasible"),
            LpStatus::Unbounded => write!(f, "Unbounded"),
            LpStatus::MaxIters => write!(f, "MaxIters"),
        }
    }
}

/// Solve diagnostics.
#[derive(Debug, Clone, Copy, Default)]
pub struct SolveInfo {
    /// Pivots performed in phase 1.
    pub phase1_iters: usize,

    /// Pivots and bound flips performed in phase 2.
    pub phase2_iters: usize,

    /// Whether the previous basis was reused.
    pub warm_started: bool,
}

/// Solution of a linear program.
///
/// Duals and reduced costs are expressed in the problem's own optimization
/// direction: for a maximization, a variable resting at its upper bound has
/// a nonnegative reduced cost; for a minimization, a nonpositive one.
#[derive(Debug, Clone)]
pub struct LpSolution {
    /// Solution status
    pub status: LpStatus,

    /// Primal values (one per variable)
    pub x: Vec<f64>,

    /// Objective value at `x`
    pub obj_val: f64,

    /// Row duals `y` (one per constraint row)
    pub duals: Vec<f64>,

    /// Reduced costs `c - A^T y` (one per variable)
    pub reduced_costs: Vec<f64>,

    /// Solve diagnostics
    pub info: SolveInfo,
}

impl LpSolution {
    /// A solution carrying only a non-optimal status.
    pub(crate) fn with_status(status: LpStatus, info: SolveInfo) -> Self {
        let obj_val = match status {
            LpStatus::Unbounded => f64::NEG_INFINITY,
            _ => f64::INFINITY,
        };
        Self {
            status,
            x: Vec::new(),
            obj_val,
            duals: Vec::new(),
            reduced_costs: Vec::new(),
            info,
        }
    }

    /// True if the solve finished with a proven optimum.
    pub fn is_optimal(&self) -> bool {
        self.status == LpStatus::Optimal
    }
}
