//! Error types for the LP engine.

use thiserror::Error;

/// Errors that can occur while building or solving a linear program.
///
/// Infeasibility and unboundedness are not errors at this level; they are
/// reported through [`crate::LpStatus`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LpError {
    /// Problem validation failed
    #[error("Invalid problem: {0}")]
    InvalidProblem(String),

    /// Variable index out of range
    #[error("Unknown variable {var} (problem has {num_vars} variables)")]
    UnknownVariable {
        /// Requested index.
        var: usize,
        /// Number of variables in the problem.
        num_vars: usize,
    },

    /// Constraint index out of range
    #[error("Unknown constraint {row} (problem has {num_rows} constraints)")]
    UnknownConstraint {
        /// Requested index.
        row: usize,
        /// Number of constraints in the problem.
        num_rows: usize,
    },

    /// Solution queried before a successful solve
    #[error("No solution available: {0}")]
    NoSolution(String),
}

/// Result type for LP operations.
pub type LpResult<T> = Result<T, LpError>;
