//! Error types for the suppression engine.

use suppress_lp::{LpError, LpStatus};
use thiserror::Error;

/// Errors that can occur while protecting a table.
///
/// Budget exhaustion after at least one evaluated pattern is not an error;
/// it is reported through [`crate::OutcomeStatus::Exhausted`].
#[derive(Error, Debug)]
pub enum SuppressError {
    /// Cell/relation data failed validation
    #[error("Invalid model: {0}")]
    InvalidModel(String),

    /// Settings out of range
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    /// An attacker LP did not reach optimality; the bounds or relations
    /// of the input are inconsistent
    #[error("Attacker problem for cell {cell} ended with status {status}")]
    AttackerFailure {
        /// Identifier of the target cell.
        cell: String,
        /// Status reported by the LP engine.
        status: LpStatus,
    },

    /// No suppression pattern satisfies the accumulated cuts
    #[error("Master problem infeasible: {0}")]
    MasterInfeasible(String),

    /// Master search failed for numerical or budget reasons
    #[error("Master solve failed: {0}")]
    MasterFailure(String),

    /// Budget ran out before any pattern was evaluated
    #[error("Budget exhausted: {0}")]
    BudgetExhausted(String),

    /// LP engine error
    #[error("LP error: {0}")]
    Lp(#[from] LpError),
}

/// Result type for suppression operations.
pub type SuppressResult<T> = Result<T, SuppressError>;
