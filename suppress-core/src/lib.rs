//! Secondary cell suppression for linked statistical tables.
//!
//! Given a table of cells tied together by additive relations, some of them
//! sensitive, this crate chooses a minimum-weight set of additional cells to
//! withhold so that nobody who knows the published cells and the relations
//! can pin a sensitive cell down to within its protection levels.
//!
//! # Algorithm
//!
//! A Benders-style decomposition:
//!
//! - **Master selector**: a 0/1 program choosing which cells to suppress,
//!   subject to an append-only pool of feasibility cuts
//! - **Attacker engine**: one persistent LP over all cells; min and max of
//!   a sensitive cell give the range an intruder can derive
//! - **Protection checker**: turns each shortfall into a cut built from the
//!   attacker LP's reduced costs
//! - **Dive**: alternates the two with a growing minimum suppression count
//!   until a pattern is fully protected; an optional exact mode continues
//!   with lazy cuts inside the master's branch-and-bound
//!
//! # Example
//!
//! ```
//! use suppress_core::{protect, Cell, CellStatus, Relation, SuppressSettings, TableModel};
//!
//! // a + b + c = t, with a sensitive
//! let cells = vec![
//!     Cell::new("a", 3.0, CellStatus::Sensitive)
//!         .with_bounds(0.0, 30.0)
//!         .with_protection(2.0, 2.0),
//!     Cell::new("b", 4.0, CellStatus::Suppressible).with_bounds(0.0, 30.0).with_weight(4.0),
//!     Cell::new("c", 5.0, CellStatus::Suppressible).with_bounds(0.0, 30.0).with_weight(5.0),
//!     Cell::new("t", 12.0, CellStatus::Suppressible).with_bounds(0.0, 30.0).with_weight(12.0),
//! ];
//! let model = TableModel::new(cells, vec![Relation::total("t", ["a", "b", "c"])])?;
//!
//! let outcome = protect(&model, SuppressSettings::default())?;
//! assert!(outcome.is_success());
//! assert!(outcome.pattern.is_suppressed(0));
//! assert!(outcome.pattern.is_suppressed(1));
//! # Ok::<(), suppress_core::SuppressError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod attacker;
pub mod checker;
pub mod cuts;
pub mod decomposition;
pub mod error;
pub mod master;
pub mod model;
pub mod search;
pub mod settings;

pub use attacker::{AttackDirection, AttackerEngine, AttackerSolution};
pub use checker::{CheckResult, ProtectionChecker, ProtectionSide, Violation};
pub use cuts::{CutPool, CutSource, FeasibilityCut};
pub use decomposition::{protect, DiveState, SuppressionSolver};
pub use error::{SuppressError, SuppressResult};
pub use master::{LazyCutCallback, MasterSelector, MasterSolution, MasterStatus};
pub use model::{
    AttackerBound, Cell, CellStatus, IterationRecord, OutcomeStatus, Relation, SolveStats,
    SuppressionOutcome, SuppressionPattern, TableModel,
};
pub use settings::{BranchingRule, ExactSettings, MasterSettings, NodeSelection, SuppressSettings};
