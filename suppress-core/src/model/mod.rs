//! Table data and suppression results.

mod pattern;
mod table;

pub use pattern::{
    AttackerBound, IterationRecord, OutcomeStatus, SolveStats, SuppressionOutcome,
    SuppressionPattern,
};
pub use table::{Cell, CellStatus, Relation, RelationRow, TableModel};
