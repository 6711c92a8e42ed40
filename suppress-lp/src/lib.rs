//! Bounded-variable linear programming for the suppression engine.
//!
//! This crate solves the small, repeatedly modified linear programs that
//! secondary cell suppression needs:
//!
//! - **Attacker problems**: min/max of one cell subject to table relations,
//!   re-solved after every change of which cells are fixed or free
//! - **Master relaxations**: 0/1 selection LPs with an append-only set of
//!   feasibility cuts, re-solved at every branch-and-bound node
//!
//! # Algorithm
//!
//! A two-phase primal simplex on a dense tableau with explicit variable
//! bounds (nonbasic variables rest at either bound, bound flips are taken
//! when they are cheaper than a pivot). The basis is kept between solves,
//! so bound, cost and right-hand-side edits restart from the previous
//! optimum and appended cuts only need a short phase 1. Exact row duals and reduced costs are produced at optimality;
//! feasibility cuts are built from them.
//!
//! # Example
//!
//! ```
//! use suppress_lp::{LinearRow, OptimizationBackend, SimplexBackend, LpSettings, LpStatus, ObjSense};
//!
//! // max x0 s.t. x0 + x1 = 4, x0 in [0, 10], x1 in [1, 2]
//! let mut lp = SimplexBackend::new(LpSettings::default())?;
//! let x0 = lp.add_variable(0.0, 10.0, 1.0)?;
//! let x1 = lp.add_variable(1.0, 2.0, 0.0)?;
//! lp.add_constraint(LinearRow::eq(vec![(x0, 1.0), (x1, 1.0)], 4.0))?;
//! lp.set_sense(ObjSense::Maximize);
//!
//! assert_eq!(lp.optimize()?, LpStatus::Optimal);
//! assert!((lp.objective_value()? - 3.0).abs() < 1e-9);
//! # Ok::<(), suppress_lp::LpError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod error;
pub mod problem;
pub mod simplex;

pub use backend::{OptimizationBackend, SimplexBackend};
pub use error::{LpError, LpResult};
pub use problem::{
    LinearRow, LpProblem, LpSettings, LpSolution, LpStatus, ObjSense, RowSense, SolveInfo,
    SparseCsr, Variable,
};
pub use simplex::SimplexSolver;

