//! Optimization backend trait and the built-in simplex implementation.
//!
//! The suppression layer talks to linear programs only through
//! [`OptimizationBackend`], so the attacker and master models can be moved
//! to another LP engine without touching the decomposition logic.

use crate::error::{LpError, LpResult};
use crate::problem::{LinearRow, LpProblem, LpSettings, LpSolution, LpStatus, ObjSense, Variable};
use crate::simplex::SimplexSolver;

/// Capability interface for an incremental LP solver.
///
/// A backend owns one mutable linear program. Variables and rows are
/// addressed by the index returned when they were added. Solution queries
/// are only valid after [`Self::optimize`] returned [`LpStatus::Optimal`].
pub trait OptimizationBackend {
    /// Add a bounded variable with objective coefficient `cost`.
    fn add_variable(&mut self, lower: f64, upper: f64, cost: f64) -> LpResult<usize>;

    /// Add a structural constraint row.
    fn add_constraint(&mut self, row: LinearRow) -> LpResult<usize>;

    /// Add a cutting plane. Cuts are ordinary rows that are never removed.
    fn add_cut(&mut self, row: LinearRow) -> LpResult<usize> {
        self.add_constraint(row)
    }

    /// Update the bounds of a variable in place.
    fn set_var_bounds(&mut self, var: usize, lower: f64, upper: f64) -> LpResult<()>;

    /// Update the objective coefficient of a variable.
    fn set_cost(&mut self, var: usize, cost: f64) -> LpResult<()>;

    /// Replace the whole objective: zero every coefficient, then apply `terms`.
    fn set_objective(&mut self, terms: &[(usize, f64)], sense: ObjSense) -> LpResult<()> {
        for j in 0..self.num_vars() {
            self.set_cost(j, 0.0)?;
        }
        for &(j, c) in terms {
            self.set_cost(j, c)?;
        }
        self.set_sense(sense);
        Ok(())
    }

    /// Change the optimization direction.
    fn set_sense(&mut self, sense: ObjSense);

    /// Update the right-hand side of a row.
    fn set_rhs(&mut self, row: usize, rhs: f64) -> LpResult<()>;

    /// Solve the current program.
    fn optimize(&mut self) -> LpResult<LpStatus>;

    /// Forget any kept basis so the next [`Self::optimize`] starts from
    /// scratch. Backends without a kept basis ignore this.
    fn reset_basis(&mut self) {}

    /// Objective value of the last optimal solve.
    fn objective_value(&self) -> LpResult<f64>;

    /// Primal values of the last optimal solve.
    fn primal_values(&self) -> LpResult<&[f64]>;

    /// Row duals of the last optimal solve.
    fn dual_values(&self) -> LpResult<&[f64]>;

    /// Reduced costs of the last optimal solve.
    fn reduced_costs(&self) -> LpResult<&[f64]>;

    /// Number of variables.
    fn num_vars(&self) -> usize;

    /// Number of rows (structural constraints and cuts).
    fn num_constraints(&self) -> usize;
}

/// [`OptimizationBackend`] backed by the in-crate warm-started simplex.
pub struct SimplexBackend {
    solver: SimplexSolver,
    last: Option<LpSolution>,
}

impl SimplexBackend {
    /// Create an empty minimization backend.
    pub fn new(settings: LpSettings) -> LpResult<Self> {
        Self::from_problem(LpProblem::new(), settings)
    }

    /// Create a backend that starts from an existing problem.
    pub fn from_problem(problem: LpProblem, settings: LpSettings) -> LpResult<Self> {
        Ok(Self {
            solver: SimplexSolver::new(problem, settings)?,
            last: None,
        })
    }

    /// The current problem.
    pub fn problem(&self) -> &LpProblem {
        self.solver.problem()
    }

    /// Full result of the last solve, whatever its status.
    pub fn last_solution(&self) -> Option<&LpSolution> {
        self.last.as_ref()
    }

    fn optimal(&self) -> LpResult<&LpSolution> {
        match &self.last {
            Some(sol) if sol.is_optimal() => Ok(sol),
            Some(sol) => Err(LpError::NoSolution(format!(
                "last solve ended with status {}",
                sol.status
            ))),
            None => Err(LpError::NoSolution("optimize has not been called".to_string())),
        }
    }
}

impl OptimizationBackend for SimplexBackend {
    fn add_variable(&mut self, lower: f64, upper: f64, cost: f64) -> LpResult<usize> {
        self.last = None;
        self.solver.add_variable(Variable { lower, upper, cost })
    }

    fn add_constraint(&mut self, row: LinearRow) -> LpResult<usize> {
        self.last = None;
        self.solver.add_row(row)
    }

    fn set_var_bounds(&mut self, var: usize, lower: f64, upper: f64) -> LpResult<()> {
        self.last = None;
        self.solver.set_var_bounds(var, lower, upper)
    }

    fn set_cost(&mut self, var: usize, cost: f64) -> LpResult<()> {
        self.last = None;
        self.solver.set_cost(var, cost)
    }

    fn set_sense(&mut self, sense: ObjSense) {
        self.last = None;
        self.solver.set_sense(sense);
    }

    fn set_rhs(&mut self, row: usize, rhs: f64) -> LpResult<()> {
        self.last = None;
        self.solver.set_rhs(row, rhs)
    }

    fn optimize(&mut self) -> LpResult<LpStatus> {
        let sol = self.solver.solve()?;
        let status = sol.status;
        log::trace!(
            "lp solve: {} ({} + {} pivots, warm={})",
            status,
            sol.info.phase1_iters,
            sol.info.phase2_iters,
            sol.info.warm_started
        );
        self.last = Some(sol);
        Ok(status)
    }

    fn reset_basis(&mut self) {
        self.last = None;
        self.solver.reset_basis();
    }

    fn objective_value(&self) -> LpResult<f64> {
        Ok(self.optimal()?.obj_val)
    }

    fn primal_values(&self) -> LpResult<&[f64]> {
        Ok(&self.optimal()?.x)
    }

    fn dual_values(&self) -> LpResult<&[f64]> {
        Ok(&self.optimal()?.duals)
    }

    fn reduced_costs(&self) -> LpResult<&[f64]> {
        Ok(&self.optimal()?.reduced_costs)
    }

    fn num_vars(&self) -> usize {
        self.solver.problem().num_vars()
    }

    fn num_constraints(&self) -> usize {
        self.solver.problem().num_rows()
    }
}
