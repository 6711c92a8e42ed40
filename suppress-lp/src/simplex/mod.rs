//! Bounded-variable primal simplex.
//!
//! A cold start lays columns out as `[structural | slacks | artificials]`.
//! Each inequality row gets one slack in `[0, inf)`; every row gets one
//! artificial whose sign is chosen so the artificial basis is primal
//! feasible. Phase 1 minimizes the artificial sum, after which the
//! artificials are fixed to zero and never re-enter.
//!
//! The tableau survives between solves. Bound, cost and right-hand-side
//! updates keep the basis; if it is still primal feasible the next solve
//! goes straight to phase 2. Rows added after a solve are appended to the
//! tableau with their own slack and a basic artificial on the right, and a
//! short phase 1 from the kept basis drives the new artificials out.
//! Adding variables forces a cold start.
//!
//! The tableau is refactored from the problem data for the current basis
//! after many pivots and before an unbounded ray is trusted.

mod tableau;

use tableau::Tableau;

use crate::error::{LpError, LpResult};
use crate::problem::{LinearRow, LpProblem, LpSettings, LpSolution, LpStatus, RowSense, SolveInfo, Variable};

/// Position of a column relative to the current basis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VarState {
    Basic,
    AtLower,
    AtUpper,
}

/// Column chosen by the ratio test to leave the basis.
#[derive(Debug, Clone, Copy)]
struct Leaving {
    row: usize,
    step: f64,
    to_lower: bool,
}

/// Persistent simplex solver with warm-start support.
pub struct SimplexSolver {
    problem: LpProblem,
    settings: LpSettings,

    /// Slack column of each row (None for equalities).
    slack_col: Vec<Option<usize>>,
    /// Artificial column of each row.
    art_col: Vec<usize>,
    /// Sign applied to each row so its artificial starts nonnegative.
    art_sign: Vec<f64>,

    lower: Vec<f64>,
    upper: Vec<f64>,
    value: Vec<f64>,
    state: Vec<VarState>,

    tableau: Option<Tableau>,
    rhs_dirty: bool,
    pivots_since_rebuild: usize,
    phase1_scale: f64,
}

impl SimplexSolver {
    /// Create a solver for `problem`. No work is done until [`Self::solve`].
    pub fn new(problem: LpProblem, settings: LpSettings) -> LpResult<Self> {
        problem.validate()?;
        Ok(Self {
            problem,
            settings,
            slack_col: Vec::new(),
            art_col: Vec::new(),
            art_sign: Vec::new(),
            lower: Vec::new(),
            upper: Vec::new(),
            value: Vec::new(),
            state: Vec::new(),
            tableau: None,
            rhs_dirty: false,
            pivots_since_rebuild: 0,
            phase1_scale: 1.0,
        })
    }

    /// The problem as currently modified.
    pub fn problem(&self) -> &LpProblem {
        &self.problem
    }

    /// Solver settings.
    pub fn settings(&self) -> &LpSettings {
        &self.settings
    }

    /// Append a variable. Invalidates the basis.
    pub fn add_variable(&mut self, var: Variable) -> LpResult<usize> {
        let idx = self.problem.vars.len();
        LpProblem::validate_variable(idx, &var)?;
        self.problem.vars.push(var);
        self.tableau = None;
        Ok(idx)
    }

    /// Append a constraint row. The basis is kept; the row joins the
    /// tableau at the next solve.
    pub fn add_row(&mut self, row: LinearRow) -> LpResult<usize> {
        let idx = self.problem.rows.len();
        self.problem.validate_row(idx, &row)?;
        self.problem.rows.push(row);
        Ok(idx)
    }

    /// Drop the basis so the next solve starts cold.
    pub fn reset_basis(&mut self) {
        self.tableau = None;
    }

    /// Change the bounds of a structural variable, keeping the basis.
    pub fn set_var_bounds(&mut self, var: usize, lower: f64, upper: f64) -> LpResult<()> {
        let n = self.problem.num_vars();
        if var >= n {
            return Err(LpError::UnknownVariable { var, num_vars: n });
        }
        if lower.is_nan() || upper.is_nan() || lower > upper {
            return Err(LpError::InvalidProblem(format!(
                "invalid bounds [{}, {}] for variable {}",
                lower, upper, var
            )));
        }
        if !lower.is_finite() && !upper.is_finite() {
            return Err(LpError::InvalidProblem(format!(
                "variable {} would become free",
                var
            )));
        }

        self.problem.vars[var].lower = lower;
        self.problem.vars[var].upper = upper;

        if self.tableau.is_some() {
            self.lower[var] = lower;
            self.upper[var] = upper;
            match self.state[var] {
                VarState::Basic => {}
                VarState::AtLower if lower.is_finite() => self.value[var] = lower,
                VarState::AtUpper if upper.is_finite() => self.value[var] = upper,
                VarState::AtLower => {
                    self.state[var] = VarState::AtUpper;
                    self.value[var] = upper;
                }
                VarState::AtUpper => {
                    self.state[var] = VarState::AtLower;
                    self.value[var] = lower;
                }
            }
        }
        Ok(())
    }

    /// Replace the objective coefficient of a variable.
    pub fn set_cost(&mut self, var: usize, cost: f64) -> LpResult<()> {
        let n = self.problem.num_vars();
        if var >= n {
            return Err(LpError::UnknownVariable { var, num_vars: n });
        }
        if !cost.is_finite() {
            return Err(LpError::InvalidProblem(format!(
                "non-finite cost for variable {}",
                var
            )));
        }
        self.problem.vars[var].cost = cost;
        Ok(())
    }

    /// Change the optimization direction.
    pub fn set_sense(&mut self, sense: crate::ObjSense) {
        self.problem.sense = sense;
    }

    /// Change the right-hand side of a row, keeping the basis.
    pub fn set_rhs(&mut self, row: usize, rhs: f64) -> LpResult<()> {
        let m = self.problem.num_rows();
        if row >= m {
            return Err(LpError::UnknownConstraint { row, num_rows: m });
        }
        if !rhs.is_finite() {
            return Err(LpError::InvalidProblem(format!(
                "non-finite right-hand side for row {}",
                row
            )));
        }
        self.problem.rows[row].rhs = rhs;
        self.rhs_dirty = true;
        Ok(())
    }

    /// Solve the current problem.
    pub fn solve(&mut self) -> LpResult<LpSolution> {
        let mut info = SolveInfo::default();
        let budget = self.settings.max_iter;

        if self.tableau.is_some()
            && self.pivots_since_rebuild >= self.rebuild_threshold()
            && !self.refactor()
        {
            self.tableau = None;
        }
        let warm = self.settings.warm_start && self.tableau.is_some() && self.prepare_warm_start();

        if warm {
            info.warm_started = true;
        } else {
            self.cold_start();
        }

        if self.has_open_artificials() {
            let costs = self.phase1_costs();
            let status = self.iterate_with_refactor(&costs, &mut info.phase1_iters, budget)?;
            if status == LpStatus::MaxIters {
                self.tableau = None;
                return Ok(LpSolution::with_status(LpStatus::MaxIters, info));
            }
            let infeasibility: f64 = self.art_col.iter().map(|&c| self.value[c].max(0.0)).sum();
            if status != LpStatus::Optimal
                || infeasibility > self.settings.tol_feas * self.phase1_scale * 10.0
            {
                self.tableau = None;
                if warm {
                    log::debug!(
                        "phase 1 from kept basis ended {} ({:.3e}), re-solving from scratch",
                        status,
                        infeasibility
                    );
                    return self.solve();
                }
                log::debug!("phase 1 ended with infeasibility {:.3e}", infeasibility);
                let status = if status == LpStatus::Optimal { LpStatus::Infeasible } else { status };
                return Ok(LpSolution::with_status(status, info));
            }
            for i in 0..self.art_col.len() {
                let c = self.art_col[i];
                self.upper[c] = 0.0;
                if self.state[c] != VarState::Basic {
                    self.state[c] = VarState::AtLower;
                    self.value[c] = 0.0;
                }
            }
        }

        let costs = self.phase2_costs();
        let remaining = budget.saturating_sub(info.phase1_iters);
        let status = self.iterate_with_refactor(&costs, &mut info.phase2_iters, remaining)?;

        match status {
            LpStatus::Optimal => {
                let solution = self.extract_solution(&costs, info);
                if info.warm_started && self.max_row_residual(&solution.x) > self.residual_tol() {
                    // Accumulated drift in the reused tableau; rebuild once.
                    log::debug!("warm-started solution drifted, re-solving from scratch");
                    self.tableau = None;
                    return self.solve();
                }
                Ok(solution)
            }
            LpStatus::Unbounded if info.warm_started => {
                log::debug!("unbounded ray from kept basis, re-solving from scratch");
                self.tableau = None;
                self.solve()
            }
            other => Ok(LpSolution::with_status(other, info)),
        }
    }

    /// Run [`Self::iterate`]; an unbounded ray found on a tableau that has
    /// been pivoted since it was built is checked again on a refactored one.
    fn iterate_with_refactor(&mut self, costs: &[f64], iters: &mut usize, budget: usize) -> LpResult<LpStatus> {
        let status = self.iterate(costs, iters, budget)?;
        if status == LpStatus::Unbounded && self.pivots_since_rebuild > 0 {
            log::debug!(
                "unbounded ray after {} pivots, refactoring the basis",
                self.pivots_since_rebuild
            );
            if self.refactor() {
                return self.iterate(costs, iters, budget);
            }
        }
        Ok(status)
    }

    fn has_open_artificials(&self) -> bool {
        self.art_col.iter().any(|&c| self.upper[c] > 0.0)
    }

    fn rebuild_threshold(&self) -> usize {
        10 * (self.problem.num_rows() + self.problem.num_vars()) + 1000
    }

    fn residual_tol(&self) -> f64 {
        1e-6 * self.phase1_scale.max(1.0)
    }

    fn max_row_residual(&self, x: &[f64]) -> f64 {
        self.problem
            .rows
            .iter()
            .map(|row| row.violation(x))
            .fold(0.0, f64::max)
    }

    /// Build the artificial starting basis.
    fn cold_start(&mut self) {
        let n = self.problem.num_vars();
        let m = self.problem.num_rows();
        let k = self.problem.num_inequalities();
        let cols = n + k + m;

        self.lower = vec![0.0; cols];
        self.upper = vec![f64::INFINITY; cols];
        self.value = vec![0.0; cols];
        self.state = vec![VarState::AtLower; cols];
        self.slack_col = vec![None; m];
        self.art_col = (n + k..n + k + m).collect();
        self.art_sign = vec![1.0; m];

        for (j, v) in self.problem.vars.iter().enumerate() {
            self.lower[j] = v.lower;
            self.upper[j] = v.upper;
            if v.lower.is_finite() {
                self.value[j] = v.lower;
                self.state[j] = VarState::AtLower;
            } else {
                self.value[j] = v.upper;
                self.state[j] = VarState::AtUpper;
            }
        }

        let matrix = self.problem.constraint_matrix();
        let mut tableau = Tableau::zeros(m, cols);
        let mut next_slack = n;
        let mut scale: f64 = 1.0;

        for (i, row_vec) in matrix.outer_iterator().enumerate() {
            let row = &self.problem.rows[i];
            let mut residual = row.rhs;
            for (j, &a) in row_vec.iter() {
                tableau.add(i, j, a);
                residual -= a * self.value[j];
            }
            match row.sense {
                RowSense::Le => {
                    tableau.add(i, next_slack, 1.0);
                    self.slack_col[i] = Some(next_slack);
                    next_slack += 1;
                }
                RowSense::Ge => {
                    tableau.add(i, next_slack, -1.0);
                    self.slack_col[i] = Some(next_slack);
                    next_slack += 1;
                }
                RowSense::Eq => {}
            }

            let sign = if residual >= 0.0 { 1.0 } else { -1.0 };
            let art = self.art_col[i];
            tableau.add(i, art, sign);
            tableau.rhs_mut()[i] = row.rhs;
            tableau.scale_row(i, sign);
            tableau.set_basic(i, art);

            self.art_sign[i] = sign;
            self.state[art] = VarState::Basic;
            self.value[art] = residual.abs();
            scale = scale.max(residual.abs()).max(row.rhs.abs());
        }

        self.phase1_scale = scale;
        self.tableau = Some(tableau);
        self.rhs_dirty = false;
        self.pivots_since_rebuild = 0;
    }

    /// Recompute `B^-1 b` if needed and check that the kept basis is primal
    /// feasible for the updated bounds.
    fn prepare_warm_start(&mut self) -> bool {
        if self.rhs_dirty {
            self.recompute_rhs();
        }
        self.refresh_basic_values();

        let tol = self.settings.tol_feas;
        let Some(tableau) = self.tableau.as_ref() else {
            return false;
        };
        let feasible = tableau.basis().iter().all(|&c| {
            let v = self.value[c];
            v >= self.lower[c] - tol * (1.0 + self.lower[c].abs())
                && v <= self.upper[c] + tol * (1.0 + self.upper[c].abs())
        });
        if feasible {
            self.append_pending_rows();
        }
        feasible
    }

    /// Bring rows added since the last solve into the tableau. Each gets a
    /// slack at zero and an artificial basic at the row's current residual.
    fn append_pending_rows(&mut self) {
        let Some(mut tableau) = self.tableau.take() else {
            return;
        };
        let first = tableau.num_rows();
        let m = self.problem.num_rows();
        if first == m {
            self.tableau = Some(tableau);
            return;
        }

        let mut cols = tableau.num_cols();
        let old_cols = cols;
        for i in first..m {
            if self.problem.rows[i].sense != RowSense::Eq {
                self.slack_col.push(Some(cols));
                cols += 1;
            } else {
                self.slack_col.push(None);
            }
            self.art_col.push(cols);
            cols += 1;
        }
        tableau.add_columns(cols - old_cols);
        self.lower.resize(cols, 0.0);
        self.upper.resize(cols, f64::INFINITY);
        self.value.resize(cols, 0.0);
        self.state.resize(cols, VarState::AtLower);

        let mut basic_row = vec![None; cols];
        for (r, &b) in tableau.basis().iter().enumerate() {
            basic_row[b] = Some(r);
        }

        let mut scale = self.phase1_scale;
        for i in first..m {
            let row = &self.problem.rows[i];
            let residual = row.rhs - row.activity(&self.value);
            let sign = if residual >= 0.0 { 1.0 } else { -1.0 };

            let mut coefs = vec![0.0; cols];
            let mut rhs = sign * row.rhs;
            for &(j, a) in &row.coefs {
                coefs[j] += sign * a;
            }
            for &(j, a) in &row.coefs {
                if let Some(r) = basic_row[j] {
                    let f = sign * a;
                    for (c, &t) in coefs.iter_mut().zip(tableau.row(r)) {
                        *c -= f * t;
                    }
                    rhs -= f * tableau.rhs()[r];
                }
            }
            if let Some(slack) = self.slack_col[i] {
                coefs[slack] = match row.sense {
                    RowSense::Le => sign,
                    _ => -sign,
                };
            }
            let art = self.art_col[i];
            coefs[art] = 1.0;
            tableau.push_row(&coefs, rhs, art);

            self.art_sign.push(sign);
            self.state[art] = VarState::Basic;
            self.value[art] = residual.abs();
            scale = scale.max(residual.abs()).max(row.rhs.abs());
        }

        log::trace!("appended {} rows to the kept basis", m - first);
        self.phase1_scale = scale;
        self.tableau = Some(tableau);
    }

    /// Rebuild `B^-1 [A | slacks | artificials]` from the problem data for
    /// the current basis. Returns false if the basis is numerically singular.
    fn refactor(&mut self) -> bool {
        let Some(old) = self.tableau.as_ref() else {
            return false;
        };
        let rows = old.num_rows();
        let basis = old.basis().to_vec();
        let mut tableau = Tableau::zeros(rows, old.num_cols());

        for i in 0..rows {
            let row = &self.problem.rows[i];
            let sign = self.art_sign[i];
            for &(j, a) in &row.coefs {
                tableau.add(i, j, sign * a);
            }
            if let Some(slack) = self.slack_col[i] {
                let coef = if row.sense == RowSense::Le { 1.0 } else { -1.0 };
                tableau.add(i, slack, sign * coef);
            }
            tableau.add(i, self.art_col[i], 1.0);
            tableau.rhs_mut()[i] = sign * row.rhs;
        }

        let mut assigned = vec![false; rows];
        for &c in &basis {
            let mut best: Option<(usize, f64)> = None;
            for (r, done) in assigned.iter().enumerate() {
                let v = tableau.get(r, c).abs();
                if !done && best.map_or(true, |(_, bv)| v > bv) {
                    best = Some((r, v));
                }
            }
            match best {
                Some((r, v)) if v > 1e-9 => {
                    tableau.pivot(r, c);
                    assigned[r] = true;
                }
                _ => {
                    log::debug!("basis is singular at column {}, refactor abandoned", c);
                    return false;
                }
            }
        }

        self.tableau = Some(tableau);
        self.pivots_since_rebuild = 0;
        self.rhs_dirty = false;
        self.refresh_basic_values();
        true
    }

    /// `rhs = B^-1 b`, reading `B^-1` off the artificial block.
    fn recompute_rhs(&mut self) {
        let signed_b: Vec<(usize, f64)> = self
            .art_col
            .iter()
            .zip(&self.art_sign)
            .zip(&self.problem.rows)
            .map(|((&c, &si), row)| (c, si * row.rhs))
            .collect();
        if let Some(tableau) = self.tableau.as_mut() {
            let mut new_rhs = vec![0.0; tableau.num_rows()];
            for (r, out) in new_rhs.iter_mut().enumerate() {
                let row = tableau.row(r);
                *out = signed_b.iter().map(|&(c, b)| row[c] * b).sum();
            }
            tableau.rhs_mut().copy_from_slice(&new_rhs);
        }
        self.rhs_dirty = false;
    }

    /// `x_B = B^-1 b - B^-1 N x_N`
    fn refresh_basic_values(&mut self) {
        let Some(tableau) = self.tableau.as_ref() else {
            return;
        };
        let nonbasic: Vec<(usize, f64)> = (0..tableau.num_cols())
            .filter(|&c| self.state[c] != VarState::Basic && self.value[c] != 0.0)
            .map(|c| (c, self.value[c]))
            .collect();

        for r in 0..tableau.num_rows() {
            let row = tableau.row(r);
            let mut v = tableau.rhs()[r];
            for &(c, x) in &nonbasic {
                v -= row[c] * x;
            }
            self.value[tableau.basis()[r]] = v;
        }
    }

    fn phase1_costs(&self) -> Vec<f64> {
        let cols = self.lower.len();
        let mut costs = vec![0.0; cols];
        for &c in &self.art_col {
            costs[c] = 1.0;
        }
        costs
    }

    /// Structural costs turned into a minimization.
    fn phase2_costs(&self) -> Vec<f64> {
        let sign = self.problem.sense.sign();
        let mut costs = vec![0.0; self.lower.len()];
        for (c, v) in costs.iter_mut().zip(&self.problem.vars) {
            *c = sign * v.cost;
        }
        costs
    }

    fn reduced_costs(&self, tableau: &Tableau, costs: &[f64]) -> Vec<f64> {
        let mut d = costs.to_vec();
        for (r, &b) in tableau.basis().iter().enumerate() {
            let cb = costs[b];
            if cb == 0.0 {
                continue;
            }
            for (dj, &t) in d.iter_mut().zip(tableau.row(r)) {
                *dj -= cb * t;
            }
        }
        d
    }

    /// Primal simplex iterations minimizing `costs` from the current basis.
    fn iterate(&mut self, costs: &[f64], iters: &mut usize, budget: usize) -> LpResult<LpStatus> {
        let mut degenerate_streak = 0usize;
        let mut bland = false;

        loop {
            let tableau = self
                .tableau
                .as_ref()
                .ok_or_else(|| LpError::NoSolution("simplex basis not initialized".to_string()))?;
            let d = self.reduced_costs(tableau, costs);

            let Some(entering) = self.select_entering(&d, bland) else {
                return Ok(LpStatus::Optimal);
            };
            if *iters >= budget {
                return Ok(LpStatus::MaxIters);
            }
            *iters += 1;

            let dir = if self.state[entering] == VarState::AtLower { 1.0 } else { -1.0 };
            let own_range = self.upper[entering] - self.lower[entering];
            let leaving = self.ratio_test(tableau, entering, dir, bland);

            let step = match leaving {
                Some(l) if !own_range.is_finite() || l.step < own_range => l.step,
                _ if own_range.is_finite() => own_range,
                _ => return Ok(LpStatus::Unbounded),
            };

            if step <= self.settings.tol_feas {
                degenerate_streak += 1;
                if degenerate_streak >= self.settings.bland_after_degenerate {
                    bland = true;
                }
            } else {
                degenerate_streak = 0;
            }

            match leaving {
                Some(l) if !own_range.is_finite() || l.step < own_range => {
                    let row = l.row;
                    let leaving_col = tableau.basis()[row];
                    if l.to_lower {
                        self.state[leaving_col] = VarState::AtLower;
                        self.value[leaving_col] = self.lower[leaving_col];
                    } else {
                        self.state[leaving_col] = VarState::AtUpper;
                        self.value[leaving_col] = self.upper[leaving_col];
                    }
                    self.state[entering] = VarState::Basic;
                    if let Some(t) = self.tableau.as_mut() {
                        t.pivot(row, entering);
                    }
                    self.pivots_since_rebuild += 1;
                }
                _ => {
                    // Bound flip: entering variable crosses its whole range.
                    if dir > 0.0 {
                        self.state[entering] = VarState::AtUpper;
                        self.value[entering] = self.upper[entering];
                    } else {
                        self.state[entering] = VarState::AtLower;
                        self.value[entering] = self.lower[entering];
                    }
                }
            }
            self.refresh_basic_values();
        }
    }

    /// Dantzig pricing, or lowest-index (Bland) pricing once degenerate.
    fn select_entering(&self, d: &[f64], bland: bool) -> Option<usize> {
        let tol = self.settings.tol_opt;
        let mut best: Option<(usize, f64)> = None;

        for (c, &dc) in d.iter().enumerate() {
            let improving = match self.state[c] {
                VarState::Basic => false,
                VarState::AtLower => dc < -tol && self.upper[c] > self.lower[c],
                VarState::AtUpper => dc > tol && self.upper[c] > self.lower[c],
            };
            if !improving {
                continue;
            }
            if bland {
                return Some(c);
            }
            if best.map_or(true, |(_, score)| dc.abs() > score) {
                best = Some((c, dc.abs()));
            }
        }

        best.map(|(c, _)| c)
    }

    /// Bounded ratio test. Basic variable in row r moves by `-T[r][e] * dir * t`.
    fn ratio_test(&self, tableau: &Tableau, entering: usize, dir: f64, bland: bool) -> Option<Leaving> {
        let tol = self.settings.tol_feas;
        let mut best: Option<(Leaving, f64)> = None;

        for r in 0..tableau.num_rows() {
            let alpha = tableau.get(r, entering) * dir;
            if alpha.abs() <= self.settings.tol_pivot {
                continue;
            }
            let b = tableau.basis()[r];
            let (limit, to_lower) = if alpha > 0.0 {
                if !self.lower[b].is_finite() {
                    continue;
                }
                ((self.value[b] - self.lower[b]) / alpha, true)
            } else {
                if !self.upper[b].is_finite() {
                    continue;
                }
                ((self.upper[b] - self.value[b]) / -alpha, false)
            };
            let limit = limit.max(0.0);

            let better = match best {
                None => true,
                Some((current, current_alpha)) => {
                    if limit < current.step - tol {
                        true
                    } else if limit <= current.step + tol {
                        if bland {
                            b < tableau.basis()[current.row]
                        } else {
                            alpha.abs() > current_alpha
                        }
                    } else {
                        false
                    }
                }
            };

            if better {
                best = Some((
                    Leaving {
                        row: r,
                        step: limit,
                        to_lower,
                    },
                    alpha.abs(),
                ));
            }
        }

        best.map(|(l, _)| l)
    }

    fn extract_solution(&self, costs: &[f64], info: SolveInfo) -> LpSolution {
        let n = self.problem.num_vars();
        let m = self.problem.num_rows();
        let sign = self.problem.sense.sign();

        let (duals, reduced_costs) = match self.tableau.as_ref() {
            Some(tableau) => {
                let mut y = vec![0.0; m];
                for (r, &b) in tableau.basis().iter().enumerate() {
                    let cb = costs[b];
                    if cb == 0.0 {
                        continue;
                    }
                    let row = tableau.row(r);
                    for ((yi, &c), &si) in y.iter_mut().zip(&self.art_col).zip(&self.art_sign) {
                        *yi += cb * row[c] * si;
                    }
                }
                let d = self.reduced_costs(tableau, costs);
                (
                    y.iter().map(|v| sign * v).collect(),
                    d[..n].iter().map(|v| sign * v).collect(),
                )
            }
            None => (vec![0.0; m], vec![0.0; n]),
        };

        let x: Vec<f64> = self.value[..n].to_vec();
        let obj_val = self
            .problem
            .vars
            .iter()
            .zip(&x)
            .map(|(v, xi)| v.cost * xi)
            .sum();

        LpSolution {
            status: LpStatus::Optimal,
            x,
            obj_val,
            duals,
            reduced_costs,
            info,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ObjSense;

    fn var(lower: f64, upper: f64, cost: f64) -> Variable {
        Variable { lower, upper, cost }
    }

    #[test]
    fn test_bound_flip_only() {
        // max x0 + x1, 0 <= x <= 1, no rows
        let prob = LpProblem {
            vars: vec![var(0.0, 1.0, 1.0), var(0.0, 1.0, 1.0)],
            rows: Vec::new(),
            sense: ObjSense::Maximize,
        };
        let mut s = SimplexSolver::new(prob, LpSettings::default()).unwrap();
        let sol = s.solve().unwrap();
        assert_eq!(sol.status, LpStatus::Optimal);
        assert!((sol.obj_val - 2.0).abs() < 1e-9);
        // Max problem: variables at upper bound have nonnegative reduced cost
        assert!(sol.reduced_costs.iter().all(|&d| d > 0.0));
    }

    #[test]
    fn test_warm_start_after_objective_change() {
        // x0 - x1 = 0, x0 in [0, 5], x1 in [1, 3]
        let prob = LpProblem {
            vars: vec![var(0.0, 5.0, 1.0), var(1.0, 3.0, 0.0)],
            rows: vec![LinearRow::eq(vec![(0, 1.0), (1, -1.0)], 0.0)],
            sense: ObjSense::Minimize,
        };
        let mut s = SimplexSolver::new(prob, LpSettings::default()).unwrap();

        let min = s.solve().unwrap();
        assert!((min.obj_val - 1.0).abs() < 1e-9);
        assert!(!min.info.warm_started);

        s.set_sense(ObjSense::Maximize);
        let max = s.solve().unwrap();
        assert!((max.obj_val - 3.0).abs() < 1e-9);
        assert!(max.info.warm_started);
    }

    #[test]
    fn test_infeasible_detected() {
        // x0 + x1 = 5 with x in [0, 2]
        let prob = LpProblem {
            vars: vec![var(0.0, 2.0, 0.0), var(0.0, 2.0, 0.0)],
            rows: vec![LinearRow::eq(vec![(0, 1.0), (1, 1.0)], 5.0)],
            sense: ObjSense::Minimize,
        };
        let mut s = SimplexSolver::new(prob, LpSettings::default()).unwrap();
        assert_eq!(s.solve().unwrap().status, LpStatus::Infeasible);
    }

    #[test]
    fn test_unbounded_detected() {
        // max x0 with x0 >= 0 and x0 - x1 <= 1, x1 >= 0
        let prob = LpProblem {
            vars: vec![var(0.0, f64::INFINITY, 1.0), var(0.0, f64::INFINITY, 0.0)],
            rows: vec![LinearRow::le(vec![(0, 1.0), (1, -1.0)], 1.0)],
            sense: ObjSense::Maximize,
        };
        let mut s = SimplexSolver::new(prob, LpSettings::default()).unwrap();
        assert_eq!(s.solve().unwrap().status, LpStatus::Unbounded);
    }

    #[test]
    fn test_set_rhs_keeps_basis() {
        // min x0 + x1 s.t. x0 + x1 >= 1, x in [0, 4]
        let prob = LpProblem {
            vars: vec![var(0.0, 4.0, 1.0), var(0.0, 4.0, 1.0)],
            rows: vec![LinearRow::ge(vec![(0, 1.0), (1, 1.0)], 1.0)],
            sense: ObjSense::Minimize,
        };
        let mut s = SimplexSolver::new(prob, LpSettings::default()).unwrap();
        assert!((s.solve().unwrap().obj_val - 1.0).abs() < 1e-9);

        s.set_rhs(0, 3.0).unwrap();
        let sol = s.solve().unwrap();
        assert_eq!(sol.status, LpStatus::Optimal);
        assert!((sol.obj_val - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_added_row_keeps_basis() {
        // min x0 + 2 x1 s.t. x0 + x1 >= 1, x in [0, 1]
        let prob = LpProblem {
            vars: vec![var(0.0, 1.0, 1.0), var(0.0, 1.0, 2.0)],
            rows: vec![LinearRow::ge(vec![(0, 1.0), (1, 1.0)], 1.0)],
            sense: ObjSense::Minimize,
        };
        let mut s = SimplexSolver::new(prob, LpSettings::default()).unwrap();
        let first = s.solve().unwrap();
        assert!((first.obj_val - 1.0).abs() < 1e-9);

        // Cut off x = (1, 0): x1 >= 0.5
        s.add_row(LinearRow::ge(vec![(1, 1.0)], 0.5)).unwrap();
        let sol = s.solve().unwrap();
        assert_eq!(sol.status, LpStatus::Optimal);
        assert!(sol.info.warm_started);
        assert!((sol.obj_val - 1.5).abs() < 1e-9);
        assert!((sol.x[0] - 0.5).abs() < 1e-9);
        assert!((sol.x[1] - 0.5).abs() < 1e-9);
        assert!(sol.duals[1] > 0.0);

        // An appended row that no point satisfies
        s.add_row(LinearRow::ge(vec![(0, 1.0), (1, 1.0)], 3.0)).unwrap();
        assert_eq!(s.solve().unwrap().status, LpStatus::Infeasible);
    }

    #[test]
    fn test_add_row_rejects_bad_row_without_side_effects() {
        let prob = LpProblem {
            vars: vec![var(0.0, 1.0, 1.0)],
            rows: Vec::new(),
            sense: ObjSense::Minimize,
        };
        let mut s = SimplexSolver::new(prob, LpSettings::default()).unwrap();
        assert_eq!(
            s.add_row(LinearRow::ge(vec![(4, 1.0)], 1.0)),
            Err(LpError::UnknownVariable { var: 4, num_vars: 1 })
        );
        assert!(s.add_variable(var(2.0, 1.0, 0.0)).is_err());
        assert_eq!(s.problem().num_rows(), 0);
        assert_eq!(s.problem().num_vars(), 1);
    }

    #[test]
    fn test_refactor_reproduces_basis() {
        // min -x0 - x1 s.t. x0 + 2 x1 <= 4, 3 x0 + x1 <= 6, x in [0, 10]
        let prob = LpProblem {
            vars: vec![var(0.0, 10.0, -1.0), var(0.0, 10.0, -1.0)],
            rows: vec![
                LinearRow::le(vec![(0, 1.0), (1, 2.0)], 4.0),
                LinearRow::le(vec![(0, 3.0), (1, 1.0)], 6.0),
            ],
            sense: ObjSense::Minimize,
        };
        let mut s = SimplexSolver::new(prob, LpSettings::default()).unwrap();
        let before = s.solve().unwrap();
        assert!((before.obj_val + 2.8).abs() < 1e-9);

        assert!(s.refactor());
        assert_eq!(s.pivots_since_rebuild, 0);
        assert!((s.value[0] - 1.6).abs() < 1e-9);
        assert!((s.value[1] - 1.2).abs() < 1e-9);

        let after = s.solve().unwrap();
        assert!(after.info.warm_started);
        assert_eq!(after.info.phase2_iters, 0);
        assert!((after.obj_val - before.obj_val).abs() < 1e-9);
        for (a, b) in after.duals.iter().zip(&before.duals) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    /// Covering LP over [0, 1] variables grown one batch of cuts at a time,
    /// the shape of a master relaxation after many rejected patterns.
    #[test]
    fn test_cut_heavy_covering_lp_stays_bounded() {
        let n = 120;
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = move || {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            seed
        };

        let vars = (0..n)
            .map(|j| var(0.0, 1.0, 1.0 + (j % 7) as f64))
            .collect();
        let prob = LpProblem {
            vars,
            rows: vec![LinearRow::ge((0..n).map(|j| (j, 1.0)).collect(), 3.0)],
            sense: ObjSense::Minimize,
        };
        let mut s = SimplexSolver::new(prob, LpSettings::default()).unwrap();
        assert_eq!(s.solve().unwrap().status, LpStatus::Optimal);

        let mut last_obj = 0.0;
        for round in 0..15 {
            for _ in 0..12 {
                let support = 5 + (next() % 20) as usize;
                let protection = 1.0 + (next() % 40) as f64;
                let mut coefs = Vec::with_capacity(support);
                for _ in 0..support {
                    let j = (next() % n as u64) as usize;
                    let width = (next() % 60) as f64 / 7.0 + 0.01;
                    coefs.push((j, width.min(protection)));
                }
                let total: f64 = coefs.iter().map(|&(_, a)| a).sum();
                s.add_row(LinearRow::ge(coefs, protection.min(total))).unwrap();
            }

            let sol = s.solve().unwrap();
            assert_eq!(sol.status, LpStatus::Optimal, "round {}", round);
            assert!(sol.obj_val >= last_obj - 1e-6, "round {}", round);
            for row in &s.problem().rows {
                assert!(row.violation(&sol.x) < 1e-6, "round {}", round);
            }
            assert!(sol.x.iter().all(|&v| (-1e-9..=1.0 + 1e-9).contains(&v)));
            last_obj = sol.obj_val;
        }
    }
}
