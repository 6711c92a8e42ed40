//! Master selector.
//!
//! A 0/1 program with one variable per cell: minimize the weight of the
//! suppressed non-sensitive cells subject to every cut in the pool and the
//! dive row `sum x_j >= min_count`. Sensitive cells are pinned to 1 and
//! structural zeros to 0. It is solved by branch-and-bound over LP
//! relaxations held in one persistent backend; cuts are mirrored from the
//! pool as rows and never removed. Node bound changes keep the basis.
//!
//! In exact mode the same search runs with a [`LazyCutCallback`]: every
//! integral candidate is handed to the callback, and any cuts it returns
//! are added to the pool and to the live relaxation before the node is
//! re-solved.

mod solution;

pub use solution::{IncumbentTracker, MasterSolution, MasterStatus};

use suppress_lp::{LinearRow, LpSettings, LpStatus, ObjSense, OptimizationBackend, SimplexBackend};

use crate::cuts::{CutPool, FeasibilityCut};
use crate::error::{SuppressError, SuppressResult};
use crate::model::{SuppressionPattern, TableModel};
use crate::search::{BoundChange, BranchAndBound, BranchDecision, SearchNode};
use crate::settings::MasterSettings;

/// Separation hook for exact mode.
pub trait LazyCutCallback {
    /// Cuts violated by `pattern`; an empty vector accepts it.
    fn separate(&mut self, pattern: &SuppressionPattern) -> SuppressResult<Vec<FeasibilityCut>>;
}

/// Persistent master problem.
pub struct MasterSelector<B: OptimizationBackend = SimplexBackend> {
    backend: B,
    weights: Vec<f64>,
    /// Bounds implied by cell status.
    base_lb: Vec<f64>,
    base_ub: Vec<f64>,
    /// Root bounds: status plus dive fixings.
    root_lb: Vec<f64>,
    root_ub: Vec<f64>,
    /// Bounds currently set in the backend.
    cur_lb: Vec<f64>,
    cur_ub: Vec<f64>,
    /// Cuts mirrored from the pool, in pool order.
    cuts: Vec<FeasibilityCut>,
    dive_row: usize,
    dive_vars: Vec<usize>,
    min_count: usize,
    settings: MasterSettings,
}

impl MasterSelector<SimplexBackend> {
    /// Build the master problem with the built-in simplex backend.
    pub fn new(model: &TableModel, settings: &MasterSettings, lp: LpSettings) -> SuppressResult<Self> {
        Self::with_backend(model, settings, SimplexBackend::new(lp)?)
    }
}

impl<B: OptimizationBackend> MasterSelector<B> {
    /// Build the master problem on an empty backend.
    pub fn with_backend(model: &TableModel, settings: &MasterSettings, mut backend: B) -> SuppressResult<Self> {
        if backend.num_vars() != 0 || backend.num_constraints() != 0 {
            return Err(SuppressError::InvalidSettings(
                "master backend must start empty".to_string(),
            ));
        }

        let n = model.num_cells();
        let mut weights = Vec::with_capacity(n);
        let mut base_lb = Vec::with_capacity(n);
        let mut base_ub = Vec::with_capacity(n);
        let mut dive_vars = Vec::new();
        for (j, cell) in model.cells().iter().enumerate() {
            let (lb, ub, w) = if cell.is_pinned_zero() {
                (0.0, 0.0, 0.0)
            } else if cell.is_sensitive() {
                (1.0, 1.0, 0.0)
            } else {
                (0.0, 1.0, cell.weight)
            };
            backend.add_variable(lb, ub, w)?;
            if !cell.is_pinned_zero() {
                dive_vars.push(j);
            }
            weights.push(w);
            base_lb.push(lb);
            base_ub.push(ub);
        }
        backend.set_sense(ObjSense::Minimize);

        let dive_row = backend.add_constraint(LinearRow::ge(
            dive_vars.iter().map(|&j| (j, 1.0)).collect(),
            0.0,
        ))?;

        Ok(Self {
            backend,
            weights,
            root_lb: base_lb.clone(),
            root_ub: base_ub.clone(),
            cur_lb: base_lb.clone(),
            cur_ub: base_ub.clone(),
            base_lb,
            base_ub,
            cuts: Vec::new(),
            dive_row,
            dive_vars,
            min_count: 0,
            settings: settings.clone(),
        })
    }

    /// Largest suppression count any selection can reach.
    pub fn max_suppressible(&self) -> usize {
        self.dive_vars.len()
    }

    /// Number of cuts mirrored so far.
    pub fn num_cuts(&self) -> usize {
        self.cuts.len()
    }

    /// Keep every cell suppressed in `pattern` suppressed from now on.
    pub fn fix_suppressed(&mut self, pattern: &SuppressionPattern) {
        for j in pattern.suppressed_cells() {
            if self.base_ub[j] > 0.5 {
                self.root_lb[j] = 1.0;
            }
        }
    }

    /// Drop the dive fixings and the dive minimum.
    pub fn reset_dive(&mut self) -> SuppressResult<()> {
        self.root_lb.copy_from_slice(&self.base_lb);
        self.root_ub.copy_from_slice(&self.base_ub);
        self.set_min_count(0)
    }

    /// Cheapest selection satisfying the pool with at least `min_count`
    /// suppressions (capped at [`Self::max_suppressible`]).
    pub fn solve(&mut self, pool: &CutPool, min_count: usize) -> SuppressResult<MasterSolution> {
        self.sync(pool)?;
        self.set_min_count(min_count)?;
        let time_limit = self.settings.time_limit_ms;
        self.search(None, None, time_limit)
    }

    /// Search with lazy separation of integral candidates.
    ///
    /// `start`, if it satisfies every cut, is the first incumbent. The dive
    /// fixings and minimum are dropped first.
    pub fn solve_exact(
        &mut self,
        pool: &mut CutPool,
        callback: &mut dyn LazyCutCallback,
        start: Option<&SuppressionPattern>,
        time_limit_ms: Option<u64>,
    ) -> SuppressResult<MasterSolution> {
        self.reset_dive()?;
        self.sync(pool)?;
        self.search(Some((pool, callback)), start, time_limit_ms)
    }

    fn set_min_count(&mut self, min_count: usize) -> SuppressResult<()> {
        self.min_count = min_count.min(self.max_suppressible());
        self.backend.set_rhs(self.dive_row, self.min_count as f64)?;
        Ok(())
    }

    /// Mirror pool cuts not yet in the backend.
    fn sync(&mut self, pool: &CutPool) -> SuppressResult<()> {
        for pooled in pool.since(self.cuts.len()) {
            self.backend.add_cut(pooled.cut.to_row())?;
            self.cuts.push(pooled.cut.clone());
        }
        Ok(())
    }

    fn search(
        &mut self,
        mut lazy: Option<(&mut CutPool, &mut dyn LazyCutCallback)>,
        start: Option<&SuppressionPattern>,
        time_limit_ms: Option<u64>,
    ) -> SuppressResult<MasterSolution> {
        let mut tree = BranchAndBound::new(&self.settings, &self.weights, time_limit_ms);
        tree.initialize(f64::NEG_INFINITY);

        if let Some(pattern) = start {
            let x = pattern.to_values();
            if self.is_feasible(&x) {
                tree.update_incumbent(&x, self.cost(&x));
            } else {
                log::warn!("starting pattern violates the master constraints; ignored");
            }
        }

        let status = loop {
            if let Some(status) = tree.check_termination() {
                break status;
            }
            let Some(node) = tree.next_node() else {
                continue;
            };
            tree.node_explored();
            self.process_node(node, &mut tree, &mut lazy)?;
            tree.log_progress();
        };

        let stats = tree.stats();
        log::debug!(
            "master: {} after {} nodes ({} pruned), cost {:.6e}, {} lazy cuts",
            status,
            stats.nodes_explored,
            stats.nodes_pruned,
            stats.incumbent_obj,
            stats.cuts_added
        );

        match status {
            MasterStatus::Infeasible => Err(SuppressError::MasterInfeasible(format!(
                "no selection satisfies the {} cuts with at least {} suppressions",
                self.cuts.len(),
                self.min_count
            ))),
            _ if !tree.incumbent.has_incumbent() => Err(SuppressError::MasterFailure(format!(
                "search stopped at {} without a selection",
                status
            ))),
            _ => Ok(tree.finalize(status)),
        }
    }

    fn process_node(
        &mut self,
        mut node: SearchNode,
        tree: &mut BranchAndBound,
        lazy: &mut Option<(&mut CutPool, &mut dyn LazyCutCallback)>,
    ) -> SuppressResult<()> {
        if tree.can_prune(&node) {
            tree.node_pruned();
            tree.node_discarded(&node);
            return Ok(());
        }
        let (lb, ub) = self.apply_node_bounds(&node)?;

        loop {
            match self.optimize_relaxation()? {
                LpStatus::Optimal => {}
                LpStatus::Infeasible => {
                    tree.node_pruned();
                    tree.node_discarded(&node);
                    return Ok(());
                }
                other => {
                    return Err(SuppressError::MasterFailure(format!(
                        "master relaxation ended with status {}",
                        other
                    )))
                }
            }
            let obj = self.backend.objective_value()?;
            let x = self.backend.primal_values()?.to_vec();

            tree.node_solved(&node, obj);
            node.dual_bound = node.dual_bound.max(obj);
            if tree.can_prune(&node) {
                tree.node_pruned();
                return Ok(());
            }

            let Some(decision) = tree.select_branching(&x, &lb, &ub) else {
                // Integral relaxation
                let xr: Vec<f64> = x.iter().map(|&v| if v > 0.5 { 1.0 } else { 0.0 }).collect();
                let pattern = SuppressionPattern::from_values(&xr);
                match self.separate(lazy, &pattern, tree)? {
                    None => {
                        tree.update_incumbent(&xr, self.cost(&xr));
                    }
                    Some(added) if added > 0 => continue,
                    Some(_) => {
                        // The candidate is still feasible for the relaxation,
                        // so the subtree has to be split rather than dropped.
                        let Some(var) = (0..lb.len()).find(|&j| lb[j] < ub[j]) else {
                            return Err(SuppressError::MasterFailure(format!(
                                "separation rejected the fully fixed candidate at node {} without a new cut",
                                node.id
                            )));
                        };
                        log::debug!(
                            "node {}: rejected candidate produced no new cuts, splitting on cell {}",
                            node.id,
                            var
                        );
                        let (down, up) = tree.branch(&node, Self::split_on(var, &lb, &ub));
                        tree.enqueue(down);
                        tree.enqueue(up);
                    }
                }
                return Ok(());
            };

            if self.settings.rounding_heuristic {
                if let Some(xr) = self.round_up(&x, &ub) {
                    let cost = self.cost(&xr);
                    if cost < tree.incumbent.obj_val - 1e-9 {
                        let pattern = SuppressionPattern::from_values(&xr);
                        match self.separate(lazy, &pattern, tree)? {
                            None => {
                                tree.update_incumbent(&xr, cost);
                                if tree.can_prune(&node) {
                                    tree.node_pruned();
                                    return Ok(());
                                }
                            }
                            Some(added) if added > 0 => continue,
                            Some(_) => {}
                        }
                    }
                }
            }

            let (down, up) = tree.branch(&node, decision);
            tree.enqueue(down);
            tree.enqueue(up);
            return Ok(());
        }
    }

    /// Solve the current relaxation. An unbounded answer is impossible over
    /// 0/1 bounds, so it is taken as numerical trouble and the relaxation is
    /// solved once more from scratch.
    fn optimize_relaxation(&mut self) -> SuppressResult<LpStatus> {
        let status = self.backend.optimize()?;
        if status != LpStatus::Unbounded {
            return Ok(status);
        }
        log::warn!(
            "master relaxation with {} cuts reported unbounded; re-solving from scratch",
            self.cuts.len()
        );
        self.backend.reset_basis();
        Ok(self.backend.optimize()?)
    }

    /// Branch on an integral-valued free variable.
    fn split_on(var: usize, lb: &[f64], ub: &[f64]) -> BranchDecision {
        BranchDecision {
            var,
            value: 0.5,
            down_branch: BoundChange::down_branch(var, lb[var], ub[var], 0.5),
            up_branch: BoundChange::up_branch(var, lb[var], ub[var], 0.5),
            score: 0.0,
        }
    }

    /// Hand a candidate to the lazy callback, if any.
    ///
    /// Returns None when the candidate is accepted, otherwise the number of
    /// new cuts.
    fn separate(
        &mut self,
        lazy: &mut Option<(&mut CutPool, &mut dyn LazyCutCallback)>,
        pattern: &SuppressionPattern,
        tree: &mut BranchAndBound,
    ) -> SuppressResult<Option<usize>> {
        let Some((pool, callback)) = lazy.as_mut() else {
            return Ok(None);
        };
        let cuts = callback.separate(pattern)?;
        if cuts.is_empty() {
            return Ok(None);
        }
        let added = pool.extend(cuts);
        self.sync(pool)?;
        tree.cuts_added(added);
        Ok(Some(added))
    }

    /// Set the backend bounds to the root bounds plus the node's branches.
    fn apply_node_bounds(&mut self, node: &SearchNode) -> SuppressResult<(Vec<f64>, Vec<f64>)> {
        let mut lb = self.root_lb.clone();
        let mut ub = self.root_ub.clone();
        for change in &node.bound_changes {
            lb[change.var] = lb[change.var].max(change.new_lb);
            ub[change.var] = ub[change.var].min(change.new_ub);
        }

        for j in 0..lb.len() {
            if lb[j] != self.cur_lb[j] || ub[j] != self.cur_ub[j] {
                // Branches never cross the root bounds, so lb <= ub here
                self.backend.set_var_bounds(j, lb[j], ub[j].max(lb[j]))?;
                self.cur_lb[j] = lb[j];
                self.cur_ub[j] = ub[j].max(lb[j]);
            }
        }
        Ok((lb, ub))
    }

    /// Round every positive fractional value up; Some if the result
    /// satisfies all constraints.
    fn round_up(&self, x: &[f64], ub: &[f64]) -> Option<Vec<f64>> {
        let xr: Vec<f64> = x
            .iter()
            .zip(ub)
            .map(|(&v, &u)| {
                if v > self.settings.int_feas_tol && u > 0.5 {
                    1.0
                } else {
                    0.0
                }
            })
            .collect();
        self.is_feasible(&xr).then_some(xr)
    }

    /// Whether a 0/1 vector meets the status bounds, the dive rows and all
    /// mirrored cuts.
    fn is_feasible(&self, x: &[f64]) -> bool {
        let in_bounds = x
            .iter()
            .enumerate()
            .all(|(j, &v)| v >= self.root_lb[j] - 1e-9 && v <= self.root_ub[j] + 1e-9);
        let count = self.dive_vars.iter().filter(|&&j| x[j] > 0.5).count();
        in_bounds
            && count >= self.min_count
            && self.cuts.iter().all(|c| !c.is_violated(x, 1e-9))
    }

    fn cost(&self, x: &[f64]) -> f64 {
        self.weights.iter().zip(x).map(|(w, v)| w * v).sum()
    }
}
