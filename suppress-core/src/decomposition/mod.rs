//! Decomposition loop.
//!
//! The dive alternates master solves and protection checks. Each rejected
//! pattern adds its cuts to the pool, optionally fixes its suppressions for
//! the rest of the dive, and raises the suppression count the next master
//! solve must reach. The budget is checked before every master solve. Once a
//! pattern passes the check, the optional exact mode continues from it with
//! lazy cuts; finally the pattern is audited and pruned of redundant
//! suppressions.

mod dive;
mod exact;

pub use dive::{after_rejection, next_min_count, DiveState, DiveStep};
pub use exact::ProtectionSeparator;

use std::time::Instant;

use crate::checker::{prune_redundant, ProtectionChecker};
use crate::cuts::{starting_cuts, CutPool};
use crate::error::{SuppressError, SuppressResult};
use crate::master::MasterSelector;
use crate::model::{
    IterationRecord, OutcomeStatus, SolveStats, SuppressionOutcome, SuppressionPattern, TableModel,
};
use crate::settings::SuppressSettings;

/// Solver context for one table, from model load to the final outcome.
pub struct SuppressionSolver<'m> {
    model: &'m TableModel,
    settings: SuppressSettings,
    checker: ProtectionChecker,
    master: MasterSelector,
    pool: CutPool,
    state: DiveState,
    trace: Vec<IterationRecord>,
    stats: SolveStats,
    start: Instant,
}

impl<'m> SuppressionSolver<'m> {
    /// Build the attacker and master problems for `model`.
    pub fn new(model: &'m TableModel, settings: SuppressSettings) -> SuppressResult<Self> {
        settings.validate()?;
        let start = Instant::now();

        let checker = ProtectionChecker::new(model, &settings)?;
        let master = MasterSelector::new(model, &settings.master, settings.lp.clone())?;

        let mut pool = CutPool::new();
        if settings.starting_constraints {
            let added = pool.extend(starting_cuts(model));
            log::info!("added {} starting constraints", added);
        }

        Ok(Self {
            model,
            settings,
            checker,
            master,
            pool,
            state: DiveState::Init,
            trace: Vec::new(),
            stats: SolveStats::default(),
            start,
        })
    }

    /// Current dive state.
    pub fn state(&self) -> DiveState {
        self.state
    }

    /// The cut pool.
    pub fn pool(&self) -> &CutPool {
        &self.pool
    }

    /// Run the dive, the optional exact mode and the final audit.
    pub fn run(mut self) -> SuppressResult<SuppressionOutcome> {
        let (mut pattern, mut protected) = self.dive()?;
        let mut status = if protected {
            OutcomeStatus::Converged
        } else {
            OutcomeStatus::Exhausted
        };

        if let Some(exact) = self.settings.exact.clone() {
            let limit = match (exact.time_limit_ms, self.remaining_ms()) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            };
            let start = protected.then_some(&pattern);

            self.checker.set_max_cuts(exact.max_cuts_per_separation);
            let mut separator = ProtectionSeparator::new(self.model, &mut self.checker);
            let result = self
                .master
                .solve_exact(&mut self.pool, &mut separator, start, limit);
            self.stats.attacker_solves += separator.solves;
            self.stats.attacker_skips += separator.skipped;
            self.checker.set_max_cuts(self.settings.max_cuts_per_check);

            match result {
                Ok(sol) => {
                    log::info!(
                        "exact search: {} after {} nodes, cost {:.2} (bound {:.2})",
                        sol.status,
                        sol.nodes_explored,
                        sol.objective,
                        sol.bound
                    );
                    self.stats.master_nodes += sol.nodes_explored;
                    status = if sol.status.is_optimal() {
                        OutcomeStatus::Optimal
                    } else {
                        OutcomeStatus::ExactLimit
                    };
                    pattern = sol.pattern;
                    protected = true;
                }
                Err(SuppressError::MasterFailure(msg)) if !protected => {
                    log::warn!("exact search found no protected pattern: {}", msg);
                }
                Err(e) => return Err(e),
            }
        }

        self.finalize(status, pattern, protected)
    }

    /// Run the dive. Returns the last pattern and whether it is protected.
    fn dive(&mut self) -> SuppressResult<(SuppressionPattern, bool)> {
        let cap = self.master.max_suppressible();
        let mut min_count = self.model.sensitive_cells().len().min(cap);
        let mut last: Option<SuppressionPattern> = None;
        self.state.advance(DiveState::Iterating);

        let mut iteration = 0;
        loop {
            if let Some(reason) = self.budget_exhausted(iteration) {
                self.state.advance(DiveState::Exhausted);
                log::warn!("dive stopped after {} iterations: {}", iteration, reason);
                return match last {
                    Some(pattern) => Ok((pattern, false)),
                    None => Err(SuppressError::BudgetExhausted(reason)),
                };
            }

            let sol = self.master.solve(&self.pool, min_count)?;
            self.stats.master_nodes += sol.nodes_explored;
            let pattern = sol.pattern;

            let check = self.checker.check(self.model, &pattern)?;
            self.stats.attacker_solves += check.solves;
            self.stats.attacker_skips += check.skipped;

            self.pool.next_iteration();
            let violations = check.violations.len();
            let added = self.pool.extend(check.cuts);
            let count = pattern.count();
            let cost = pattern.cost(self.model);

            log::info!(
                "iteration {}: {} suppressed (minimum {}), cost {:.2}, {} violations, {} new cuts",
                iteration,
                count,
                min_count,
                cost,
                violations,
                added
            );
            self.stats.iterations += 1;
            self.trace.push(IterationRecord {
                iteration,
                pattern: pattern.clone(),
                suppressed: count,
                min_count,
                cost,
                violations,
                cuts_added: added,
            });

            if violations == 0 {
                self.state.advance(DiveState::Converged);
                return Ok((pattern, true));
            }

            if self.settings.dive_fixing {
                self.master.fix_suppressed(&pattern);
            }
            if added == 0 {
                log::warn!("iteration {}: all cuts already known", iteration);
            }
            min_count = match after_rejection(count, added, self.settings.multiplier, cap) {
                DiveStep::Continue(next) => next,
                DiveStep::Stalled => {
                    self.state.advance(DiveState::Exhausted);
                    log::warn!(
                        "dive stopped after {} iterations: all {} suppressible cells are suppressed and no new cut excludes them",
                        iteration + 1,
                        cap
                    );
                    return Ok((pattern, false));
                }
            };
            last = Some(pattern);
            iteration += 1;
        }
    }

    fn budget_exhausted(&self, iteration: usize) -> Option<String> {
        if iteration >= self.settings.max_iterations {
            return Some(format!("iteration limit {} reached", self.settings.max_iterations));
        }
        if self.remaining_ms() == Some(0) {
            return Some("time limit reached".to_string());
        }
        None
    }

    fn remaining_ms(&self) -> Option<u64> {
        let elapsed = self.start.elapsed().as_millis() as u64;
        self.settings
            .time_limit_ms
            .map(|limit| limit.saturating_sub(elapsed))
    }

    fn finalize(
        mut self,
        status: OutcomeStatus,
        mut pattern: SuppressionPattern,
        protected: bool,
    ) -> SuppressResult<SuppressionOutcome> {
        let mut bounds = self.checker.audit(self.model, &pattern)?;
        self.stats.attacker_solves += 2 * pattern.count();

        if protected && self.settings.prune_redundant {
            self.stats.redundant_removed =
                prune_redundant(self.model, &mut pattern, &mut bounds, self.settings.protection_tol);
        }

        self.stats.cuts_total = self.pool.len();
        self.stats.elapsed_ms = self.start.elapsed().as_millis() as u64;
        let cost = pattern.cost(self.model);

        log::info!(
            "{}: {} cells suppressed, cost {:.2}, {} iterations, {} cuts, {} ms",
            status,
            pattern.count(),
            cost,
            self.stats.iterations,
            self.stats.cuts_total,
            self.stats.elapsed_ms
        );

        Ok(SuppressionOutcome {
            status,
            pattern,
            cost,
            fully_protected: protected,
            bounds,
            stats: self.stats,
            trace: self.trace,
        })
    }
}

/// Compute a protected suppression pattern for `model`.
pub fn protect(model: &TableModel, settings: SuppressSettings) -> SuppressResult<SuppressionOutcome> {
    SuppressionSolver::new(model, settings)?.run()
}
