//! Branching variable selection.

use super::BoundChange;
use crate::settings::BranchingRule;

/// A branching decision.
#[derive(Debug, Clone)]
pub struct BranchDecision {
    /// Variable to branch on.
    pub var: usize,

    /// Current (fractional) value.
    pub value: f64,

    /// Bound change for the "publish" branch (x = 0).
    pub down_branch: BoundChange,

    /// Bound change for the "suppress" branch (x = 1).
    pub up_branch: BoundChange,

    /// Score of this decision (for logging/debugging).
    pub score: f64,
}

/// Branching variable selector.
pub struct BranchingSelector {
    /// Branching rule to use.
    rule: BranchingRule,

    /// Average objective change per unit decrease.
    pseudocosts_down: Vec<f64>,

    /// Average objective change per unit increase.
    pseudocosts_up: Vec<f64>,

    /// Number of times each variable has been branched on (down direction).
    branch_count_down: Vec<u64>,

    /// Number of times each variable has been branched on (up direction).
    branch_count_up: Vec<u64>,
}

impl BranchingSelector {
    /// Create a new branching selector.
    pub fn new(rule: BranchingRule, num_vars: usize) -> Self {
        Self {
            rule,
            pseudocosts_down: vec![1.0; num_vars],
            pseudocosts_up: vec![1.0; num_vars],
            branch_count_down: vec![0; num_vars],
            branch_count_up: vec![0; num_vars],
        }
    }

    /// Fractional free variables as `(var, value, fractionality)`.
    pub fn fractional_vars(x: &[f64], lb: &[f64], ub: &[f64], tol: f64) -> Vec<(usize, f64, f64)> {
        x.iter()
            .enumerate()
            .filter(|&(j, _)| ub[j] - lb[j] > 0.5)
            .filter_map(|(j, &v)| {
                let frac = (v - v.floor()).min(v.ceil() - v);
                (frac > tol).then_some((j, v, frac))
            })
            .collect()
    }

    /// Select a branching variable.
    ///
    /// Returns None if the relaxation is integral.
    pub fn select(&self, x: &[f64], lb: &[f64], ub: &[f64], tol: f64) -> Option<BranchDecision> {
        let fractional = Self::fractional_vars(x, lb, ub, tol);

        let scored = fractional.iter().map(|&(var, value, frac)| {
            let score = match self.rule {
                BranchingRule::MostFractional => frac,
                BranchingRule::Pseudocost => self.pseudocost_score(var, value),
            };
            (var, value, score)
        });

        // Strictly better scores only, so ties go to the lowest index
        let mut best: Option<(usize, f64, f64)> = None;
        for cand in scored {
            if best.map_or(true, |(_, _, s)| cand.2 > s + 1e-12) {
                best = Some(cand);
            }
        }

        let (var, value, score) = best?;
        Some(BranchDecision {
            var,
            value,
            down_branch: BoundChange::down_branch(var, lb[var], ub[var], value),
            up_branch: BoundChange::up_branch(var, lb[var], ub[var], value),
            score,
        })
    }

    /// Compute pseudocost score for a variable.
    fn pseudocost_score(&self, var: usize, value: f64) -> f64 {
        let down_frac = value - value.floor();
        let up_frac = 1.0 - down_frac;

        let down_cost = down_frac * self.pseudocosts_down[var];
        let up_cost = up_frac * self.pseudocosts_up[var];

        // Product score prefers balanced improvements in both directions
        (down_cost * up_cost).max(1e-10)
    }

    /// Update pseudocosts after solving a child node.
    pub fn update_pseudocosts(
        &mut self,
        var: usize,
        value: f64,
        down_obj_change: Option<f64>,
        up_obj_change: Option<f64>,
    ) {
        let down_frac = value - value.floor();
        let up_frac = 1.0 - down_frac;

        if let Some(change) = down_obj_change {
            if down_frac > 1e-6 && change > 0.0 {
                let pc = change / down_frac;
                let count = self.branch_count_down[var] as f64;
                self.pseudocosts_down[var] = (self.pseudocosts_down[var] * count + pc) / (count + 1.0);
                self.branch_count_down[var] += 1;
            }
        }

        if let Some(change) = up_obj_change {
            if up_frac > 1e-6 && change > 0.0 {
                let pc = change / up_frac;
                let count = self.branch_count_up[var] as f64;
                self.pseudocosts_up[var] = (self.pseudocosts_up[var] * count + pc) / (count + 1.0);
                self.branch_count_up[var] += 1;
            }
        }
    }

    /// Get pseudocost statistics for a variable.
    pub fn get_pseudocosts(&self, var: usize) -> (f64, f64, u64, u64) {
        (
            self.pseudocosts_down[var],
            self.pseudocosts_up[var],
            self.branch_count_down[var],
            self.branch_count_up[var],
        )
    }

    /// Initialize pseudocosts from the suppression weights.
    pub fn init_from_objective(&mut self, weights: &[f64]) {
        for (i, &w) in weights.iter().enumerate().take(self.pseudocosts_down.len()) {
            let init_cost = w.abs().max(0.1);
            self.pseudocosts_down[i] = init_cost;
            self.pseudocosts_up[i] = init_cost;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LB: [f64; 3] = [0.0, 0.0, 1.0];
    const UB: [f64; 3] = [1.0, 1.0, 1.0];

    #[test]
    fn test_most_fractional_lowest_index_on_ties() {
        let selector = BranchingSelector::new(BranchingRule::MostFractional, 3);

        // x0 and x1 equally fractional
        let d = selector.select(&[0.3, 0.7, 1.0], &LB, &UB, 1e-6).unwrap();
        assert_eq!(d.var, 0);

        let d = selector.select(&[0.1, 0.5, 1.0], &LB, &UB, 1e-6).unwrap();
        assert_eq!(d.var, 1);
        assert_eq!(d.down_branch.new_ub, 0.0);
        assert_eq!(d.up_branch.new_lb, 1.0);
    }

    #[test]
    fn test_integral_and_fixed_vars() {
        let selector = BranchingSelector::new(BranchingRule::MostFractional, 3);
        assert!(selector.select(&[1.0, 0.0, 1.0], &LB, &UB, 1e-6).is_none());

        // Fixed variables are never branched on even if numerically off
        let lb = [1.0, 0.0, 1.0];
        assert!(selector.select(&[0.6, 0.0, 1.0], &lb, &UB, 1e-6).is_none());
    }

    #[test]
    fn test_pseudocost_update() {
        let mut selector = BranchingSelector::new(BranchingRule::Pseudocost, 2);
        selector.init_from_objective(&[5.0, 1.0]);
        assert_eq!(selector.get_pseudocosts(0).0, 5.0);

        selector.update_pseudocosts(1, 0.5, Some(2.0), Some(10.0));
        let (down, up, nd, nu) = selector.get_pseudocosts(1);
        // Running average over the initial estimate with weight zero
        assert_eq!((down, up), (4.0, 20.0));
        assert_eq!((nd, nu), (1, 1));

        let d = selector.select(&[0.5, 0.5], &[0.0, 0.0], &[1.0, 1.0], 1e-6).unwrap();
        assert_eq!(d.var, 1);
    }
}
