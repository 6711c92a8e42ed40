//! Attacker problems.
//!
//! One LP holds a variable per cell and every relation as an equality.
//! Published cells are fixed to their nominal value; suppressed cells range
//! over their feasible interval. The attacker's tightest range for a cell is
//! the min and max of that cell's variable. The LP is built once and then
//! edited in place: switching a cell between fixed and free, or changing the
//! target, only touches bounds and two objective coefficients, so every
//! re-solve warm-starts from the previous basis.

use suppress_lp::{
    LinearRow, LpSettings, LpStatus, ObjSense, OptimizationBackend, SimplexBackend,
};

use crate::error::{SuppressError, SuppressResult};
use crate::model::{AttackerBound, SuppressionPattern, TableModel};

/// Direction of an attacker solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackDirection {
    /// Minimize the target (attack the lower protection level).
    Lower,
    /// Maximize the target (attack the upper protection level).
    Upper,
}

impl AttackDirection {
    fn sense(self) -> ObjSense {
        match self {
            AttackDirection::Lower => ObjSense::Minimize,
            AttackDirection::Upper => ObjSense::Maximize,
        }
    }
}

/// Optimal attacker solution.
#[derive(Debug, Clone)]
pub struct AttackerSolution {
    /// Target cell index.
    pub target: usize,

    /// Direction of the solve.
    pub direction: AttackDirection,

    /// Optimal value of the target.
    pub value: f64,

    /// Cell values at the optimum.
    pub x: Vec<f64>,

    /// Reduced costs per cell, in the direction of the solve.
    pub reduced_costs: Vec<f64>,
}

/// Persistent attacker LP over all cells.
pub struct AttackerEngine<B: OptimizationBackend = SimplexBackend> {
    backend: B,
    ids: Vec<String>,
    nominal: Vec<f64>,
    /// Range a free cell may take.
    ranges: Vec<(f64, f64)>,
    /// Value of a fixed cell, None while free.
    fixed: Vec<Option<f64>>,
    target: Option<usize>,
}

impl AttackerEngine<SimplexBackend> {
    /// Build the attacker LP with the built-in simplex backend.
    pub fn new(model: &TableModel, settings: LpSettings) -> SuppressResult<Self> {
        Self::with_backend(model, SimplexBackend::new(settings)?)
    }
}

impl<B: OptimizationBackend> AttackerEngine<B> {
    /// Build the attacker LP on an empty backend.
    ///
    /// Every cell starts fixed to its nominal value.
    pub fn with_backend(model: &TableModel, mut backend: B) -> SuppressResult<Self> {
        if backend.num_vars() != 0 || backend.num_constraints() != 0 {
            return Err(SuppressError::InvalidSettings(
                "attacker backend must start empty".to_string(),
            ));
        }

        let n = model.num_cells();
        let mut ids = Vec::with_capacity(n);
        let mut nominal = Vec::with_capacity(n);
        let mut ranges = Vec::with_capacity(n);
        for cell in model.cells() {
            backend.add_variable(cell.nominal, cell.nominal, 0.0)?;
            ids.push(cell.id.clone());
            nominal.push(cell.nominal);
            ranges.push((cell.lower_bound, cell.upper_bound));
        }

        let matrix = model.relation_matrix();
        for (r, row) in matrix.outer_iterator().enumerate() {
            let coefs: Vec<(usize, f64)> = row.iter().map(|(j, &a)| (j, a)).collect();
            let rhs = model.relation_rows()[r].rhs;
            backend.add_constraint(LinearRow::eq(coefs, rhs))?;
        }

        Ok(Self {
            backend,
            ids,
            fixed: nominal.iter().map(|&v| Some(v)).collect(),
            nominal,
            ranges,
            target: None,
        })
    }

    /// Number of cells.
    pub fn num_cells(&self) -> usize {
        self.ids.len()
    }

    /// Whether cell `cell` is currently free.
    pub fn is_free(&self, cell: usize) -> bool {
        self.fixed[cell].is_none()
    }

    /// Fix a cell to `value`.
    pub fn fix(&mut self, cell: usize, value: f64) -> SuppressResult<()> {
        if self.fixed[cell] != Some(value) {
            self.backend.set_var_bounds(cell, value, value)?;
            self.fixed[cell] = Some(value);
        }
        Ok(())
    }

    /// Let a cell range over its feasible interval.
    pub fn free(&mut self, cell: usize) -> SuppressResult<()> {
        if self.fixed[cell].is_some() {
            let (lo, hi) = self.ranges[cell];
            self.backend.set_var_bounds(cell, lo, hi)?;
            self.fixed[cell] = None;
        }
        Ok(())
    }

    /// Change the interval a cell ranges over while free.
    pub fn update_bounds(&mut self, cell: usize, lower: f64, upper: f64) -> SuppressResult<()> {
        if !lower.is_finite() || !upper.is_finite() || lower > upper {
            return Err(SuppressError::InvalidModel(format!(
                "invalid attacker range [{}, {}] for cell {}",
                lower, upper, self.ids[cell]
            )));
        }
        self.ranges[cell] = (lower, upper);
        if self.fixed[cell].is_none() {
            self.backend.set_var_bounds(cell, lower, upper)?;
        }
        Ok(())
    }

    /// Free the suppressed cells and fix the others at their nominal value.
    pub fn apply_pattern(&mut self, pattern: &SuppressionPattern) -> SuppressResult<()> {
        for cell in 0..self.num_cells() {
            if pattern.is_suppressed(cell) {
                self.free(cell)?;
            } else {
                self.fix(cell, self.nominal[cell])?;
            }
        }
        Ok(())
    }

    /// Smallest value of `target` under the current fixes.
    pub fn solve_min(&mut self, target: usize) -> SuppressResult<AttackerSolution> {
        self.solve(target, AttackDirection::Lower)
    }

    /// Largest value of `target` under the current fixes.
    pub fn solve_max(&mut self, target: usize) -> SuppressResult<AttackerSolution> {
        self.solve(target, AttackDirection::Upper)
    }

    /// Attacker range of `target` against `pattern`.
    pub fn bound(&mut self, target: usize, pattern: &SuppressionPattern) -> SuppressResult<AttackerBound> {
        self.apply_pattern(pattern)?;
        let lower = self.solve_min(target)?.value;
        let upper = self.solve_max(target)?.value;
        Ok(AttackerBound { lower, upper })
    }

    /// Solve in the given direction.
    pub fn solve(&mut self, target: usize, direction: AttackDirection) -> SuppressResult<AttackerSolution> {
        if self.target != Some(target) {
            if let Some(old) = self.target {
                self.backend.set_cost(old, 0.0)?;
            }
            self.backend.set_cost(target, 1.0)?;
            self.target = Some(target);
        }
        self.backend.set_sense(direction.sense());

        let status = self.backend.optimize()?;
        if status != LpStatus::Optimal {
            return Err(SuppressError::AttackerFailure {
                cell: self.ids[target].clone(),
                status,
            });
        }

        Ok(AttackerSolution {
            target,
            direction,
            value: self.backend.objective_value()?,
            x: self.backend.primal_values()?.to_vec(),
            reduced_costs: self.backend.reduced_costs()?.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Cell, CellStatus, Relation};

    // a + b = t with a = 3, b = 4, t = 7, all in [0, 10]
    fn small_table() -> TableModel {
        let cells = vec![
            Cell::new("a", 3.0, CellStatus::Sensitive).with_bounds(0.0, 10.0),
            Cell::new("b", 4.0, CellStatus::Suppressible).with_bounds(0.0, 10.0),
            Cell::new("t", 7.0, CellStatus::Suppressible).with_bounds(0.0, 10.0),
        ];
        TableModel::new(cells, vec![Relation::total("t", ["a", "b"])]).unwrap()
    }

    #[test]
    fn test_lone_suppression_is_disclosed() {
        let model = small_table();
        let mut attacker = AttackerEngine::new(&model, LpSettings::default()).unwrap();
        let pattern = SuppressionPattern::primary(&model);

        let b = attacker.bound(0, &pattern).unwrap();
        assert!((b.lower - 3.0).abs() < 1e-9);
        assert!((b.upper - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_partner_opens_range() {
        let model = small_table();
        let mut attacker = AttackerEngine::new(&model, LpSettings::default()).unwrap();
        let pattern = SuppressionPattern::from_flags(vec![true, true, false]);

        // a = 7 - b with b in [0, 10] and a in [0, 10]: a in [0, 7]
        let b = attacker.bound(0, &pattern).unwrap();
        assert!(b.lower.abs() < 1e-9);
        assert!((b.upper - 7.0).abs() < 1e-9);

        // Narrow b's range: a = 7 - b with b in [2, 5] gives a in [2, 5]
        attacker.update_bounds(1, 2.0, 5.0).unwrap();
        let max = attacker.solve_max(0).unwrap();
        assert!((max.value - 5.0).abs() < 1e-9);
        assert!((max.x[1] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_reduced_costs_point_at_binding_cells() {
        let model = small_table();
        let mut attacker = AttackerEngine::new(&model, LpSettings::default()).unwrap();
        attacker
            .apply_pattern(&SuppressionPattern::primary(&model))
            .unwrap();

        // Only the fixed cells b and t hold a up
        let max = attacker.solve_max(0).unwrap();
        assert!(max.reduced_costs[1].abs() > 1e-9 || max.reduced_costs[2].abs() > 1e-9);

        attacker.free(2).unwrap();
        assert!(attacker.is_free(2));
        attacker.fix(2, 7.0).unwrap();
        assert!(!attacker.is_free(2));
    }
}
