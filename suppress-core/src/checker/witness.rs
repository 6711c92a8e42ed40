//! Witness bounds.
//!
//! Every optimal attacker solution is a table consistent with the published
//! data, so each cell value in it is a value the attacker cannot rule out.
//! The highest and lowest values seen per cell therefore bound the attacker
//! range from inside; once they reach a protection level the corresponding
//! attacker LP need not be solved. Witnesses stay valid when cells are
//! suppressed in addition, never when a cell is published again.

use crate::model::{SuppressionPattern, TableModel};

/// Highest and lowest attainable values observed per cell.
#[derive(Debug, Clone)]
pub struct WitnessBounds {
    high: Vec<f64>,
    low: Vec<f64>,
    nominal: Vec<f64>,
    /// Pattern the witnesses were collected on.
    basis: Option<SuppressionPattern>,
}

impl WitnessBounds {
    /// Witnesses at the nominal values.
    pub fn new(model: &TableModel) -> Self {
        let nominal: Vec<f64> = model.cells().iter().map(|c| c.nominal).collect();
        Self {
            high: nominal.clone(),
            low: nominal.clone(),
            nominal,
            basis: None,
        }
    }

    /// Forget all observations.
    pub fn reset(&mut self) {
        self.high.copy_from_slice(&self.nominal);
        self.low.copy_from_slice(&self.nominal);
        self.basis = None;
    }

    /// Prepare for checking `pattern`: keep the observations only if
    /// `pattern` suppresses everything the previous one did.
    pub fn rebase(&mut self, pattern: &SuppressionPattern) -> bool {
        let keep = self
            .basis
            .as_ref()
            .map_or(false, |old| pattern.is_superset_of(old));
        if !keep {
            self.reset();
        }
        self.basis = Some(pattern.clone());
        keep
    }

    /// Record an attainable table.
    pub fn observe(&mut self, x: &[f64]) {
        for ((h, l), &v) in self.high.iter_mut().zip(self.low.iter_mut()).zip(x) {
            if v > *h {
                *h = v;
            }
            if v < *l {
                *l = v;
            }
        }
    }

    /// Highest value observed for `cell`.
    pub fn high(&self, cell: usize) -> f64 {
        self.high[cell]
    }

    /// Lowest value observed for `cell`.
    pub fn low(&self, cell: usize) -> f64 {
        self.low[cell]
    }
}
