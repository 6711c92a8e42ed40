//! Lazy protection separation for the exact mode.

use suppress_lp::{OptimizationBackend, SimplexBackend};

use crate::checker::ProtectionChecker;
use crate::cuts::FeasibilityCut;
use crate::error::SuppressResult;
use crate::master::LazyCutCallback;
use crate::model::{SuppressionPattern, TableModel};

/// Runs a protection check on every integral master candidate.
pub struct ProtectionSeparator<'a, B: OptimizationBackend = SimplexBackend> {
    model: &'a TableModel,
    checker: &'a mut ProtectionChecker<B>,
    /// Candidates checked.
    pub calls: usize,
    /// Candidates rejected.
    pub rejected: usize,
    /// Attacker LPs solved.
    pub solves: usize,
    /// Attacker LPs skipped thanks to witness bounds.
    pub skipped: usize,
}

impl<'a, B: OptimizationBackend> ProtectionSeparator<'a, B> {
    /// Separator over `checker`.
    pub fn new(model: &'a TableModel, checker: &'a mut ProtectionChecker<B>) -> Self {
        Self {
            model,
            checker,
            calls: 0,
            rejected: 0,
            solves: 0,
            skipped: 0,
        }
    }
}

impl<B: OptimizationBackend> LazyCutCallback for ProtectionSeparator<'_, B> {
    fn separate(&mut self, pattern: &SuppressionPattern) -> SuppressResult<Vec<FeasibilityCut>> {
        let result = self.checker.check(self.model, pattern)?;
        self.calls += 1;
        self.solves += result.solves;
        self.skipped += result.skipped;
        if !result.is_protected() {
            self.rejected += 1;
        }
        Ok(result.cuts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Cell, CellStatus, Relation};
    use crate::settings::SuppressSettings;

    #[test]
    fn test_separator_counts() {
        let cells = vec![
            Cell::new("a", 3.0, CellStatus::Sensitive)
                .with_bounds(0.0, 20.0)
                .with_protection(1.0, 1.0),
            Cell::new("b", 4.0, CellStatus::Suppressible).with_bounds(0.0, 20.0),
            Cell::new("t", 7.0, CellStatus::Suppressible).with_bounds(0.0, 20.0),
        ];
        let model = TableModel::new(cells, vec![Relation::total("t", ["a", "b"])]).unwrap();
        let mut checker = ProtectionChecker::new(&model, &SuppressSettings::default()).unwrap();
        let mut separator = ProtectionSeparator::new(&model, &mut checker);

        let cuts = separator
            .separate(&SuppressionPattern::primary(&model))
            .unwrap();
        assert_eq!(cuts.len(), 2);

        let cuts = separator
            .separate(&SuppressionPattern::from_flags(vec![true, true, false]))
            .unwrap();
        assert!(cuts.is_empty());
        assert_eq!((separator.calls, separator.rejected), (2, 1));
    }
}
