//! Cuts known before the first master solve.
//!
//! Two families, both derived from single relations:
//!
//! - Relation protection: if the other sensitive cells of a relation cannot
//!   absorb a sensitive cell's protection level on their own, enough slack
//!   must come from suppressing further cells of that relation. Raising the
//!   target is compensated by raising cells on the opposite side of the
//!   equation or lowering cells on the same side.
//! - Bridgeless: a relation with exactly one suppressed cell discloses it,
//!   so every suppressed cell needs a suppressed partner in each of its
//!   relations. Only emitted for relations with fewer than two sensitive
//!   cells.

use super::{CutSource, FeasibilityCut};
use crate::model::TableModel;

/// Starting cuts for `model`.
pub fn starting_cuts(model: &TableModel) -> Vec<FeasibilityCut> {
    let mut cuts = Vec::new();

    for (r, row) in model.relation_rows().iter().enumerate() {
        let sensitive_count = row
            .terms
            .iter()
            .filter(|&&(j, _)| model.cell(j).is_sensitive())
            .count();

        for &(c, sign_c) in &row.terms {
            let cell = model.cell(c);
            if !cell.is_sensitive() {
                continue;
            }

            // Upward move of c: opposite-side cells go up, same-side cells go down.
            let upward = |j: usize, sign_j: f64| {
                let other = model.cell(j);
                if sign_j == sign_c {
                    other.down_slack()
                } else {
                    other.up_slack()
                }
            };
            let downward = |j: usize, sign_j: f64| {
                let other = model.cell(j);
                if sign_j == sign_c {
                    other.up_slack()
                } else {
                    other.down_slack()
                }
            };

            if let Some(cut) = relation_cut(model, &row.terms, c, cell.upper_protection, upward) {
                cuts.push(FeasibilityCut::new(
                    cut,
                    cell.upper_protection,
                    CutSource::RelationUpper { relation: r, cell: c },
                ));
            }
            if let Some(cut) = relation_cut(model, &row.terms, c, cell.lower_protection, downward) {
                cuts.push(FeasibilityCut::new(
                    cut,
                    cell.lower_protection,
                    CutSource::RelationLower { relation: r, cell: c },
                ));
            }
        }

        if sensitive_count < 2 {
            for &(c, _) in &row.terms {
                if model.cell(c).is_pinned_zero() {
                    continue;
                }
                let mut terms: Vec<(usize, f64)> = row
                    .terms
                    .iter()
                    .filter(|&&(j, _)| j != c && !model.cell(j).is_pinned_zero())
                    .map(|&(j, _)| (j, 1.0))
                    .collect();
                terms.push((c, -1.0));
                cuts.push(FeasibilityCut::new(
                    terms,
                    0.0,
                    CutSource::Bridgeless { relation: r, cell: c },
                ));
            }
        }
    }

    log::debug!("{} starting cuts", cuts.len());
    cuts
}

/// Terms of `sum(min(slack_j, level) x_j) >= level` over the other cells of
/// the relation, or None when the sensitive cells alone already cover it.
fn relation_cut(
    model: &TableModel,
    terms: &[(usize, f64)],
    target: usize,
    level: f64,
    slack: impl Fn(usize, f64) -> f64,
) -> Option<Vec<(usize, f64)>> {
    if level <= 0.0 {
        return None;
    }

    let primary_room: f64 = terms
        .iter()
        .filter(|&&(j, _)| j != target && model.cell(j).is_sensitive())
        .map(|&(j, s)| slack(j, s))
        .sum();
    if primary_room >= level {
        return None;
    }

    Some(
        terms
            .iter()
            .filter(|&&(j, _)| j != target && !model.cell(j).is_pinned_zero())
            .map(|&(j, s)| (j, slack(j, s).min(level)))
            .filter(|&(_, a)| a > 0.0)
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Cell, CellStatus, Relation};

    // a + b + z = t, a sensitive with protection 5, z a structural zero
    fn relation_table() -> TableModel {
        let cells = vec![
            Cell::new("a", 8.0, CellStatus::Sensitive)
                .with_bounds(0.0, 100.0)
                .with_protection(5.0, 5.0),
            Cell::new("b", 3.0, CellStatus::Suppressible).with_bounds(0.0, 100.0),
            Cell::new("z", 0.0, CellStatus::MustBeZero).with_bounds(0.0, 0.0),
            Cell::new("t", 11.0, CellStatus::Suppressible).with_bounds(0.0, 100.0),
        ];
        TableModel::new(cells, vec![Relation::total("t", ["a", "b", "z"])]).unwrap()
    }

    #[test]
    fn test_relation_protection_coefficients() {
        let model = relation_table();
        let cuts = starting_cuts(&model);

        let upper = cuts
            .iter()
            .find(|c| matches!(c.source, CutSource::RelationUpper { .. }))
            .unwrap();
        // Raising a by 5: b can drop by only 3, t can rise by 89
        assert_eq!(upper.terms, vec![(1, 3.0), (3, 5.0)]);
        assert_eq!(upper.rhs, 5.0);

        let lower = cuts
            .iter()
            .find(|c| matches!(c.source, CutSource::RelationLower { .. }))
            .unwrap();
        // Lowering a by 5: b can rise, t can drop by 11
        assert_eq!(lower.terms, vec![(1, 5.0), (3, 5.0)]);
    }

    #[test]
    fn test_bridgeless_cuts_skip_zeros() {
        let model = relation_table();
        let bridgeless: Vec<_> = starting_cuts(&model)
            .into_iter()
            .filter(|c| matches!(c.source, CutSource::Bridgeless { .. }))
            .collect();

        // One per non-zero cell
        assert_eq!(bridgeless.len(), 3);
        let for_a = bridgeless
            .iter()
            .find(|c| c.source == CutSource::Bridgeless { relation: 0, cell: 0 })
            .unwrap();
        assert_eq!(for_a.terms, vec![(0, -1.0), (1, 1.0), (3, 1.0)]);
        assert_eq!(for_a.rhs, 0.0);
    }

    #[test]
    fn test_no_bridgeless_with_two_primaries() {
        let cells = vec![
            Cell::new("a", 4.0, CellStatus::Sensitive)
                .with_bounds(0.0, 50.0)
                .with_protection(1.0, 1.0),
            Cell::new("b", 6.0, CellStatus::Sensitive)
                .with_bounds(0.0, 50.0)
                .with_protection(1.0, 1.0),
            Cell::new("t", 10.0, CellStatus::Suppressible).with_bounds(0.0, 50.0),
        ];
        let model = TableModel::new(cells, vec![Relation::total("t", ["a", "b"])]).unwrap();
        let cuts = starting_cuts(&model);

        // The two primaries protect each other, so no cuts at all
        assert!(cuts.is_empty());
    }
}
