//! End-to-end suppression scenarios.

use std::collections::HashSet;

use suppress_core::{
    protect, Cell, CellStatus, ExactSettings, OutcomeStatus, ProtectionChecker, Relation,
    SuppressError, SuppressSettings, SuppressionOutcome, SuppressionPattern, TableModel,
};
use suppress_lp::{LpSettings, LpStatus};

const COLS: [&str; 3] = ["A", "B", "C"];
const ROWS: [&str; 3] = ["I", "II", "III"];
const VALUES: [[f64; 3]; 3] = [[20.0, 50.0, 10.0], [8.0, 19.0, 22.0], [17.0, 32.0, 12.0]];

fn id(col: &str, row: &str) -> String {
    format!("{}{}", col, row)
}

/// The 3x3 table with row, column and grand totals; (C, II) is sensitive.
fn worked_example(sensitive_upper: f64, sensitive_ub: f64) -> TableModel {
    let mut cells = Vec::new();
    let cell = |id: String, v: f64| {
        Cell::new(id, v, CellStatus::Suppressible)
            .with_weight(v)
            .with_bounds(0.0, 1000.0)
    };

    for (r, row) in ROWS.iter().enumerate() {
        for (c, col) in COLS.iter().enumerate() {
            let v = VALUES[r][c];
            if *col == "C" && *row == "II" {
                cells.push(
                    Cell::new(id(col, row), v, CellStatus::Sensitive)
                        .with_weight(v)
                        .with_bounds(0.0, sensitive_ub)
                        .with_protection(5.0, sensitive_upper),
                );
            } else {
                cells.push(cell(id(col, row), v));
            }
        }
        cells.push(cell(id("T", row), VALUES[r].iter().sum()));
    }
    for (c, col) in COLS.iter().enumerate() {
        cells.push(cell(id(col, "T"), VALUES.iter().map(|r| r[c]).sum()));
    }
    cells.push(cell(id("T", "T"), 190.0));

    let mut relations = Vec::new();
    for row in ROWS {
        relations.push(Relation::total(id("T", row), COLS.map(|c| id(c, row))));
    }
    for col in COLS {
        relations.push(Relation::total(id(col, "T"), ROWS.map(|r| id(col, r))));
    }
    relations.push(Relation::total(id("T", "T"), COLS.map(|c| id(c, "T"))));
    relations.push(Relation::total(id("T", "T"), ROWS.map(|r| id("T", r))));

    TableModel::new(cells, relations).unwrap()
}

/// `rows x cols` interior cells with row, column and grand totals. Every
/// `stride`-th interior cell is sensitive with protection 2 both ways.
fn grid(rows: usize, cols: usize, stride: usize) -> TableModel {
    let value = |r: usize, c: usize| 10.0 + ((r * 7 + c * 5) % 13) as f64;
    let name = |r: Option<usize>, c: Option<usize>| match (r, c) {
        (Some(r), Some(c)) => format!("R{}C{}", r, c),
        (Some(r), None) => format!("R{}T", r),
        (None, Some(c)) => format!("TC{}", c),
        (None, None) => "TT".to_string(),
    };
    let cell = |id: String, v: f64| {
        Cell::new(id, v, CellStatus::Suppressible)
            .with_weight(v)
            .with_bounds(0.0, 10_000.0)
    };

    let mut cells = Vec::new();
    for r in 0..rows {
        for c in 0..cols {
            let v = value(r, c);
            if (r * cols + c) % stride == 0 {
                cells.push(
                    Cell::new(name(Some(r), Some(c)), v, CellStatus::Sensitive)
                        .with_weight(v)
                        .with_bounds(0.0, 10_000.0)
                        .with_protection(2.0, 2.0),
                );
            } else {
                cells.push(cell(name(Some(r), Some(c)), v));
            }
        }
        let total: f64 = (0..cols).map(|c| value(r, c)).sum();
        cells.push(cell(name(Some(r), None), total));
    }
    for c in 0..cols {
        let total: f64 = (0..rows).map(|r| value(r, c)).sum();
        cells.push(cell(name(None, Some(c)), total));
    }
    let grand: f64 = (0..rows).flat_map(|r| (0..cols).map(move |c| (r, c))).map(|(r, c)| value(r, c)).sum();
    cells.push(cell(name(None, None), grand));

    let mut relations = Vec::new();
    for r in 0..rows {
        relations.push(Relation::total(name(Some(r), None), (0..cols).map(|c| name(Some(r), Some(c)))));
    }
    for c in 0..cols {
        relations.push(Relation::total(name(None, Some(c)), (0..rows).map(|r| name(Some(r), Some(c)))));
    }
    relations.push(Relation::total(name(None, None), (0..rows).map(|r| name(Some(r), None))));
    relations.push(Relation::total(name(None, None), (0..cols).map(|c| name(None, Some(c)))));

    TableModel::new(cells, relations).unwrap()
}

fn suppressed_ids(model: &TableModel, outcome: &SuppressionOutcome) -> HashSet<String> {
    outcome
        .pattern
        .suppressed_cells()
        .map(|j| model.cell(j).id.clone())
        .collect()
}

fn assert_protected(model: &TableModel, outcome: &SuppressionOutcome) {
    for j in model.sensitive_cells() {
        let cell = model.cell(j);
        let bound = outcome.bounds[j];
        assert!(outcome.pattern.is_suppressed(j), "{} not suppressed", cell.id);
        assert!(
            bound.upper - cell.nominal >= cell.upper_protection - 1e-6,
            "{} upper range {} too tight",
            cell.id,
            bound.upper
        );
        assert!(
            cell.nominal - bound.lower >= cell.lower_protection - 1e-6,
            "{} lower range {} too tight",
            cell.id,
            bound.lower
        );
    }
}

#[test]
fn test_worked_example_converges_to_cheapest_rectangle() {
    let model = worked_example(5.0, 1000.0);
    let outcome = protect(&model, SuppressSettings::default()).unwrap();

    assert_eq!(outcome.status, OutcomeStatus::Converged);
    assert!(outcome.is_success());
    assert_eq!(outcome.trace.len(), 1);

    let expected: HashSet<String> = ["CII", "AII", "AIII", "CIII"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(suppressed_ids(&model, &outcome), expected);
    assert!((outcome.cost - 37.0).abs() < 1e-9);
    assert_protected(&model, &outcome);

    // Published cells report their own value
    let bi = model.index_of("BI").unwrap();
    assert_eq!(outcome.bounds[bi].width(), 0.0);
    assert_eq!(outcome.bounds[bi].lower, 50.0);
}

#[test]
fn test_partner_in_every_relation_of_the_primary() {
    let model = worked_example(5.0, 1000.0);
    let outcome = protect(&model, SuppressSettings::default()).unwrap();
    let ids = suppressed_ids(&model, &outcome);

    let row_ii = ["AII", "BII", "TII"].iter().any(|c| ids.contains(*c));
    let col_c = ["CI", "CIII", "CT"].iter().any(|c| ids.contains(*c));
    assert!(row_ii && col_c);
    assert!(outcome.pattern.count() >= 4);
}

#[test]
fn test_protection_holds_across_settings() {
    let model = worked_example(5.0, 1000.0);
    let variants = [
        SuppressSettings::default(),
        SuppressSettings::default().with_multiplier(2.0),
        SuppressSettings::default().with_starting_constraints(false),
        SuppressSettings::default()
            .with_starting_constraints(false)
            .with_multiplier(1.5),
    ];

    for settings in variants {
        let outcome = protect(&model, settings).unwrap();
        assert!(outcome.fully_protected);
        assert_protected(&model, &outcome);
    }
}

#[test]
fn test_dive_without_starting_constraints_is_monotone() {
    let model = worked_example(5.0, 1000.0);
    let settings = SuppressSettings::default().with_starting_constraints(false);
    let outcome = protect(&model, settings).unwrap();

    assert_eq!(outcome.status, OutcomeStatus::Converged);
    assert!(outcome.trace.len() >= 2);

    // The first pattern is the primary alone
    assert_eq!(outcome.trace[0].suppressed, 1);

    let mut seen = HashSet::new();
    for pair in outcome.trace.windows(2) {
        assert!(pair[1].suppressed > pair[0].suppressed);
        assert!(pair[1].pattern.is_superset_of(&pair[0].pattern));
    }
    for record in &outcome.trace {
        assert!(record.suppressed >= record.min_count);
        assert!(seen.insert(record.pattern.clone()), "pattern proposed twice");
    }

    let first = &outcome.trace[0];
    let last = outcome.trace.last().unwrap();
    assert!(first.cost <= last.cost);
    assert_eq!(last.violations, 0);
    for rejected in &outcome.trace[..outcome.trace.len() - 1] {
        assert!(rejected.violations > 0);
        assert_ne!(rejected.pattern, outcome.pattern);
    }
}

#[test]
fn test_multiplier_raises_minimum() {
    let model = worked_example(5.0, 1000.0);
    let settings = SuppressSettings::default()
        .with_starting_constraints(false)
        .with_multiplier(2.0);
    let outcome = protect(&model, settings).unwrap();
    let cap = model.num_suppressible();

    for pair in outcome.trace.windows(2) {
        let expected = (2 * pair[0].suppressed).min(cap);
        assert!(pair[1].min_count >= expected);
        assert!(pair[1].suppressed >= expected);
    }
}

#[test]
fn test_exact_mode_proves_optimality() {
    let model = worked_example(5.0, 1000.0);
    let settings = SuppressSettings::default().with_exact(ExactSettings::default());
    let outcome = protect(&model, settings).unwrap();

    assert_eq!(outcome.status, OutcomeStatus::Optimal);
    assert!((outcome.cost - 37.0).abs() < 1e-9);
    assert_protected(&model, &outcome);
}

#[test]
fn test_unreachable_protection_is_master_infeasible() {
    // The cell can rise by at most 1 but needs 100
    let model = worked_example(100.0, 23.0);
    match protect(&model, SuppressSettings::default()) {
        Err(SuppressError::MasterInfeasible(_)) => {}
        other => panic!("expected MasterInfeasible, got {:?}", other.map(|o| o.status)),
    }
}

#[test]
fn test_iteration_budget_reports_unprotected_pattern() {
    let model = worked_example(5.0, 1000.0);
    let settings = SuppressSettings::default()
        .with_starting_constraints(false)
        .with_max_iterations(1);
    let outcome = protect(&model, settings).unwrap();

    assert_eq!(outcome.status, OutcomeStatus::Exhausted);
    assert!(!outcome.fully_protected);
    assert!(!outcome.is_success());
    assert_eq!(outcome.trace.len(), 1);
    assert_eq!(outcome.pattern.count(), 1);
}

#[test]
fn test_zero_time_budget_is_an_error() {
    let model = worked_example(5.0, 1000.0);
    let settings = SuppressSettings::default().with_time_limit(0.0);
    assert!(matches!(
        protect(&model, settings),
        Err(SuppressError::BudgetExhausted(_))
    ));
}

#[test]
fn test_apply_outcome_marks_cells() {
    let mut model = worked_example(5.0, 1000.0);
    let outcome = protect(&model, SuppressSettings::default()).unwrap();
    model.apply_outcome(&outcome);

    for (j, cell) in model.cells().iter().enumerate() {
        assert_eq!(cell.suppressed, outcome.pattern.is_suppressed(j));
    }
    assert!(model.cell(model.index_of("CII").unwrap()).suppressed);
}

#[test]
fn test_structural_zero_is_never_suppressed() {
    // Row I holds a structural zero next to the sensitive cell
    let cell = |id: &str, v: f64| {
        Cell::new(id, v, CellStatus::Suppressible)
            .with_weight(v)
            .with_bounds(0.0, 100.0)
    };
    let cells = vec![
        Cell::new("AI", 5.0, CellStatus::Sensitive)
            .with_bounds(0.0, 100.0)
            .with_protection(2.0, 2.0),
        Cell::new("BI", 0.0, CellStatus::MustBeZero),
        cell("CI", 7.0),
        cell("TI", 12.0),
        cell("AII", 3.0),
        cell("BII", 4.0),
        cell("CII", 6.0),
        cell("TII", 13.0),
        cell("AT", 8.0),
        cell("BT", 4.0),
        cell("CT", 13.0),
        cell("TT", 25.0),
    ];
    let relations = vec![
        Relation::total("TI", ["AI", "BI", "CI"]),
        Relation::total("TII", ["AII", "BII", "CII"]),
        Relation::total("AT", ["AI", "AII"]),
        Relation::total("BT", ["BI", "BII"]),
        Relation::total("CT", ["CI", "CII"]),
        Relation::total("TT", ["AT", "BT", "CT"]),
        Relation::total("TT", ["TI", "TII"]),
    ];
    let model = TableModel::new(cells, relations).unwrap();

    let outcome = protect(&model, SuppressSettings::default()).unwrap();
    assert!(outcome.is_success());
    assert!(!outcome.pattern.is_suppressed(model.index_of("BI").unwrap()));
    assert_protected(&model, &outcome);
    assert!((outcome.cost - 16.0).abs() < 1e-9);
}

#[test]
fn test_non_additive_table_is_rejected() {
    let cells = vec![
        Cell::new("a", 1.0, CellStatus::Sensitive).with_bounds(0.0, 10.0),
        Cell::new("b", 2.0, CellStatus::Suppressible).with_bounds(0.0, 10.0),
        Cell::new("t", 4.0, CellStatus::Suppressible).with_bounds(0.0, 10.0),
    ];
    let result = TableModel::new(cells, vec![Relation::total("t", ["a", "b"])]);
    assert!(matches!(result, Err(SuppressError::InvalidModel(_))));
}

#[test]
fn test_attacker_failure_names_the_cell() {
    let model = worked_example(5.0, 1000.0);
    let settings = SuppressSettings {
        lp: LpSettings::default().with_max_iter(0),
        ..SuppressSettings::default()
    };
    let mut checker = ProtectionChecker::new(&model, &settings).unwrap();

    match checker.check(&model, &SuppressionPattern::primary(&model)) {
        Err(SuppressError::AttackerFailure { cell, status }) => {
            assert_eq!(cell, "CII");
            assert_eq!(status, LpStatus::MaxIters);
        }
        other => panic!("expected AttackerFailure, got {:?}", other.map(|r| r.violations.len())),
    }
}

#[test]
fn test_dive_without_fixing_converges() {
    let model = worked_example(5.0, 1000.0);
    let settings = SuppressSettings::default()
        .with_starting_constraints(false)
        .with_dive_fixing(false);
    let outcome = protect(&model, settings).unwrap();

    assert_eq!(outcome.status, OutcomeStatus::Converged);
    assert!(outcome.trace.len() >= 2);
    assert_eq!(outcome.trace[0].suppressed, 1);
    for record in &outcome.trace {
        assert!(record.suppressed >= record.min_count);
    }
    assert_eq!(outcome.trace.last().unwrap().violations, 0);
    assert_protected(&model, &outcome);
}

#[test]
fn test_determined_filler_is_pruned() {
    // f cannot move, so suppressing it only pads the dive minimum
    let cells = vec![
        Cell::new("a", 3.0, CellStatus::Sensitive)
            .with_bounds(0.0, 100.0)
            .with_protection(2.0, 2.0),
        Cell::new("b", 4.0, CellStatus::Suppressible)
            .with_bounds(0.0, 100.0)
            .with_weight(5.0),
        Cell::new("f", 1.0, CellStatus::Suppressible),
        Cell::new("t", 8.0, CellStatus::Suppressible)
            .with_bounds(0.0, 100.0)
            .with_weight(10.0),
    ];
    let model = TableModel::new(cells, vec![Relation::total("t", ["a", "b", "f"])]).unwrap();
    let f = model.index_of("f").unwrap();

    let settings = SuppressSettings::default()
        .with_starting_constraints(false)
        .with_multiplier(3.0);
    let outcome = protect(&model, settings).unwrap();

    assert_eq!(outcome.status, OutcomeStatus::Converged);
    let last = outcome.trace.last().unwrap();
    assert!(last.pattern.is_suppressed(f));
    assert_eq!(last.suppressed, 3);

    assert_eq!(outcome.stats.redundant_removed, 1);
    assert!(!outcome.pattern.is_suppressed(f));
    assert_eq!(outcome.bounds[f].width(), 0.0);
    let expected: HashSet<String> = ["a", "b"].iter().map(|s| s.to_string()).collect();
    assert_eq!(suppressed_ids(&model, &outcome), expected);
    assert!((outcome.cost - 5.0).abs() < 1e-9);
    assert_protected(&model, &outcome);
}

#[test]
fn test_six_by_five_table() {
    let model = grid(6, 5, 7);
    assert_eq!(model.sensitive_cells().len(), 5);

    let outcome = protect(&model, SuppressSettings::default()).unwrap();
    assert_eq!(outcome.status, OutcomeStatus::Converged);
    assert!(outcome.fully_protected);
    assert_protected(&model, &outcome);
    assert!(outcome.pattern.count() > model.sensitive_cells().len());
}

#[test]
fn test_ten_by_ten_table_with_many_cuts() {
    let model = grid(10, 10, 13);
    let settings = SuppressSettings::default().with_starting_constraints(false);
    let outcome = protect(&model, settings).unwrap();

    assert_eq!(outcome.status, OutcomeStatus::Converged);
    assert_protected(&model, &outcome);
    assert!(outcome.stats.cuts_total >= model.sensitive_cells().len());
}
