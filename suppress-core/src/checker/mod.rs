//! Protection checking and feasibility cut generation.
//!
//! A check sweeps the sensitive cells twice: upper protection levels in
//! non-increasing order, then lower protection levels likewise. Each attacker
//! solve that falls short of a protection level yields one cut built from the
//! attacker LP's reduced costs:
//!
//! ```text
//! sum_j min(|d_j| * slack_j, P) * x_j >= P
//! ```
//!
//! where `slack_j` is the room above the nominal value of cell `j` when its
//! upper bound holds the attacker back, and the room below otherwise. At the
//! checked pattern the left-hand side is at most the attacker's reach, which
//! is below `P`, so the pattern violates its own cut.

mod witness;

pub use witness::WitnessBounds;

use suppress_lp::{OptimizationBackend, SimplexBackend};

use crate::attacker::{AttackDirection, AttackerEngine, AttackerSolution};
use crate::cuts::{CutSource, FeasibilityCut};
use crate::error::SuppressResult;
use crate::model::{AttackerBound, SuppressionPattern, TableModel};
use crate::settings::SuppressSettings;

/// Reduced costs and coefficients below this are treated as zero.
const COEF_EPS: f64 = 1e-9;

/// Which protection level failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectionSide {
    /// The attacker cannot push the cell far enough up.
    Upper,
    /// The attacker cannot push the cell far enough down.
    Lower,
}

/// One protection level not met by a pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    /// Sensitive cell index.
    pub cell: usize,

    /// Failed side.
    pub side: ProtectionSide,

    /// Value the attacker range had to reach.
    pub required: f64,

    /// Value the attacker range actually reaches.
    pub achieved: f64,
}

/// Result of checking one pattern.
#[derive(Debug, Clone, Default)]
pub struct CheckResult {
    /// Protection levels not met.
    pub violations: Vec<Violation>,

    /// One cut per violation.
    pub cuts: Vec<FeasibilityCut>,

    /// False if the sweep stopped early at the cut cap.
    pub complete: bool,

    /// Attacker LPs solved.
    pub solves: usize,

    /// Attacker LPs skipped thanks to witness bounds.
    pub skipped: usize,
}

impl CheckResult {
    /// True if every sensitive cell is protected.
    pub fn is_protected(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Protection checker wrapping a persistent attacker LP.
pub struct ProtectionChecker<B: OptimizationBackend = SimplexBackend> {
    attacker: AttackerEngine<B>,
    witnesses: WitnessBounds,
    upper_order: Vec<usize>,
    lower_order: Vec<usize>,
    max_cuts: usize,
    tol: f64,
}

impl ProtectionChecker<SimplexBackend> {
    /// Build a checker with the built-in simplex backend.
    pub fn new(model: &TableModel, settings: &SuppressSettings) -> SuppressResult<Self> {
        let attacker = AttackerEngine::new(model, settings.lp.clone())?;
        Ok(Self::with_attacker(
            model,
            attacker,
            settings.max_cuts_per_check,
            settings.protection_tol,
        ))
    }
}

impl<B: OptimizationBackend> ProtectionChecker<B> {
    /// Build a checker around an existing attacker engine.
    pub fn with_attacker(model: &TableModel, attacker: AttackerEngine<B>, max_cuts: usize, tol: f64) -> Self {
        let sensitive = model.sensitive_cells();

        let mut upper_order = sensitive.clone();
        upper_order.sort_by(|&a, &b| {
            model
                .cell(b)
                .upper_protection
                .total_cmp(&model.cell(a).upper_protection)
        });
        let mut lower_order = sensitive;
        lower_order.sort_by(|&a, &b| {
            model
                .cell(b)
                .lower_protection
                .total_cmp(&model.cell(a).lower_protection)
        });

        Self {
            attacker,
            witnesses: WitnessBounds::new(model),
            upper_order,
            lower_order,
            max_cuts,
            tol,
        }
    }

    /// Change the cut cap.
    pub fn set_max_cuts(&mut self, max_cuts: usize) {
        self.max_cuts = max_cuts.max(1);
    }

    /// Check `pattern` against every protection level.
    pub fn check(&mut self, model: &TableModel, pattern: &SuppressionPattern) -> SuppressResult<CheckResult> {
        self.attacker.apply_pattern(pattern)?;
        let kept = self.witnesses.rebase(pattern);

        let mut result = CheckResult {
            complete: true,
            ..CheckResult::default()
        };

        let sweeps = [
            (AttackDirection::Upper, self.upper_order.clone()),
            (AttackDirection::Lower, self.lower_order.clone()),
        ];
        'sweeps: for (direction, order) in sweeps {
            for c in order {
                if result.cuts.len() >= self.max_cuts {
                    result.complete = false;
                    break 'sweeps;
                }
                self.check_level(model, c, direction, &mut result)?;
            }
        }

        log::debug!(
            "check: {} suppressed, {} violations, {} solves, {} skipped (witnesses kept: {})",
            pattern.count(),
            result.violations.len(),
            result.solves,
            result.skipped,
            kept
        );
        Ok(result)
    }

    fn check_level(
        &mut self,
        model: &TableModel,
        c: usize,
        direction: AttackDirection,
        result: &mut CheckResult,
    ) -> SuppressResult<()> {
        let cell = model.cell(c);
        let (level, required, witnessed) = match direction {
            AttackDirection::Upper => {
                let required = cell.nominal + cell.upper_protection;
                (cell.upper_protection, required, self.witnesses.high(c) >= required - self.tol)
            }
            AttackDirection::Lower => {
                let required = cell.nominal - cell.lower_protection;
                (cell.lower_protection, required, self.witnesses.low(c) <= required + self.tol)
            }
        };
        if level <= 0.0 {
            return Ok(());
        }
        if witnessed {
            result.skipped += 1;
            return Ok(());
        }

        let sol = self.attacker.solve(c, direction)?;
        result.solves += 1;
        self.witnesses.observe(&sol.x);

        let short = match direction {
            AttackDirection::Upper => sol.value < required - self.tol,
            AttackDirection::Lower => sol.value > required + self.tol,
        };
        if short {
            let side = match direction {
                AttackDirection::Upper => ProtectionSide::Upper,
                AttackDirection::Lower => ProtectionSide::Lower,
            };
            result.cuts.push(feasibility_cut(model, &sol, level));
            result.violations.push(Violation {
                cell: c,
                side,
                required,
                achieved: sol.value,
            });
        }
        Ok(())
    }

    /// Exact attacker range of every suppressed cell; published cells get
    /// their nominal value.
    pub fn audit(&mut self, model: &TableModel, pattern: &SuppressionPattern) -> SuppressResult<Vec<AttackerBound>> {
        self.attacker.apply_pattern(pattern)?;
        let mut bounds = Vec::with_capacity(model.num_cells());
        for (j, cell) in model.cells().iter().enumerate() {
            if pattern.is_suppressed(j) {
                let lower = self.attacker.solve_min(j)?.value;
                let upper = self.attacker.solve_max(j)?.value;
                bounds.push(AttackerBound { lower, upper });
            } else {
                bounds.push(AttackerBound::exact(cell.nominal));
            }
        }
        Ok(bounds)
    }
}

/// Cut excluding the pattern an attacker solution was computed on.
pub fn feasibility_cut(model: &TableModel, sol: &AttackerSolution, level: f64) -> FeasibilityCut {
    let mut terms = Vec::new();
    for (j, &d) in sol.reduced_costs.iter().enumerate() {
        let cell = model.cell(j);
        if d.abs() <= COEF_EPS || cell.is_pinned_zero() {
            continue;
        }
        let upper_binding = match sol.direction {
            AttackDirection::Upper => d > 0.0,
            AttackDirection::Lower => d < 0.0,
        };
        let slack = if upper_binding {
            cell.up_slack()
        } else {
            cell.down_slack()
        };
        let coef = (d.abs() * slack).min(level);
        if coef > COEF_EPS {
            terms.push((j, coef));
        }
    }

    let source = match sol.direction {
        AttackDirection::Upper => CutSource::UpperProtection { cell: sol.target },
        AttackDirection::Lower => CutSource::LowerProtection { cell: sol.target },
    };
    FeasibilityCut::new(terms, level, source)
}

/// Publish suppressed non-sensitive cells whose attacker range has zero
/// width. Returns the number of cells published again.
///
/// Such a cell is determined by the published data, so publishing it leaves
/// every other attacker range unchanged.
pub fn prune_redundant(
    model: &TableModel,
    pattern: &mut SuppressionPattern,
    bounds: &mut [AttackerBound],
    tol: f64,
) -> usize {
    let mut removed = 0;
    for (j, cell) in model.cells().iter().enumerate() {
        if pattern.is_suppressed(j) && !cell.is_sensitive() && bounds[j].width() <= tol {
            pattern.set(j, false);
            bounds[j] = AttackerBound::exact(cell.nominal);
            removed += 1;
        }
    }
    if removed > 0 {
        log::info!("removed {} redundant suppressions", removed);
    }
    removed
}
