//! Configuration settings for the suppression engine.

use suppress_lp::LpSettings;

use crate::error::{SuppressError, SuppressResult};

/// Branching variable selection rule for the master search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BranchingRule {
    /// Select the variable whose value is closest to 0.5.
    #[default]
    MostFractional,

    /// Use pseudocost estimates from previous branches.
    Pseudocost,
}

/// Node selection strategy for the master search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeSelection {
    /// Always select the node with the lowest dual bound.
    #[default]
    BestBound,

    /// Depth-first search (finds feasible selections quickly).
    DepthFirst,

    /// Depth-first until the first incumbent, then best-bound.
    TwoPhase,
}

/// Master selector (0/1 branch-and-bound) settings.
#[derive(Debug, Clone)]
pub struct MasterSettings {
    // === Termination criteria ===
    /// Maximum number of nodes per master solve.
    pub max_nodes: u64,

    /// Time limit per master solve in milliseconds (None = unlimited).
    pub time_limit_ms: Option<u64>,

    /// Relative optimality gap tolerance.
    pub gap_tol: f64,

    /// A variable counts as integral if |x - round(x)| <= int_feas_tol.
    pub int_feas_tol: f64,

    // === Search strategy ===
    /// Branching variable selection rule.
    pub branching_rule: BranchingRule,

    /// Node selection strategy.
    pub node_selection: NodeSelection,

    /// Round fractional relaxations up to find incumbents early.
    pub rounding_heuristic: bool,

    // === Output ===
    /// Log branch-and-bound progress.
    pub verbose: bool,

    /// Log frequency (every N nodes).
    pub log_freq: u64,
}

impl Default for MasterSettings {
    fn default() -> Self {
        Self {
            max_nodes: 100_000,
            time_limit_ms: None,
            gap_tol: 1e-6,
            int_feas_tol: 1e-6,
            branching_rule: BranchingRule::default(),
            node_selection: NodeSelection::default(),
            rounding_heuristic: true,
            verbose: false,
            log_freq: 100,
        }
    }
}

impl MasterSettings {
    /// Create settings with verbose output enabled.
    pub fn verbose() -> Self {
        Self {
            verbose: true,
            log_freq: 1,
            ..Self::default()
        }
    }

    /// Set time limit in seconds.
    pub fn with_time_limit(mut self, seconds: f64) -> Self {
        self.time_limit_ms = Some((seconds * 1000.0) as u64);
        self
    }

    /// Set maximum nodes.
    pub fn with_max_nodes(mut self, nodes: u64) -> Self {
        self.max_nodes = nodes;
        self
    }
}

/// Settings for the exact (lazy-cut) mode.
#[derive(Debug, Clone)]
pub struct ExactSettings {
    /// Time budget for the exact search in milliseconds (None = unlimited).
    pub time_limit_ms: Option<u64>,

    /// Maximum cuts produced per separation call.
    pub max_cuts_per_separation: usize,
}

impl Default for ExactSettings {
    fn default() -> Self {
        Self {
            time_limit_ms: Some(60_000),
            max_cuts_per_separation: 50,
        }
    }
}

impl ExactSettings {
    /// Set time budget in seconds.
    pub fn with_time_limit(mut self, seconds: f64) -> Self {
        self.time_limit_ms = Some((seconds * 1000.0) as u64);
        self
    }
}

/// Top-level suppression settings.
#[derive(Debug, Clone)]
pub struct SuppressSettings {
    // === Dive ===
    /// Growth factor for the enforced suppression count after a rejected
    /// pattern (>= 1.0).
    pub multiplier: f64,

    /// Maximum number of dive iterations.
    pub max_iterations: usize,

    /// Overall time limit for the dive in milliseconds (None = unlimited).
    pub time_limit_ms: Option<u64>,

    /// Keep cells suppressed once a rejected pattern suppressed them.
    pub dive_fixing: bool,

    // === Protection checking ===
    /// Maximum cuts generated per protection check.
    pub max_cuts_per_check: usize,

    /// Absolute tolerance when comparing attacker bounds to protection levels.
    pub protection_tol: f64,

    /// Seed the cut pool with relation-level protection and bridgeless cuts.
    pub starting_constraints: bool,

    /// Publish suppressed cells whose value the attacker can derive exactly.
    pub prune_redundant: bool,

    // === Sub-solvers ===
    /// Master search settings.
    pub master: MasterSettings,

    /// LP engine settings (attacker and master relaxations).
    pub lp: LpSettings,

    /// Run the exact mode after the dive.
    pub exact: Option<ExactSettings>,
}

impl Default for SuppressSettings {
    fn default() -> Self {
        Self {
            multiplier: 1.0,
            max_iterations: 1_000,
            time_limit_ms: None,
            dive_fixing: true,
            max_cuts_per_check: 50,
            protection_tol: 1e-6,
            starting_constraints: true,
            prune_redundant: true,
            master: MasterSettings::default(),
            lp: LpSettings::default(),
            exact: None,
        }
    }
}

impl SuppressSettings {
    /// Set the dive multiplier.
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Set the dive iteration limit.
    pub fn with_max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = iterations;
        self
    }

    /// Set the dive time limit in seconds.
    pub fn with_time_limit(mut self, seconds: f64) -> Self {
        self.time_limit_ms = Some((seconds * 1000.0) as u64);
        self
    }

    /// Enable or disable fixing rejected suppressions for the rest of the dive.
    pub fn with_dive_fixing(mut self, enabled: bool) -> Self {
        self.dive_fixing = enabled;
        self
    }

    /// Enable or disable starting constraints.
    pub fn with_starting_constraints(mut self, enabled: bool) -> Self {
        self.starting_constraints = enabled;
        self
    }

    /// Enable the exact mode.
    pub fn with_exact(mut self, exact: ExactSettings) -> Self {
        self.exact = Some(exact);
        self
    }

    /// Check that all values are in range.
    pub fn validate(&self) -> SuppressResult<()> {
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(SuppressError::InvalidSettings(format!(
                "multiplier must be a finite value >= 1.0, got {}",
                self.multiplier
            )));
        }
        if self.max_iterations == 0 {
            return Err(SuppressError::InvalidSettings(
                "max_iterations must be positive".to_string(),
            ));
        }
        if self.max_cuts_per_check == 0 {
            return Err(SuppressError::InvalidSettings(
                "max_cuts_per_check must be positive".to_string(),
            ));
        }
        if !self.protection_tol.is_finite() || self.protection_tol < 0.0 {
            return Err(SuppressError::InvalidSettings(format!(
                "protection_tol must be nonnegative, got {}",
                self.protection_tol
            )));
        }

        let m = &self.master;
        if m.max_nodes == 0 {
            return Err(SuppressError::InvalidSettings(
                "master.max_nodes must be positive".to_string(),
            ));
        }
        if !(0.0..0.5).contains(&m.int_feas_tol) {
            return Err(SuppressError::InvalidSettings(format!(
                "master.int_feas_tol must lie in [0, 0.5), got {}",
                m.int_feas_tol
            )));
        }
        if !m.gap_tol.is_finite() || m.gap_tol < 0.0 {
            return Err(SuppressError::InvalidSettings(format!(
                "master.gap_tol must be nonnegative, got {}",
                m.gap_tol
            )));
        }
        if m.log_freq == 0 {
            return Err(SuppressError::InvalidSettings(
                "master.log_freq must be positive".to_string(),
            ));
        }

        if let Some(exact) = &self.exact {
            if exact.max_cuts_per_separation == 0 {
                return Err(SuppressError::InvalidSettings(
                    "exact.max_cuts_per_separation must be positive".to_string(),
                ));
            }
        }
        Ok(())
    }
}
