//! Dive state machine.

use std::fmt;

/// State of the diving heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiveState {
    /// Nothing solved yet.
    Init,
    /// Alternating master and protection checks.
    Iterating,
    /// A fully protected pattern was found.
    Converged,
    /// The budget ran out, or the master could only repeat a rejected
    /// pattern.
    Exhausted,
}

impl DiveState {
    /// Whether the dive has stopped.
    pub fn is_terminal(self) -> bool {
        matches!(self, DiveState::Converged | DiveState::Exhausted)
    }

    /// Move to `next`; terminal states are final.
    pub fn advance(&mut self, next: DiveState) {
        if !self.is_terminal() {
            *self = next;
        }
    }
}

impl fmt::Display for DiveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiveState::Init => write!(f, "Init"),
            DiveState::Iterating => write!(f, "Iterating"),
            DiveState::Converged => write!(f, "Converged"),
            DiveState::Exhausted => write!(f, "Exhausted"),
        }
    }
}

/// Suppression count the next master solve must reach after a pattern with
/// `count` suppressions was rejected: `ceil(multiplier * count)`, capped at
/// the number of cells that can be suppressed at all.
pub fn next_min_count(count: usize, multiplier: f64, cap: usize) -> usize {
    let grown = (multiplier * count as f64 - 1e-9).ceil();
    (grown.max(count as f64) as usize).min(cap)
}

/// Next move of the dive after a rejected pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiveStep {
    /// Solve the master again with this suppression minimum.
    Continue(usize),
    /// Every suppressible cell is already in the pattern and no new cut
    /// excludes it, so the master would return it again.
    Stalled,
}

/// Decide how the dive goes on after a pattern with `count` suppressions
/// was rejected with `added` new cuts.
pub fn after_rejection(count: usize, added: usize, multiplier: f64, cap: usize) -> DiveStep {
    if added > 0 {
        DiveStep::Continue(next_min_count(count, multiplier, cap))
    } else if count >= cap {
        DiveStep::Stalled
    } else {
        // Nothing new excludes the pattern, so force growth
        DiveStep::Continue(count + 1)
    }
}
