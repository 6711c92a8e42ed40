//! Branch-and-bound tree controller.

use std::collections::HashMap;
use std::time::Instant;

use super::{BranchDecision, BranchingSelector, NodeQueue, SearchNode};
use crate::master::{IncumbentTracker, MasterSolution, MasterStatus};
use crate::model::SuppressionPattern;
use crate::settings::{MasterSettings, NodeSelection};

/// Branch recorded for a child until its relaxation is solved.
#[derive(Debug, Clone, Copy)]
struct PendingBranch {
    var: usize,
    value: f64,
    up: bool,
    parent_bound: f64,
}

/// Branch-and-bound tree controller.
///
/// Manages the node queue, incumbent, and termination. When a limit is hit
/// before any selection was found the tree keeps going depth-first for at
/// most another `max_nodes` nodes, since the caller needs a pattern.
pub struct BranchAndBound {
    /// Node queue.
    queue: NodeQueue,

    /// Branching variable selector.
    branching: BranchingSelector,

    /// Incumbent selection tracker.
    pub incumbent: IncumbentTracker,

    /// Next node ID to assign.
    next_node_id: u64,

    /// Total nodes explored.
    nodes_explored: u64,

    /// Nodes pruned.
    nodes_pruned: u64,

    /// Cuts added during the search.
    cuts_added: u64,

    /// Children whose branch feeds the pseudocosts.
    pending: HashMap<u64, PendingBranch>,

    /// Limit hit without incumbent, and nodes explored at that point.
    rescue: Option<(MasterStatus, u64)>,

    /// Costs are integral, so bounds may be rounded up.
    integral: bool,

    /// Time limit for this search.
    time_limit_ms: Option<u64>,

    /// Start time.
    start_time: Option<Instant>,

    /// Settings.
    settings: MasterSettings,
}

impl BranchAndBound {
    /// Create a new B&B controller.
    pub fn new(settings: &MasterSettings, weights: &[f64], time_limit_ms: Option<u64>) -> Self {
        let mut branching = BranchingSelector::new(settings.branching_rule, weights.len());
        branching.init_from_objective(weights);
        let integral = weights.iter().all(|w| w.fract() == 0.0);

        Self {
            queue: NodeQueue::new(settings.node_selection),
            branching,
            incumbent: IncumbentTracker::new(),
            next_node_id: 1, // 0 reserved for root
            nodes_explored: 0,
            nodes_pruned: 0,
            cuts_added: 0,
            pending: HashMap::new(),
            rescue: None,
            integral,
            time_limit_ms,
            start_time: None,
            settings: settings.clone(),
        }
    }

    /// Initialize with the root node.
    pub fn initialize(&mut self, root_bound: f64) {
        self.start_time = Some(Instant::now());

        let mut root = SearchNode::root();
        root.dual_bound = root_bound;
        self.queue.push(root);
    }

    /// Get the next node to process.
    pub fn next_node(&mut self) -> Option<SearchNode> {
        self.queue.pop()
    }

    /// Mark a node as explored.
    pub fn node_explored(&mut self) {
        self.nodes_explored += 1;
    }

    /// Record that a node was pruned.
    pub fn node_pruned(&mut self) {
        self.nodes_pruned += 1;
    }

    /// Record cuts added.
    pub fn cuts_added(&mut self, count: usize) {
        self.cuts_added += count as u64;
    }

    /// Whether a node's bound cannot beat the incumbent.
    pub fn can_prune(&self, node: &SearchNode) -> bool {
        self.incumbent.has_incumbent() && node.can_prune(self.incumbent.obj_val, self.integral)
    }

    /// Record the relaxation value of a solved node for pseudocosts.
    pub fn node_solved(&mut self, node: &SearchNode, obj: f64) {
        if let Some(p) = self.pending.remove(&node.id) {
            let change = obj - p.parent_bound;
            if p.up {
                self.branching.update_pseudocosts(p.var, p.value, None, Some(change));
            } else {
                self.branching.update_pseudocosts(p.var, p.value, Some(change), None);
            }
        }
    }

    /// Drop the pseudocost record of a node that was not solved.
    pub fn node_discarded(&mut self, node: &SearchNode) {
        self.pending.remove(&node.id);
    }

    /// Create child nodes from a branching decision.
    ///
    /// Returns the two child nodes (down, up).
    pub fn branch(&mut self, parent: &SearchNode, decision: BranchDecision) -> (SearchNode, SearchNode) {
        let down_id = self.next_node_id;
        let up_id = self.next_node_id + 1;
        self.next_node_id += 2;

        for (id, up) in [(down_id, false), (up_id, true)] {
            self.pending.insert(
                id,
                PendingBranch {
                    var: decision.var,
                    value: decision.value,
                    up,
                    parent_bound: parent.dual_bound,
                },
            );
        }

        let down_child = parent.child(down_id, decision.down_branch);
        let up_child = parent.child(up_id, decision.up_branch);

        (down_child, up_child)
    }

    /// Add a node to the queue.
    pub fn enqueue(&mut self, node: SearchNode) {
        if node.has_empty_domain() {
            self.nodes_pruned += 1;
            self.pending.remove(&node.id);
            return;
        }
        self.queue.push(node);
    }

    /// Select a branching variable.
    pub fn select_branching(&self, x: &[f64], lb: &[f64], ub: &[f64]) -> Option<BranchDecision> {
        self.branching.select(x, lb, ub, self.settings.int_feas_tol)
    }

    /// Update incumbent with a new selection.
    ///
    /// Returns true if incumbent was improved.
    pub fn update_incumbent(&mut self, x: &[f64], obj: f64) -> bool {
        let first = !self.incumbent.has_incumbent();
        let improved = self.incumbent.update(x, obj);

        if improved {
            if first {
                self.queue.incumbent_found();
            }
            let pruned = self.queue.prune_by_bound(obj, self.integral);
            self.nodes_pruned += pruned as u64;

            if self.settings.verbose {
                log::info!("New incumbent: cost={:.6e}, pruned {} nodes", obj, pruned);
            }
        }

        improved
    }

    /// Get the current optimality gap.
    pub fn gap(&self) -> f64 {
        self.incumbent.gap(self.queue.best_bound())
    }

    /// Get elapsed time in milliseconds.
    pub fn elapsed_ms(&self) -> u64 {
        self.start_time
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or(0)
    }

    /// Check if time limit is exceeded.
    pub fn time_limit_exceeded(&self) -> bool {
        match self.time_limit_ms {
            Some(limit) => self.elapsed_ms() >= limit,
            None => false,
        }
    }

    /// Check termination conditions.
    ///
    /// Returns Some(status) if we should terminate, None otherwise.
    pub fn check_termination(&mut self) -> Option<MasterStatus> {
        if let Some((status, at)) = self.rescue {
            if self.incumbent.has_incumbent() {
                return Some(status);
            }
            if self.queue.is_empty() {
                return Some(MasterStatus::Infeasible);
            }
            if self.nodes_explored - at >= self.settings.max_nodes {
                return Some(status);
            }
            return None;
        }

        // Queue empty: the search is complete
        if self.queue.is_empty() {
            return Some(if self.incumbent.has_incumbent() {
                MasterStatus::Optimal
            } else {
                MasterStatus::Infeasible
            });
        }

        let limit = if self.time_limit_exceeded() {
            Some(MasterStatus::TimeLimit)
        } else if self.nodes_explored >= self.settings.max_nodes {
            Some(MasterStatus::NodeLimit)
        } else {
            None
        };
        if let Some(status) = limit {
            if self.incumbent.has_incumbent() {
                return Some(status);
            }
            log::warn!(
                "master search hit {} after {} nodes without a selection; continuing depth-first",
                status,
                self.nodes_explored
            );
            self.rescue = Some((status, self.nodes_explored));
            self.queue.set_strategy(NodeSelection::DepthFirst);
            return None;
        }

        if self.incumbent.has_incumbent() && self.gap() <= self.settings.gap_tol {
            return Some(MasterStatus::GapLimit);
        }

        None
    }

    /// Finalize the search and return the selection.
    pub fn finalize(&self, status: MasterStatus) -> MasterSolution {
        let x = self.incumbent.solution.clone().unwrap_or_default();
        let bound = if status == MasterStatus::Optimal {
            self.incumbent.obj_val
        } else {
            self.queue.best_bound().min(self.incumbent.obj_val)
        };
        MasterSolution {
            status,
            pattern: SuppressionPattern::from_values(&x),
            objective: self.incumbent.obj_val,
            bound,
            gap: MasterSolution::compute_gap(self.incumbent.obj_val, bound),
            nodes_explored: self.nodes_explored,
            lazy_cuts: self.cuts_added,
            solve_time_ms: self.elapsed_ms(),
            incumbent_updates: self.incumbent.update_count,
        }
    }

    /// Log progress (if verbose).
    pub fn log_progress(&self) {
        if !self.settings.verbose || self.nodes_explored % self.settings.log_freq != 0 {
            return;
        }

        log::info!(
            "Nodes: {} ({} open) | Bound: {:.6e} | Incumbent: {:.6e} | Gap: {:.2}% | Cuts: {} | Time: {:.1}s",
            self.nodes_explored,
            self.queue.len(),
            self.queue.best_bound(),
            self.incumbent.obj_val,
            self.gap() * 100.0,
            self.cuts_added,
            self.elapsed_ms() as f64 / 1000.0,
        );
    }

    /// Get statistics for display.
    pub fn stats(&self) -> TreeStats {
        TreeStats {
            nodes_explored: self.nodes_explored,
            nodes_pruned: self.nodes_pruned,
            nodes_open: self.queue.len() as u64,
            cuts_added: self.cuts_added,
            incumbent_updates: self.incumbent.update_count,
            best_bound: self.queue.best_bound(),
            incumbent_obj: self.incumbent.obj_val,
            elapsed_ms: self.elapsed_ms(),
        }
    }
}

/// Statistics from the B&B tree.
#[derive(Debug, Clone)]
pub struct TreeStats {
    /// Nodes taken from the queue.
    pub nodes_explored: u64,
    /// Nodes discarded by bound or infeasibility.
    pub nodes_pruned: u64,
    /// Nodes still open.
    pub nodes_open: u64,
    /// Lazy cuts added.
    pub cuts_added: u64,
    /// Incumbent improvements.
    pub incumbent_updates: u64,
    /// Lowest open bound.
    pub best_bound: f64,
    /// Incumbent cost.
    pub incumbent_obj: f64,
    /// Elapsed time in milliseconds.
    pub elapsed_ms: u64,
}
