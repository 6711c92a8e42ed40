//! Node priority queue for B&B tree exploration.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::SearchNode;
use crate::settings::NodeSelection;

/// Entry in the node queue with priority.
struct QueuedNode {
    node: SearchNode,
    priority: f64,  // Higher = selected first
    secondary: f64, // Tie-break, higher first
}

impl PartialEq for QueuedNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueuedNode {}

impl PartialOrd for QueuedNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Higher priority first, remaining ties to the older node
        self.priority
            .total_cmp(&other.priority)
            .then(self.secondary.total_cmp(&other.secondary))
            .then(other.node.id.cmp(&self.node.id))
    }
}

/// Priority queue for B&B nodes.
pub struct NodeQueue {
    /// Node selection strategy in effect.
    strategy: NodeSelection,

    /// Priority queue (max-heap by priority).
    heap: BinaryHeap<QueuedNode>,

    /// Count of nodes added.
    nodes_added: u64,

    /// Count of nodes popped.
    nodes_popped: u64,

    /// Best (lowest) dual bound in queue.
    best_bound: f64,
}

impl NodeQueue {
    /// Create a new node queue with the given strategy.
    ///
    /// `TwoPhase` starts out depth-first; see [`NodeQueue::incumbent_found`].
    pub fn new(strategy: NodeSelection) -> Self {
        Self {
            strategy,
            heap: BinaryHeap::new(),
            nodes_added: 0,
            nodes_popped: 0,
            best_bound: f64::INFINITY,
        }
    }

    /// Add a node to the queue.
    pub fn push(&mut self, node: SearchNode) {
        let (priority, secondary) = self.compute_priority(&node);

        if node.dual_bound < self.best_bound {
            self.best_bound = node.dual_bound;
        }

        self.heap.push(QueuedNode {
            node,
            priority,
            secondary,
        });
        self.nodes_added += 1;
    }

    /// Get the next node to process.
    pub fn pop(&mut self) -> Option<SearchNode> {
        let queued = self.heap.pop()?;
        self.nodes_popped += 1;
        self.recompute_best_bound();
        Some(queued.node)
    }

    /// Get the best (lowest) dual bound across all nodes.
    pub fn best_bound(&self) -> f64 {
        self.best_bound
    }

    /// Switch the strategy and reorder the open nodes.
    pub fn set_strategy(&mut self, strategy: NodeSelection) {
        if strategy == self.strategy {
            return;
        }
        self.strategy = strategy;
        let nodes: Vec<SearchNode> = self.heap.drain().map(|q| q.node).collect();
        for node in nodes {
            let (priority, secondary) = self.compute_priority(&node);
            self.heap.push(QueuedNode {
                node,
                priority,
                secondary,
            });
        }
    }

    /// Current strategy.
    pub fn strategy(&self) -> NodeSelection {
        self.strategy
    }

    /// Notify the queue of the first incumbent.
    pub fn incumbent_found(&mut self) {
        if self.strategy == NodeSelection::TwoPhase {
            self.set_strategy(NodeSelection::BestBound);
        }
    }

    /// Prune nodes that are dominated by the incumbent.
    ///
    /// Returns the number of pruned nodes.
    pub fn prune_by_bound(&mut self, incumbent_obj: f64, integral: bool) -> usize {
        let before = self.heap.len();

        let remaining: Vec<QueuedNode> = self
            .heap
            .drain()
            .filter(|q| !q.node.can_prune(incumbent_obj, integral))
            .collect();

        self.heap = remaining.into_iter().collect();
        self.recompute_best_bound();

        before - self.heap.len()
    }

    /// Check if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Get the number of nodes in the queue.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Get the total number of nodes added.
    pub fn total_added(&self) -> u64 {
        self.nodes_added
    }

    /// Get the total number of nodes popped.
    pub fn total_popped(&self) -> u64 {
        self.nodes_popped
    }

    /// Compute priority for a node based on selection strategy.
    fn compute_priority(&self, node: &SearchNode) -> (f64, f64) {
        match self.strategy {
            // Lowest dual bound first, deeper among equals
            NodeSelection::BestBound => (-node.dual_bound, node.depth as f64),
            // Deepest first, better bound among equals
            NodeSelection::DepthFirst | NodeSelection::TwoPhase => {
                (node.depth as f64, -node.dual_bound)
            }
        }
    }

    /// Recompute best bound after removal.
    fn recompute_best_bound(&mut self) {
        self.best_bound = self
            .heap
            .iter()
            .map(|q| q.node.dual_bound)
            .fold(f64::INFINITY, f64::min);
    }
}
