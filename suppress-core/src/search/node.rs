//! Search node representation.

/// A bound change from branching.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundChange {
    /// Variable index.
    pub var: usize,

    /// Previous lower bound.
    pub old_lb: f64,

    /// Previous upper bound.
    pub old_ub: f64,

    /// New lower bound.
    pub new_lb: f64,

    /// New upper bound.
    pub new_ub: f64,
}

impl BoundChange {
    /// Create a "down" branch: x <= floor(value).
    pub fn down_branch(var: usize, old_lb: f64, old_ub: f64, value: f64) -> Self {
        Self {
            var,
            old_lb,
            old_ub,
            new_lb: old_lb,
            new_ub: value.floor(),
        }
    }

    /// Create an "up" branch: x >= ceil(value).
    pub fn up_branch(var: usize, old_lb: f64, old_ub: f64, value: f64) -> Self {
        Self {
            var,
            old_lb,
            old_ub,
            new_lb: value.ceil(),
            new_ub: old_ub,
        }
    }

    /// Check if the bound change creates an empty domain.
    pub fn is_infeasible(&self) -> bool {
        self.new_lb > self.new_ub + 1e-9
    }
}

/// A node in the B&B search tree.
#[derive(Debug, Clone)]
pub struct SearchNode {
    /// Unique node identifier.
    pub id: u64,

    /// Parent node ID (None for root).
    pub parent_id: Option<u64>,

    /// Depth in the tree (0 for root).
    pub depth: usize,

    /// All bound changes from the root to this node.
    pub bound_changes: Vec<BoundChange>,

    /// Lower bound on the cost of any selection in this subtree.
    pub dual_bound: f64,
}

impl SearchNode {
    /// Create the root node.
    pub fn root() -> Self {
        Self {
            id: 0,
            parent_id: None,
            depth: 0,
            bound_changes: Vec::new(),
            dual_bound: f64::NEG_INFINITY,
        }
    }

    /// Create a child node from a bound change.
    pub fn child(&self, id: u64, bound_change: BoundChange) -> Self {
        let mut bound_changes = self.bound_changes.clone();
        bound_changes.push(bound_change);
        Self {
            id,
            parent_id: Some(self.id),
            depth: self.depth + 1,
            bound_changes,
            dual_bound: self.dual_bound, // Inherit parent's bound initially
        }
    }

    /// Check if a bound change left an empty domain.
    pub fn has_empty_domain(&self) -> bool {
        self.bound_changes.iter().any(BoundChange::is_infeasible)
    }

    /// Check if this node can be pruned by an incumbent.
    ///
    /// With integral costs the bound is rounded up first.
    pub fn can_prune(&self, incumbent_obj: f64, integral: bool) -> bool {
        let bound = if integral {
            (self.dual_bound - 1e-6).ceil()
        } else {
            self.dual_bound
        };
        bound >= incumbent_obj - 1e-9
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_node() {
        let root = SearchNode::root();
        assert_eq!(root.id, 0);
        assert!(root.parent_id.is_none());
        assert_eq!(root.depth, 0);
        assert!(root.bound_changes.is_empty());
    }

    #[test]
    fn test_child_accumulates_changes() {
        let root = SearchNode::root();
        let child = root.child(1, BoundChange::down_branch(0, 0.0, 1.0, 0.5));
        let grandchild = child.child(2, BoundChange::up_branch(3, 0.0, 1.0, 0.4));

        assert_eq!(child.parent_id, Some(0));
        assert_eq!(grandchild.depth, 2);
        assert_eq!(grandchild.bound_changes.len(), 2);
        assert_eq!(grandchild.bound_changes[1].var, 3);
        assert_eq!(grandchild.bound_changes[1].new_lb, 1.0);
    }

    #[test]
    fn test_bound_changes() {
        let down = BoundChange::down_branch(0, 0.0, 1.0, 0.3);
        assert_eq!((down.new_lb, down.new_ub), (0.0, 0.0));
        assert!(!down.is_infeasible());

        let up = BoundChange::up_branch(0, 0.0, 1.0, 0.3);
        assert_eq!((up.new_lb, up.new_ub), (1.0, 1.0));

        // Variable already pinned at one
        let bad = BoundChange::down_branch(0, 1.0, 1.0, 0.5);
        assert!(bad.is_infeasible());
    }

    #[test]
    fn test_pruning() {
        let mut node = SearchNode::root();
        node.dual_bound = 10.0;

        assert!(!node.can_prune(15.0, false));
        assert!(node.can_prune(10.0, false));

        // Integral costs: a bound of 10.2 means 11 at best
        node.dual_bound = 10.2;
        assert!(node.can_prune(11.0, true));
        assert!(!node.can_prune(11.0, false));
        node.dual_bound = 10.0;
        assert!(!node.can_prune(11.0, true));
    }
}
