//! Branch-and-bound search over 0/1 suppression variables.

mod branching;
mod node;
mod queue;
mod tree;

pub use branching::{BranchDecision, BranchingSelector};
pub use node::{BoundChange, SearchNode};
pub use queue::NodeQueue;
pub use tree::{BranchAndBound, TreeStats};
