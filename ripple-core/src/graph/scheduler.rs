//! Update Scheduler
//!
//! The scheduler determines the order in which affected nodes are evaluated
//! during a tick. It ensures that predecessors are always evaluated before
//! their successors.
//!
//! # Algorithm
//!
//! Every node has a level: leaves sit at 0, every other node one above its
//! highest predecessor. The scheduler is a worklist ordered by
//! `(level, NodeId)`:
//!
//! 1. The successors of every changed leaf are scheduled.
//! 2. The lowest entry is popped and evaluated.
//! 3. If the node changed, its successors are scheduled.
//! 4. Repeat until the worklist is empty.
//!
//! A successor always has a strictly higher level than the node that
//! scheduled it, so once a node is popped nothing can schedule it again in
//! the same tick. Each node is therefore evaluated at most once, after all of
//! its predecessors that changed.

use std::collections::BTreeSet;

use super::dag::Graph;
use super::node::NodeId;

/// Rank-ordered worklist for a single tick.
#[derive(Debug, Default)]
pub struct UpdateScheduler {
    queue: BTreeSet<(usize, NodeId)>,
}

impl UpdateScheduler {
    /// Create a new empty scheduler.
    pub fn new() -> Self {
        Self {
            queue: BTreeSet::new(),
        }
    }

    /// Schedule every successor of `node_id`.
    pub fn schedule_successors(&mut self, graph: &Graph, node_id: NodeId) {
        let Some(node) = graph.get(node_id) else {
            return;
        };
        for succ_id in node.successors() {
            if let Some(succ) = graph.get(*succ_id) {
                self.queue.insert((succ.level(), *succ_id));
            }
        }
    }

    /// Take the lowest ranked node.
    pub fn pop(&mut self) -> Option<NodeId> {
        self.queue.pop_first().map(|(_, id)| id)
    }

    /// Number of nodes waiting.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether nothing is scheduled.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
