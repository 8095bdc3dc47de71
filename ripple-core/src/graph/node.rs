//! Graph Nodes
//!
//! This module defines the node types that live in the dependency graph.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Identifier of a node inside one domain.
///
/// Ids are handed out by a per-domain counter, so comparing two ids compares
/// their creation order. The propagation engine relies on this to break ties
/// between nodes of the same level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(u64);

impl NodeId {
    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl From<u64> for NodeId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The kind of node in the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    /// A mutable signal. Written from outside, never has predecessors.
    VarSignal,

    /// A signal computed from its predecessors.
    Signal,

    /// An event source. Events are pushed from outside.
    EventSource,

    /// An event stream derived from other streams or signals.
    EventStream,

    /// A sink that runs a side effect. Has exactly one predecessor and no successors.
    Observer,
}

impl NodeKind {
    /// Leaves are the only nodes external code may write to.
    pub fn is_leaf(&self) -> bool {
        matches!(self, NodeKind::VarSignal | NodeKind::EventSource)
    }

    /// Whether nodes of this kind carry a per-tick emission list.
    pub fn is_stream(&self) -> bool {
        matches!(self, NodeKind::EventSource | NodeKind::EventStream)
    }
}

/// Predecessor list. Most nodes have one or two inputs.
pub type Predecessors = SmallVec<[NodeId; 4]>;

/// A node in the dependency graph.
///
/// Only topology lives here. Values and recompute functions are owned by the
/// typed node handles in the `reactive` module.
#[derive(Debug, Clone)]
pub struct Node {
    /// Unique identifier for this node.
    id: NodeId,

    /// What kind of node this is.
    kind: NodeKind,

    /// Rank of the node: 0 for leaves, otherwise one more than the highest
    /// predecessor level.
    level: usize,

    /// Nodes this node is computed from, in operand order, without duplicates.
    predecessors: Predecessors,

    /// Nodes computed from this node, in insertion order.
    successors: IndexSet<NodeId>,

    /// Last tick in which this node changed. 0 means never.
    last_changed: u64,
}

impl Node {
    /// Create a new node with no edges.
    pub fn new(id: NodeId, kind: NodeKind) -> Self {
        Self {
            id,
            kind,
            level: 0,
            predecessors: Predecessors::new(),
            successors: IndexSet::new(),
            last_changed: 0,
        }
    }

    /// Get the node's ID.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Get the node's kind.
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Get the node's level.
    pub fn level(&self) -> usize {
        self.level
    }

    pub(crate) fn set_level(&mut self, level: usize) {
        self.level = level;
    }

    /// Tick in which this node last changed.
    pub fn last_changed(&self) -> u64 {
        self.last_changed
    }

    /// Record that the node changed in `tick`.
    pub fn mark_changed(&mut self, tick: u64) {
        self.last_changed = tick;
    }

    /// Whether the node changed in `tick`.
    pub fn changed_in(&self, tick: u64) -> bool {
        tick != 0 && self.last_changed == tick
    }

    /// Add a predecessor. Returns false if it was already present.
    pub fn add_predecessor(&mut self, node_id: NodeId) -> bool {
        if self.predecessors.contains(&node_id) {
            return false;
        }
        self.predecessors.push(node_id);
        true
    }

    /// Remove a predecessor.
    pub fn remove_predecessor(&mut self, node_id: NodeId) {
        self.predecessors.retain(|p| *p != node_id);
    }

    /// Get all predecessors, in operand order.
    pub fn predecessors(&self) -> &[NodeId] {
        &self.predecessors
    }

    /// Add a successor.
    pub fn add_successor(&mut self, node_id: NodeId) {
        self.successors.insert(node_id);
    }

    /// Remove a successor.
    pub fn remove_successor(&mut self, node_id: NodeId) {
        self.successors.shift_remove(&node_id);
    }

    /// Get all successors.
    pub fn successors(&self) -> &IndexSet<NodeId> {
        &self.successors
    }
}
