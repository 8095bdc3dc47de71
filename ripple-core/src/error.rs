//! Error type shared by the graph and the reactive layer.

use thiserror::Error;

use crate::graph::NodeId;
use crate::reactive::DomainId;

/// Contract violations and failures reported by the engine.
#[derive(Debug, Error)]
pub enum ReactError {
    /// A node was used with a domain it does not belong to.
    #[error("node belongs to domain {found}, but was used with domain {expected}")]
    CrossDomain { expected: DomainId, found: DomainId },

    /// Adding the edge `from -> to` would close a cycle.
    #[error("edge {from} -> {to} would create a cycle")]
    Cycle { from: NodeId, to: NodeId },

    /// The node is not part of the graph.
    #[error("node {0} is not part of the graph")]
    UnknownNode(NodeId),

    /// A node with this id already exists.
    #[error("node {0} already exists")]
    DuplicateNode(NodeId),

    /// A leaf was written while a tick was evaluating.
    #[error("write issued while node {node} was being evaluated")]
    ReentrantWrite { node: NodeId },

    /// A node was created while a tick was evaluating.
    #[error("graph mutated while node {node} was being evaluated")]
    MutationDuringTick { node: NodeId },

    /// Observer writes kept scheduling follow-up ticks.
    #[error("observer writes triggered more than {limit} follow-up ticks")]
    CascadeLimit { limit: usize },

    #[error("failed to serialize graph snapshot: {0}")]
    Serialization(#[from] serde_json::Error),
}
