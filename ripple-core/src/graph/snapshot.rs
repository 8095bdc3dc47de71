//! Serializable view of a graph, for debugging and tooling.

use serde::{Deserialize, Serialize};

use super::dag::Graph;
use super::node::{NodeId, NodeKind};
use crate::error::ReactError;

/// One node as seen in a [`GraphSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub kind: NodeKind,
    pub level: usize,
    pub predecessors: Vec<NodeId>,
    pub successors: Vec<NodeId>,
    pub last_changed: u64,
}

/// Point-in-time copy of a domain's topology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    /// Name of the domain the graph belongs to.
    pub domain: String,
    /// Last completed tick.
    pub tick: u64,
    /// Nodes in creation order.
    pub nodes: Vec<NodeSnapshot>,
}

impl GraphSnapshot {
    pub(crate) fn capture(domain: &str, tick: u64, graph: &Graph) -> Self {
        let nodes = graph
            .nodes()
            .map(|node| NodeSnapshot {
                id: node.id(),
                kind: node.kind(),
                level: node.level(),
                predecessors: node.predecessors().to_vec(),
                successors: node.successors().iter().copied().collect(),
                last_changed: node.last_changed(),
            })
            .collect();

        Self {
            domain: domain.to_string(),
            tick,
            nodes,
        }
    }

    /// Look up a node by id.
    pub fn node(&self, id: NodeId) -> Option<&NodeSnapshot> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, ReactError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_round_trips_through_json() {
        let mut graph = Graph::new();
        graph.insert(NodeId::from(0), NodeKind::EventSource, &[]).unwrap();
        graph
            .insert(NodeId::from(1), NodeKind::Signal, &[NodeId::from(0)])
            .unwrap();
        graph.get_mut(NodeId::from(1)).unwrap().mark_changed(3);

        let snapshot = GraphSnapshot::capture("demo", 3, &graph);
        let json = snapshot.to_json().unwrap();
        assert!(json.contains("\"EventSource\""));

        let parsed: GraphSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, snapshot);

        let derived = parsed.node(NodeId::from(1)).unwrap();
        assert_eq!(derived.level, 1);
        assert_eq!(derived.last_changed, 3);
        assert_eq!(derived.predecessors, vec![NodeId::from(0)]);
    }
}
