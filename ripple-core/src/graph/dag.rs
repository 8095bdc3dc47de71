//! Graph Storage
//!
//! `Graph` owns the topology of one domain: nodes, predecessor/successor
//! edges and levels. It knows nothing about values.

use std::collections::HashSet;

use indexmap::IndexMap;

use super::node::{Node, NodeId, NodeKind};
use crate::error::ReactError;

/// The dependency graph of a single domain.
///
/// Nodes are kept in creation order, which is also `NodeId` order.
#[derive(Debug, Default)]
pub struct Graph {
    nodes: IndexMap<NodeId, Node>,
}

impl Graph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self {
            nodes: IndexMap::new(),
        }
    }

    /// Add a node wired as successor of every node in `predecessors`.
    ///
    /// Fails without touching the graph if the id is taken or a predecessor
    /// is missing.
    pub fn insert(
        &mut self,
        id: NodeId,
        kind: NodeKind,
        predecessors: &[NodeId],
    ) -> Result<(), ReactError> {
        if self.nodes.contains_key(&id) {
            return Err(ReactError::DuplicateNode(id));
        }
        if let Some(missing) = predecessors.iter().find(|p| !self.nodes.contains_key(*p)) {
            return Err(ReactError::UnknownNode(*missing));
        }

        self.nodes.insert(id, Node::new(id, kind));
        for &pred in predecessors {
            self.connect(pred, id)?;
        }
        Ok(())
    }

    /// Remove a node from the graph.
    ///
    /// Also removes all edges involving this node.
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<Node> {
        let node = self.nodes.shift_remove(&node_id)?;

        for pred_id in node.predecessors() {
            if let Some(pred) = self.nodes.get_mut(pred_id) {
                pred.remove_successor(node_id);
            }
        }

        for succ_id in node.successors() {
            if let Some(succ) = self.nodes.get_mut(succ_id) {
                succ.remove_predecessor(node_id);
            }
        }
        for succ_id in node.successors().clone() {
            self.relevel(succ_id);
        }

        Some(node)
    }

    /// Get a reference to a node.
    pub fn get(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    /// Get a mutable reference to a node.
    pub fn get_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&node_id)
    }

    /// Whether the graph contains `node_id`.
    pub fn contains(&self, node_id: NodeId) -> bool {
        self.nodes.contains_key(&node_id)
    }

    /// Add an edge: `to` is computed from `from`.
    ///
    /// Rejects edges that would close a cycle.
    pub fn connect(&mut self, from: NodeId, to: NodeId) -> Result<(), ReactError> {
        if !self.nodes.contains_key(&from) {
            return Err(ReactError::UnknownNode(from));
        }
        if !self.nodes.contains_key(&to) {
            return Err(ReactError::UnknownNode(to));
        }
        if from == to || self.reaches(to, from) {
            return Err(ReactError::Cycle { from, to });
        }

        if let Some(node) = self.nodes.get_mut(&to) {
            if !node.add_predecessor(from) {
                return Ok(());
            }
        }
        if let Some(node) = self.nodes.get_mut(&from) {
            node.add_successor(to);
        }
        self.relevel(to);
        Ok(())
    }

    /// Whether `target` can be reached from `start` along successor edges.
    pub fn reaches(&self, start: NodeId, target: NodeId) -> bool {
        let mut visited = HashSet::new();
        let mut stack = vec![start];

        while let Some(id) = stack.pop() {
            if id == target {
                return true;
            }
            if !visited.insert(id) {
                continue;
            }
            if let Some(node) = self.nodes.get(&id) {
                stack.extend(node.successors().iter().copied());
            }
        }
        false
    }

    /// Recompute the level of `start` from its predecessors and push the
    /// change down to successors.
    fn relevel(&mut self, start: NodeId) {
        let mut stack = vec![start];

        while let Some(id) = stack.pop() {
            let level = match self.nodes.get(&id) {
                Some(node) => node
                    .predecessors()
                    .iter()
                    .filter_map(|p| self.nodes.get(p))
                    .map(|p| p.level() + 1)
                    .max()
                    .unwrap_or(0),
                None => continue,
            };

            if let Some(node) = self.nodes.get_mut(&id) {
                if node.level() != level {
                    node.set_level(level);
                    stack.extend(node.successors().iter().copied());
                }
            }
        }
    }

    /// Iterate nodes in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get the total number of nodes in the graph.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u64) -> NodeId {
        NodeId::from(n)
    }

    /// width, height, depth -> area -> volume
    fn volume_graph() -> Graph {
        let mut graph = Graph::new();
        graph.insert(id(0), NodeKind::VarSignal, &[]).unwrap();
        graph.insert(id(1), NodeKind::VarSignal, &[]).unwrap();
        graph.insert(id(2), NodeKind::VarSignal, &[]).unwrap();
        graph.insert(id(3), NodeKind::Signal, &[id(0), id(1)]).unwrap();
        graph.insert(id(4), NodeKind::Signal, &[id(3), id(2)]).unwrap();
        graph
    }

    #[test]
    fn insert_wires_edges_and_levels() {
        let graph = volume_graph();

        assert_eq!(graph.len(), 5);
        let area = graph.get(id(3)).unwrap();
        assert_eq!(area.predecessors(), &[id(0), id(1)]);
        assert_eq!(area.level(), 1);
        assert_eq!(graph.get(id(4)).unwrap().level(), 2);
        assert!(graph.get(id(0)).unwrap().successors().contains(&id(3)));
    }

    #[test]
    fn insert_rejects_unknown_predecessor() {
        let mut graph = Graph::new();
        let err = graph.insert(id(1), NodeKind::Signal, &[id(0)]).unwrap_err();
        assert!(matches!(err, ReactError::UnknownNode(n) if n == id(0)));
        assert!(graph.is_empty());
    }

    #[test]
    fn insert_rejects_duplicate_id() {
        let mut graph = Graph::new();
        graph.insert(id(0), NodeKind::VarSignal, &[]).unwrap();
        let err = graph.insert(id(0), NodeKind::VarSignal, &[]).unwrap_err();
        assert!(matches!(err, ReactError::DuplicateNode(_)));
    }

    #[test]
    fn connect_rejects_cycles() {
        let mut graph = volume_graph();

        let err = graph.connect(id(4), id(3)).unwrap_err();
        assert!(matches!(err, ReactError::Cycle { from, to } if from == id(4) && to == id(3)));

        let err = graph.connect(id(3), id(3)).unwrap_err();
        assert!(matches!(err, ReactError::Cycle { .. }));

        // Graph unchanged.
        assert!(!graph.get(id(4)).unwrap().successors().contains(&id(3)));
    }

    #[test]
    fn connect_raises_levels_downstream() {
        let mut graph = volume_graph();
        graph.insert(id(5), NodeKind::Signal, &[id(2)]).unwrap();
        graph.insert(id(6), NodeKind::Signal, &[id(5)]).unwrap();
        assert_eq!(graph.get(id(6)).unwrap().level(), 2);

        graph.connect(id(4), id(5)).unwrap();
        assert_eq!(graph.get(id(5)).unwrap().level(), 3);
        assert_eq!(graph.get(id(6)).unwrap().level(), 4);
    }

    #[test]
    fn remove_node_drops_edges() {
        let mut graph = volume_graph();
        let removed = graph.remove_node(id(4)).unwrap();
        assert_eq!(removed.id(), id(4));

        assert_eq!(graph.len(), 4);
        assert!(!graph.get(id(3)).unwrap().successors().contains(&id(4)));
        assert!(!graph.get(id(2)).unwrap().successors().contains(&id(4)));
        assert!(graph.remove_node(id(4)).is_none());
    }

    #[test]
    fn reachability_is_limited_to_successors() {
        let graph = volume_graph();

        assert!(graph.reaches(id(0), id(4)));
        assert!(!graph.reaches(id(4), id(0)));
        // Depth only reaches volume, never area.
        assert!(graph.reaches(id(2), id(4)));
        assert!(!graph.reaches(id(2), id(3)));
    }
}
