//! Dependency Graph
//!
//! This module implements the dependency graph that every domain keeps for
//! its signals, event streams and observers.
//!
//! # Overview
//!
//! The dependency graph is a directed acyclic graph (DAG) where:
//!
//! - Nodes represent signals, event streams or observers
//! - Edges point from a node to the nodes computed from it
//!
//! When a leaf changes, the propagation engine walks successor edges in
//! level order and re-evaluates only the nodes whose inputs actually changed.
//!
//! # Design Decisions
//!
//! 1. The graph is centralized per domain rather than spread across nodes:
//!    - levels for ordered evaluation live in one place
//!    - cycle detection is a plain reachability query
//!
//! 2. The graph is indexed by node ID for O(1) lookups.
//!
//! 3. Both predecessor and successor edges are kept. Successors drive
//!    propagation, predecessors drive levels.

mod dag;
mod node;
mod scheduler;
mod snapshot;

pub use dag::Graph;
pub use node::{Node, NodeId, NodeKind, Predecessors};
pub use scheduler::UpdateScheduler;
pub use snapshot::{GraphSnapshot, NodeSnapshot};
