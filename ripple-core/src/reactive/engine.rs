//! Propagation Engine
//!
//! Runs one tick ("pass") over the part of the graph affected by the leaves
//! staged in the committed transaction.
//!
//! # How a Tick Works
//!
//! 1. Staged leaves are applied in creation order. A variable only counts as
//!    changed if its new value differs from the old one; an event source
//!    changes if anything was emitted.
//!
//! 2. The successors of every changed node go into the `UpdateScheduler`,
//!    which hands them out ordered by `(level, NodeId)`.
//!
//! 3. Each scheduled node is evaluated exactly once. Signals recompute from
//!    their predecessors and compare with the old value (fold signals skip the
//!    comparison). Streams rebuild their emission list. Observers are only
//!    queued.
//!
//! 4. Once every level is final, queued observers fire in ascending
//!    `(level, NodeId)` order of their targets.
//!
//! 5. Emission lists are cleared and the transaction closes. Writes made by
//!    observers start a follow-up tick.
//!
//! Nodes that are not reachable from a changed node are never visited, and
//! nodes whose inputs did not change are never scheduled.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, debug_span, trace};

use super::context::EvalContext;
use super::domain::Domain;
use super::transaction::Phase;
use crate::error::ReactError;
use crate::graph::{NodeId, NodeKind, UpdateScheduler};

/// Evaluation interface implemented by every typed node.
pub(crate) trait Reactive: Send + Sync {
    /// Bring the node up to date for the current tick.
    ///
    /// Returns true if the node changed. Observers are never evaluated.
    fn evaluate(&self) -> bool;

    /// Called once the tick is over for every node evaluated in it.
    fn end_tick(&self) {}

    /// Run the side effect. Observers only.
    fn notify(&self) {}

    /// Forget a write that was staged but will never be applied. Leaves only.
    fn discard(&self) {}
}

/// Counters describing one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickStats {
    pub tick: u64,
    /// Leaves written in the transaction.
    pub sources: usize,
    /// Nodes evaluated, leaves included.
    pub evaluated: usize,
    /// Nodes that changed, leaves included.
    pub changed: usize,
    /// Observers fired.
    pub notified: usize,
}

/// Restores the domain if a user function unwinds through a tick.
struct TickGuard<'a> {
    domain: &'a Domain,
    touched: Vec<Arc<dyn Reactive>>,
    completed: bool,
}

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        if self.completed {
            return;
        }
        for node in &self.touched {
            node.end_tick();
        }

        let dropped = {
            let mut state = self.domain.inner.state.lock();
            state.phase = Phase::Idle;
            std::mem::take(&mut state.staged)
        };
        for leaf in dropped.values() {
            leaf.discard();
        }
        debug!(
            domain = %self.domain.name(),
            discarded = dropped.len(),
            "tick aborted, domain reset to idle"
        );
    }
}

impl Domain {
    /// Propagate all staged writes, then any writes observers made while
    /// firing, until nothing is left.
    pub(crate) fn commit(&self) -> Result<(), ReactError> {
        let limit = self.config().max_cascade;
        let mut round = 0usize;

        loop {
            let staged = {
                let mut state = self.inner.state.lock();
                let staged = std::mem::take(&mut state.staged);
                if staged.is_empty() {
                    state.phase = Phase::Idle;
                    return Ok(());
                }
                if round > limit {
                    state.phase = Phase::Idle;
                    drop(state);
                    for leaf in staged.values() {
                        leaf.discard();
                    }
                    return Err(ReactError::CascadeLimit { limit });
                }
                state.phase = Phase::Propagating;
                staged
            };

            self.propagate(staged);
            round += 1;
        }
    }

    /// Run a single tick.
    fn propagate(&self, mut sources: IndexMap<NodeId, Arc<dyn Reactive>>) {
        sources.sort_keys();

        let tick = self.inner.tick.fetch_add(1, Ordering::SeqCst) + 1;
        let span = debug_span!("tick", domain = %self.name(), tick);
        let _entered = span.enter();

        let mut stats = TickStats {
            tick,
            sources: sources.len(),
            ..TickStats::default()
        };
        let mut guard = TickGuard {
            domain: self,
            touched: Vec::with_capacity(sources.len()),
            completed: false,
        };
        let mut scheduler = UpdateScheduler::new();
        let mut observers = Vec::new();

        for (id, leaf) in sources {
            let changed = self.evaluate_node(id, leaf.as_ref());
            guard.touched.push(leaf);
            stats.evaluated += 1;
            if changed {
                stats.changed += 1;
                self.record_change(id, tick, &mut scheduler);
            }
        }

        while let Some(id) = scheduler.pop() {
            let Some((kind, node)) = self.lookup(id) else {
                continue;
            };

            if kind == NodeKind::Observer {
                if let Some(rank) = self.target_rank(id) {
                    observers.push((rank, node));
                }
                continue;
            }

            let changed = self.evaluate_node(id, node.as_ref());
            guard.touched.push(node);
            stats.evaluated += 1;
            if changed {
                stats.changed += 1;
                self.record_change(id, tick, &mut scheduler);
            }
        }

        self.inner.state.lock().phase = Phase::Notifying;

        // Stable, so observers of one target keep their creation order.
        observers.sort_by_key(|(rank, _)| *rank);
        for (_, observer) in &observers {
            observer.notify();
            stats.notified += 1;
        }
        for node in &guard.touched {
            node.end_tick();
        }
        guard.completed = true;

        *self.inner.last_tick.lock() = Some(stats);
        if self.config().trace_ticks {
            debug!(
                sources = stats.sources,
                evaluated = stats.evaluated,
                changed = stats.changed,
                notified = stats.notified,
                "tick complete"
            );
        }
    }

    fn evaluate_node(&self, id: NodeId, node: &dyn Reactive) -> bool {
        let _ctx = EvalContext::enter(self.id(), id);
        let changed = node.evaluate();
        trace!(node = %id, changed, "evaluated");
        changed
    }

    /// `(level, id)` of the node an observer is attached to.
    fn target_rank(&self, observer: NodeId) -> Option<(usize, NodeId)> {
        let registry = self.inner.registry.lock();
        let target = *registry.graph.get(observer)?.predecessors().first()?;
        Some((registry.graph.get(target)?.level(), target))
    }

    fn record_change(&self, id: NodeId, tick: u64, scheduler: &mut UpdateScheduler) {
        let mut registry = self.inner.registry.lock();
        if let Some(node) = registry.graph.get_mut(id) {
            node.mark_changed(tick);
        }
        scheduler.schedule_successors(&registry.graph, id);
    }
}
