//! Reactive Primitives
//!
//! This module implements everything built on top of the dependency graph:
//! domains, signals, event streams, observers and the engine that keeps them
//! consistent.
//!
//! # Concepts
//!
//! ## Domains
//!
//! A `Domain` is an isolated graph with its own engine. Every node is created
//! through a domain and can only be wired to nodes of the same domain.
//!
//! ## Signals
//!
//! A Signal holds a value. `VarSignal` is written from outside, every other
//! signal is derived from its predecessors. A derived signal only reports a
//! change when its recomputed value differs from the previous one.
//!
//! ## Event Streams
//!
//! An EventStream carries the events of a single tick. Its emission list is
//! cleared once the tick is over. `fold` turns a stream back into a signal.
//!
//! ## Observers
//!
//! An Observer runs a side effect at the end of every tick in which its
//! target changed.
//!
//! # Implementation Notes
//!
//! Dependencies are explicit: every combinator lists its operands as
//! predecessors when it creates the node. A write stages the leaf in the
//! domain's transaction, and committing the transaction runs one tick that
//! visits the affected nodes in `(level, NodeId)` order.

mod context;
mod domain;
mod engine;
mod object;
mod observer;
mod ops;
mod signal;
mod stream;
mod transaction;

pub use domain::{Domain, DomainConfig, DomainId};
pub use engine::TickStats;
pub use object::{ObserverSet, ReactiveObject};
pub use observer::{observe, Observer};
pub use ops::{combine, lift2, AsSignal, SignalPack};
pub use signal::{Signal, VarSignal};
pub use stream::{fold, merge, AsEventStream, EventSource, EventStream};
pub use transaction::Transaction;

use crate::error::ReactError;

/// Unwrap the result of an infallible convenience, panicking with the
/// contract violation otherwise.
#[track_caller]
pub(crate) fn abort_on<T>(result: Result<T, ReactError>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => panic!("{err}"),
    }
}
