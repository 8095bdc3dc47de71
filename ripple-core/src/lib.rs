//! Ripple Core
//!
//! This crate provides a functional-reactive propagation engine.
//! It implements:
//!
//! - Reactive primitives (variables, derived signals, event streams, folds)
//! - Glitch-free, minimal propagation over a dependency graph
//! - Transactions that apply several writes in one atomic tick
//! - Observers fired once per tick with final values
//!
//! # Architecture
//!
//! The crate is organized into two modules:
//!
//! - `graph`: Dependency graph, levels and the update scheduler
//! - `reactive`: Domains, signals, streams, observers and the engine
//!
//! # Example
//!
//! ```rust
//! use ripple_core::Domain;
//! use std::sync::{Arc, Mutex};
//!
//! let domain = Domain::new("shapes");
//! let width = domain.make_var(60);
//! let height = domain.make_var(70);
//! let depth = domain.make_var(8);
//!
//! let area = &width * &height;
//! let volume = &area * &depth;
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let log = seen.clone();
//! let _obs = volume.observe(move |v| log.lock().unwrap().push(*v));
//!
//! domain.batch(|| {
//!     width.set(90);
//!     depth.set(80);
//! });
//!
//! assert_eq!(area.get(), 6300);
//! assert_eq!(*seen.lock().unwrap(), vec![504000]);
//! ```

pub mod graph;
pub mod reactive;

mod error;

pub use error::ReactError;
pub use reactive::{
    combine, fold, lift2, merge, observe, AsEventStream, AsSignal, Domain, DomainConfig,
    DomainId, EventSource, EventStream, Observer, ObserverSet, ReactiveObject, Signal,
    SignalPack, TickStats, Transaction, VarSignal,
};
