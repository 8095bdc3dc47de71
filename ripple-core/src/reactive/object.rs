//! Reactive Objects
//!
//! Aggregates that hold several named signals and observers as fields. The
//! fields are plain handles, so building the aggregate is ordinary struct
//! construction: each field is created from the fields initialized before it.
//!
//! ```rust
//! use ripple_core::{Domain, ObserverSet, ReactiveObject, Signal, VarSignal};
//!
//! struct Person {
//!     domain: Domain,
//!     age: VarSignal<i32>,
//!     health: Signal<i32>,
//!     wisdom: Signal<i32>,
//!     observers: ObserverSet,
//! }
//!
//! impl ReactiveObject for Person {
//!     fn domain(&self) -> &Domain {
//!         &self.domain
//!     }
//! }
//!
//! impl Person {
//!     fn new(domain: &Domain, age: i32) -> Self {
//!         let age = domain.make_var(age);
//!         let health = age.map(|a| 100 - a);
//!         let wisdom = (&age * &age).map(|sq| sq / 100);
//!         Self { domain: domain.clone(), age, health, wisdom, observers: ObserverSet::new() }
//!     }
//! }
//!
//! let domain = Domain::new("people");
//! let mut person = Person::new(&domain, 30);
//! let frail = person.health.below(25);
//! person.observers.add(frail.observe(|f| assert!(*f)));
//!
//! person.age.set(90);
//! assert_eq!(person.wisdom.get(), 81);
//! ```

use tracing::debug;

use super::domain::Domain;
use super::observer::Observer;
use super::signal::VarSignal;
use super::stream::EventSource;
use super::transaction::Transaction;

/// A struct whose fields are nodes of one domain.
///
/// Only `domain` must be provided. The other methods build members in that
/// domain.
pub trait ReactiveObject {
    fn domain(&self) -> &Domain;

    /// Create a variable member.
    fn make_var<T>(&self, initial: T) -> VarSignal<T>
    where
        T: Clone + PartialEq + Send + Sync + 'static,
    {
        self.domain().make_var(initial)
    }

    /// Create an event source member.
    fn make_event_source<E>(&self) -> EventSource<E>
    where
        E: Clone + Send + Sync + 'static,
    {
        self.domain().make_event_source()
    }

    /// Open a transaction on the object's domain, to update several members
    /// in one tick.
    fn transaction(&self) -> Transaction {
        self.domain().transaction()
    }
}

/// Owns a group of observers and detaches them together.
#[derive(Debug, Default)]
pub struct ObserverSet {
    observers: Vec<Observer>,
}

impl ObserverSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep `observer` attached for as long as the set lives.
    pub fn add(&mut self, observer: Observer) -> &mut Self {
        self.observers.push(observer);
        self
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Detach every observer in the set.
    pub fn detach_all(&mut self) {
        if self.observers.is_empty() {
            return;
        }
        debug!(count = self.observers.len(), "detaching observer set");
        for mut observer in self.observers.drain(..) {
            observer.detach();
        }
    }
}

impl Extend<Observer> for ObserverSet {
    fn extend<I: IntoIterator<Item = Observer>>(&mut self, iter: I) {
        self.observers.extend(iter);
    }
}

impl FromIterator<Observer> for ObserverSet {
    fn from_iter<I: IntoIterator<Item = Observer>>(iter: I) -> Self {
        Self {
            observers: iter.into_iter().collect(),
        }
    }
}

impl Drop for ObserverSet {
    fn drop(&mut self) {
        self.detach_all();
    }
}
