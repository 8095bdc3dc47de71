//! Event Streams
//!
//! An event stream carries discrete values. Unlike a signal it has no
//! current value: during a tick it holds the list of events emitted in that
//! tick, and the list is cleared when the tick ends.
//!
//! `EventSource` is the leaf kind, fed from outside with `emit`. Derived
//! streams are built with `merge`, `map`, `filter`, and from signals with
//! `Signal::monitor`. Streams turn back into signals with `fold` and `hold`.

use std::fmt::Debug;
use std::ops::{BitOr, Deref};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::abort_on;
use super::domain::Domain;
use super::engine::Reactive;
use super::signal::{eq_policy, Signal, Update};
use crate::error::ReactError;
use crate::graph::{NodeId, NodeKind, Predecessors};

pub(crate) enum StreamUpdate<E> {
    /// Leaf: events emitted in the open transaction.
    Source(Mutex<Vec<E>>),
    /// Rebuild the emission list from the predecessors.
    Derived(Box<dyn Fn() -> Vec<E> + Send + Sync>),
}

pub(crate) struct StreamNode<E> {
    id: NodeId,
    domain: Domain,
    emitted: RwLock<Vec<E>>,
    update: StreamUpdate<E>,
}

impl<E> StreamNode<E> {
    fn stage(&self, event: E) {
        if let StreamUpdate::Source(pending) = &self.update {
            pending.lock().push(event);
        }
    }
}

impl<E> Reactive for StreamNode<E>
where
    E: Send + Sync + 'static,
{
    fn evaluate(&self) -> bool {
        let events = match &self.update {
            StreamUpdate::Source(pending) => std::mem::take(&mut *pending.lock()),
            StreamUpdate::Derived(collect) => collect(),
        };
        let fired = !events.is_empty();
        *self.emitted.write() = events;
        fired
    }

    fn end_tick(&self) {
        self.emitted.write().clear();
    }

    fn discard(&self) {
        if let StreamUpdate::Source(pending) = &self.update {
            pending.lock().clear();
        }
    }
}

impl<E> Drop for StreamNode<E> {
    fn drop(&mut self) {
        self.domain.unregister(self.id);
    }
}

/// A handle to an event stream.
pub struct EventStream<E> {
    pub(crate) node: Arc<StreamNode<E>>,
}

impl<E> EventStream<E>
where
    E: Clone + Send + Sync + 'static,
{
    fn create(
        domain: &Domain,
        kind: NodeKind,
        predecessors: &[NodeId],
        update: StreamUpdate<E>,
    ) -> Result<Self, ReactError> {
        let node = Arc::new(StreamNode {
            id: domain.allocate(),
            domain: domain.clone(),
            emitted: RwLock::new(Vec::new()),
            update,
        });
        let handle: Arc<dyn Reactive> = node.clone();
        domain.attach(node.id, kind, predecessors, Arc::downgrade(&handle))?;
        Ok(Self { node })
    }

    pub(crate) fn derive<F>(domain: &Domain, predecessors: &[NodeId], collect: F) -> Self
    where
        F: Fn() -> Vec<E> + Send + Sync + 'static,
    {
        abort_on(Self::create(
            domain,
            NodeKind::EventStream,
            predecessors,
            StreamUpdate::Derived(Box::new(collect)),
        ))
    }

    /// Get the node's ID.
    pub fn id(&self) -> NodeId {
        self.node.id
    }

    /// The domain this stream belongs to.
    pub fn domain(&self) -> &Domain {
        &self.node.domain
    }

    /// Events emitted in the tick currently running. Always empty outside
    /// a tick.
    pub fn events(&self) -> Vec<E> {
        self.node.emitted.read().clone()
    }

    /// Merge with another stream of the same domain.
    ///
    /// Within a tick, this stream's events come before `other`'s.
    pub fn merge(&self, other: &EventStream<E>) -> EventStream<E> {
        merge([self.clone(), other.clone()])
    }

    /// Stream of `f` applied to every event.
    pub fn map<U, F>(&self, f: F) -> EventStream<U>
    where
        U: Clone + Send + Sync + 'static,
        F: Fn(&E) -> U + Send + Sync + 'static,
    {
        let source = self.clone();
        EventStream::derive(self.domain(), &[self.id()], move || {
            source.node.emitted.read().iter().map(&f).collect()
        })
    }

    /// Stream of the events for which `predicate` holds.
    pub fn filter<F>(&self, predicate: F) -> EventStream<E>
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        let source = self.clone();
        EventStream::derive(self.domain(), &[self.id()], move || {
            source
                .node
                .emitted
                .read()
                .iter()
                .filter(|event| predicate(*event))
                .cloned()
                .collect()
        })
    }

    /// Signal that starts at `seed` and applies `f` once per event, in
    /// emission order.
    ///
    /// The signal reports a change on every tick in which this stream fired,
    /// even if the accumulated value compares equal.
    pub fn fold<T, F>(&self, seed: T, f: F) -> Signal<T>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(T, &E) -> T + Send + Sync + 'static,
    {
        let source = self.clone();
        let step = move |current: &T| {
            let events = source.node.emitted.read();
            if events.is_empty() {
                return None;
            }
            Some(events.iter().fold(current.clone(), |acc, event| f(acc, event)))
        };

        abort_on(Signal::create(
            self.domain(),
            NodeKind::Signal,
            &[self.id()],
            seed,
            Update::Accumulate(Box::new(step)),
            None,
        ))
    }

    /// Signal holding the latest event, starting at `initial`.
    pub fn hold(&self, initial: E) -> Signal<E>
    where
        E: PartialEq,
    {
        let source = self.clone();
        let step = move |_: &E| source.node.emitted.read().last().cloned();

        abort_on(Signal::create(
            self.domain(),
            NodeKind::Signal,
            &[self.id()],
            initial,
            Update::Accumulate(Box::new(step)),
            eq_policy::<E>(),
        ))
    }
}

impl<E> Clone for EventStream<E> {
    fn clone(&self) -> Self {
        Self {
            node: Arc::clone(&self.node),
        }
    }
}

impl<E> Debug for EventStream<E>
where
    E: Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStream")
            .field("id", &self.node.id)
            .field("domain", &self.node.domain.id())
            .field("emitted", &*self.node.emitted.read())
            .finish()
    }
}

/// Merge several streams of one domain into one.
///
/// Within a tick the merged list is the concatenation of each operand's
/// events, in operand order.
///
/// # Panics
///
/// Panics if the streams belong to different domains or no stream is given.
pub fn merge<E, I>(streams: I) -> EventStream<E>
where
    E: Clone + Send + Sync + 'static,
    I: IntoIterator<Item = EventStream<E>>,
{
    let operands: Vec<EventStream<E>> = streams.into_iter().collect();
    let domain = match operands.first() {
        Some(first) => first.domain().clone(),
        None => panic!("merge needs at least one stream"),
    };
    for operand in &operands[1..] {
        abort_on(domain.ensure_same(operand.domain()));
    }

    let predecessors: Predecessors = operands.iter().map(|s| s.id()).collect();
    EventStream::derive(&domain, &predecessors, move || {
        let mut merged = Vec::new();
        for operand in &operands {
            merged.extend(operand.node.emitted.read().iter().cloned());
        }
        merged
    })
}

/// Fold `stream` into a signal. See [`EventStream::fold`].
pub fn fold<T, E, F>(seed: T, stream: &EventStream<E>, f: F) -> Signal<T>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
    F: Fn(T, &E) -> T + Send + Sync + 'static,
{
    stream.fold(seed, f)
}

/// Anything that can be used where an event stream is expected.
pub trait AsEventStream<E> {
    fn as_event_stream(&self) -> &EventStream<E>;
}

impl<E> AsEventStream<E> for EventStream<E> {
    fn as_event_stream(&self) -> &EventStream<E> {
        self
    }
}

impl<E> AsEventStream<E> for EventSource<E> {
    fn as_event_stream(&self) -> &EventStream<E> {
        &self.stream
    }
}

impl<'a, 'b, E, R> BitOr<&'b R> for &'a EventStream<E>
where
    E: Clone + Send + Sync + 'static,
    R: AsEventStream<E>,
{
    type Output = EventStream<E>;

    fn bitor(self, rhs: &'b R) -> EventStream<E> {
        self.merge(rhs.as_event_stream())
    }
}

impl<'a, 'b, E, R> BitOr<&'b R> for &'a EventSource<E>
where
    E: Clone + Send + Sync + 'static,
    R: AsEventStream<E>,
{
    type Output = EventStream<E>;

    fn bitor(self, rhs: &'b R) -> EventStream<E> {
        self.stream.merge(rhs.as_event_stream())
    }
}

/// A leaf stream fed from outside.
pub struct EventSource<E> {
    stream: EventStream<E>,
}

impl<E> EventSource<E>
where
    E: Clone + Send + Sync + 'static,
{
    /// Emit an event.
    ///
    /// Returns `self` so emits can be chained; outside a transaction every
    /// emit is its own tick.
    ///
    /// # Panics
    ///
    /// Panics when called from inside a recompute function, or when the
    /// resulting commit violates an engine contract.
    pub fn emit(&self, event: E) -> &Self {
        abort_on(self.try_emit(event));
        self
    }

    /// Emit an event, reporting contract violations.
    pub fn try_emit(&self, event: E) -> Result<(), ReactError> {
        self.stream.domain().register_emit(self, event)
    }

    /// Emit every event in `events` within a single transaction.
    pub fn emit_all(&self, events: impl IntoIterator<Item = E>) {
        self.stream.domain().batch(|| {
            for event in events {
                self.emit(event);
            }
        })
    }

    /// A handle to the stream without the ability to emit.
    pub fn stream(&self) -> EventStream<E> {
        self.stream.clone()
    }
}

impl<E> Deref for EventSource<E> {
    type Target = EventStream<E>;

    fn deref(&self) -> &EventStream<E> {
        &self.stream
    }
}

impl<E> Clone for EventSource<E> {
    fn clone(&self) -> Self {
        Self {
            stream: self.stream.clone(),
        }
    }
}

impl<E> Debug for EventSource<E>
where
    E: Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("EventSource").field(&self.stream).finish()
    }
}

impl<T> Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Stream that emits the new value every tick this signal changes.
    pub fn monitor(&self) -> EventStream<T> {
        let source = self.clone();
        EventStream::derive(self.domain(), &[self.id()], move || vec![source.get()])
    }
}

impl Domain {
    /// Create an event source.
    ///
    /// # Panics
    ///
    /// Panics when called from inside a recompute function.
    pub fn make_event_source<E>(&self) -> EventSource<E>
    where
        E: Clone + Send + Sync + 'static,
    {
        let stream = abort_on(EventStream::create(
            self,
            NodeKind::EventSource,
            &[],
            StreamUpdate::Source(Mutex::new(Vec::new())),
        ));
        EventSource { stream }
    }

    /// Stage an event on `source`.
    ///
    /// Same rules as [`Domain::register_write`]. Events staged in one
    /// transaction are emitted together, in order, in a single tick.
    pub fn register_emit<E>(&self, source: &EventSource<E>, event: E) -> Result<(), ReactError>
    where
        E: Clone + Send + Sync + 'static,
    {
        let node = &source.stream.node;
        let leaf: Arc<dyn Reactive> = node.clone();
        self.stage_write(node.domain.id(), node.id, leaf, || node.stage(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emissions_are_cleared_after_the_tick() {
        let domain = Domain::new("ephemeral");
        let source = domain.make_event_source::<i32>();

        source.emit(1).emit(2);
        assert!(source.events().is_empty());
        assert_eq!(domain.current_tick(), 2);
    }

    #[test]
    fn map_and_filter() {
        let domain = Domain::new("map-filter");
        let source = domain.make_event_source::<i32>();
        let evens = source.filter(|v| v % 2 == 0).map(|v| v * 10);
        let total = evens.fold(0, |acc, v| acc + v);

        source.emit_all(1..=6);
        assert_eq!(total.get(), 120);
    }

    #[test]
    fn filter_that_drops_everything_does_not_fire() {
        let domain = Domain::new("filter-none");
        let source = domain.make_event_source::<i32>();
        let none = source.filter(|_| false);
        let count = none.fold(0usize, |n, _| n + 1);

        source.emit(3);
        assert_eq!(count.get(), 0);
        let stats = domain.last_tick().unwrap();
        // source and filter evaluated, fold never scheduled
        assert_eq!(stats.evaluated, 2);
    }

    #[test]
    fn fold_applies_events_in_order() {
        let domain = Domain::new("fold-order");
        let chars = domain.make_event_source::<char>();
        let word = fold(String::new(), &chars, |mut s, c| {
            s.push(*c);
            s
        });

        chars.emit_all(['a', 'b', 'c']);
        assert_eq!(word.get(), "abc");
    }

    #[test]
    fn hold_keeps_latest_event() {
        let domain = Domain::new("hold");
        let source = domain.make_event_source::<&'static str>();
        let latest = source.hold("none");

        assert_eq!(latest.get(), "none");
        source.emit_all(["first", "second"]);
        assert_eq!(latest.get(), "second");
    }

    #[test]
    fn monitor_emits_on_change_only() {
        let domain = Domain::new("monitor");
        let var = domain.make_var(1);
        let changes = var.monitor();
        let seen = changes.fold(Vec::new(), |mut all, v| {
            all.push(*v);
            all
        });

        var.set(2);
        var.set(2);
        var.set(3);
        assert_eq!(seen.get(), vec![2, 3]);
    }

    #[test]
    fn merge_rejects_foreign_domain() {
        let a = Domain::new("a").make_event_source::<i32>();
        let b = Domain::new("b").make_event_source::<i32>();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            merge([a.stream(), b.stream()])
        }));
        assert!(result.is_err());
    }

    #[test]
    fn register_emit_rejects_foreign_domain() {
        let home = Domain::new("home");
        let away = Domain::new("away");
        let source = home.make_event_source::<u8>();

        let err = away.register_emit(&source, 1).unwrap_err();
        assert!(matches!(err, ReactError::CrossDomain { .. }));
    }
}
