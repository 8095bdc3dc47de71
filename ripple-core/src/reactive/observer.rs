//! Observer Implementation
//!
//! An observer is a sink node: it runs a side effect whenever its target
//! changed in a tick.
//!
//! # How Observers Work
//!
//! 1. `observe` wires a new observer node as the only successor edge it will
//!    ever have, from the target.
//!
//! 2. During a tick the engine queues the observer when the target changes,
//!    and fires all queued observers after every node has its final value.
//!
//! 3. An observer fires at most once per tick. Stream observers see the
//!    whole emission list of that tick in one firing.
//!
//! # Lifetime
//!
//! The returned [`Observer`] handle owns the observer node, and the node
//! owns a handle to its target, which keeps the target and everything it is
//! computed from alive. Dropping the handle or calling
//! [`Observer::detach`] removes the observer from the graph.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use super::abort_on;
use super::domain::Domain;
use super::engine::Reactive;
use super::signal::Signal;
use super::stream::EventStream;
use crate::graph::{NodeId, NodeKind};

pub(crate) struct ObserverNode {
    id: NodeId,
    domain: Domain,
    callback: Mutex<Box<dyn FnMut() + Send>>,
}

impl Reactive for ObserverNode {
    fn evaluate(&self) -> bool {
        false
    }

    fn notify(&self) {
        let mut callback = self.callback.lock();
        (*callback)();
    }
}

impl Drop for ObserverNode {
    fn drop(&mut self) {
        self.domain.unregister(self.id);
    }
}

/// Handle to an attached observer.
///
/// The observer stays attached for as long as the handle lives.
#[must_use = "dropping the handle detaches the observer"]
#[derive(Default)]
pub struct Observer {
    node: Option<Arc<ObserverNode>>,
    target: Option<NodeId>,
}

impl Observer {
    /// A handle that observes nothing.
    pub fn detached() -> Self {
        Self::default()
    }

    pub(crate) fn attach(domain: &Domain, target: NodeId, callback: Box<dyn FnMut() + Send>) -> Self {
        let node = Arc::new(ObserverNode {
            id: domain.allocate(),
            domain: domain.clone(),
            callback: Mutex::new(callback),
        });
        let handle: Arc<dyn Reactive> = node.clone();
        abort_on(domain.attach(node.id, NodeKind::Observer, &[target], Arc::downgrade(&handle)));
        debug!(domain = %domain.name(), observer = %node.id, target = %target, "observer attached");

        Self {
            node: Some(node),
            target: Some(target),
        }
    }

    /// Whether the observer is still part of the graph.
    pub fn is_attached(&self) -> bool {
        self.node.is_some()
    }

    /// The observed node, while attached.
    pub fn target(&self) -> Option<NodeId> {
        self.node.as_ref().and(self.target)
    }

    /// The observer's own node, while attached.
    pub fn id(&self) -> Option<NodeId> {
        self.node.as_ref().map(|node| node.id)
    }

    /// Remove the observer from the graph.
    ///
    /// No later tick invokes the callback. If a tick is currently firing
    /// observers and had already queued this one, it still fires for that
    /// tick.
    pub fn detach(&mut self) {
        if let Some(node) = self.node.take() {
            node.domain.unregister(node.id);
            debug!(domain = %node.domain.name(), observer = %node.id, "observer detached");
        }
    }
}

impl Drop for Observer {
    fn drop(&mut self) {
        self.detach();
    }
}

impl std::fmt::Debug for Observer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observer")
            .field("id", &self.id())
            .field("target", &self.target())
            .finish()
    }
}

impl<T> Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Call `f` with the new value at the end of every tick in which this
    /// signal changed.
    pub fn observe<F>(&self, mut f: F) -> Observer
    where
        F: FnMut(&T) + Send + 'static,
    {
        let target = self.clone();
        Observer::attach(
            self.domain(),
            self.id(),
            Box::new(move || {
                let value = target.get();
                f(&value);
            }),
        )
    }
}

impl<E> EventStream<E>
where
    E: Clone + Send + Sync + 'static,
{
    /// Call `f` once per tick with all events emitted in that tick.
    pub fn observe_batch<F>(&self, mut f: F) -> Observer
    where
        F: FnMut(&[E]) + Send + 'static,
    {
        let target = self.clone();
        Observer::attach(
            self.domain(),
            self.id(),
            Box::new(move || {
                let events = target.events();
                if !events.is_empty() {
                    f(&events);
                }
            }),
        )
    }

    /// Call `f` for every event, in emission order.
    pub fn observe<F>(&self, mut f: F) -> Observer
    where
        F: FnMut(&E) + Send + 'static,
    {
        self.observe_batch(move |events| events.iter().for_each(&mut f))
    }
}

/// Observe a signal. See [`Signal::observe`].
pub fn observe<T, F>(signal: &Signal<T>, f: F) -> Observer
where
    T: Clone + Send + Sync + 'static,
    F: FnMut(&T) + Send + 'static,
{
    signal.observe(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};

    #[test]
    fn observer_fires_once_per_change() {
        let domain = Domain::new("observer");
        let var = domain.make_var(0);
        let calls = Arc::new(AtomicI32::new(0));
        let calls_clone = calls.clone();

        let _obs = var.observe(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        var.set(1);
        var.set(1);
        var.set(2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn detach_stops_notifications() {
        let domain = Domain::new("detach");
        let var = domain.make_var(0);
        let calls = Arc::new(AtomicI32::new(0));
        let calls_clone = calls.clone();

        let mut obs = var.observe(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });
        assert!(obs.is_attached());
        assert_eq!(obs.target(), Some(var.id()));

        var.set(1);
        obs.detach();
        assert!(!obs.is_attached());
        assert_eq!(obs.target(), None);

        var.set(2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(var.get(), 2);
    }

    #[test]
    fn dropping_the_handle_detaches() {
        let domain = Domain::new("drop");
        let var = domain.make_var(0);
        let calls = Arc::new(AtomicI32::new(0));
        let calls_clone = calls.clone();

        let obs = var.observe(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(domain.node_count(), 2);
        drop(obs);
        assert_eq!(domain.node_count(), 1);

        var.set(5);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn observer_keeps_target_alive() {
        let domain = Domain::new("keepalive");
        let var = domain.make_var(1);
        let seen = Arc::new(AtomicI32::new(0));
        let seen_clone = seen.clone();

        let _obs = {
            let doubled = var.map(|v| v * 2);
            doubled.observe(move |v| seen_clone.store(*v, Ordering::SeqCst))
        };

        var.set(21);
        assert_eq!(seen.load(Ordering::SeqCst), 42);
    }

    #[test]
    fn detached_handle_is_inert() {
        let mut obs = Observer::detached();
        assert!(!obs.is_attached());
        assert_eq!(obs.id(), None);
        obs.detach();
    }
}
