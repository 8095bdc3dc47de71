//! Signal Implementation
//!
//! A signal is a value that changes over time. `VarSignal` is a leaf written
//! from outside; every other signal is derived from its predecessors and
//! recomputed by the engine.
//!
//! # How Signals Work
//!
//! 1. A derived signal computes its initial value eagerly, when it is
//!    created.
//!
//! 2. During a tick the engine re-evaluates the signal only if one of its
//!    inputs changed.
//!
//! 3. The new value replaces the old one, and the signal reports a change,
//!    only if the two differ. Fold signals skip the comparison and always
//!    report a change when their stream fired.
//!
//! # Memory Layout
//!
//! Each handle is an `Arc` to a node holding:
//! - The node id and its domain
//! - The value behind a `RwLock`
//! - The update rule, which owns handles to the predecessors

use std::fmt::Debug;
use std::ops::Deref;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::abort_on;
use super::domain::Domain;
use super::engine::Reactive;
use crate::error::ReactError;
use crate::graph::{NodeId, NodeKind};

/// Equality used to decide whether a recomputed value is a change.
pub(crate) type EqFn<T> = fn(&T, &T) -> bool;

pub(crate) fn eq_policy<T: PartialEq>() -> Option<EqFn<T>> {
    Some(<T as PartialEq>::eq)
}

pub(crate) enum Update<T> {
    /// Leaf: holds the value staged by the open transaction.
    Source(Mutex<Option<T>>),
    /// Recompute from the predecessors.
    Derived(Box<dyn Fn() -> T + Send + Sync>),
    /// Step from the current value. `None` means nothing to apply this tick.
    Accumulate(Box<dyn Fn(&T) -> Option<T> + Send + Sync>),
}

pub(crate) struct SignalNode<T> {
    id: NodeId,
    domain: Domain,
    value: RwLock<T>,
    update: Update<T>,
    eq: Option<EqFn<T>>,
}

impl<T> SignalNode<T> {
    fn store(&self, next: T) -> bool {
        let mut value = self.value.write();
        if let Some(eq) = self.eq {
            if eq(&*value, &next) {
                return false;
            }
        }
        *value = next;
        true
    }

    fn stage(&self, next: T) {
        if let Update::Source(pending) = &self.update {
            *pending.lock() = Some(next);
        }
    }
}

impl<T> Reactive for SignalNode<T>
where
    T: Send + Sync + 'static,
{
    fn evaluate(&self) -> bool {
        match &self.update {
            Update::Source(pending) => {
                let next = pending.lock().take();
                match next {
                    Some(next) => self.store(next),
                    None => false,
                }
            }
            Update::Derived(compute) => self.store(compute()),
            Update::Accumulate(step) => {
                let next = {
                    let current = self.value.read();
                    step(&*current)
                };
                match next {
                    Some(next) => self.store(next),
                    None => false,
                }
            }
        }
    }

    fn discard(&self) {
        if let Update::Source(pending) = &self.update {
            pending.lock().take();
        }
    }
}

impl<T> Drop for SignalNode<T> {
    fn drop(&mut self) {
        self.domain.unregister(self.id);
    }
}

/// A read handle to a signal.
///
/// Cloning the handle shares the node. The node lives as long as any handle
/// to it, any node derived from it, or any observer attached to it.
pub struct Signal<T> {
    pub(crate) node: Arc<SignalNode<T>>,
}

impl<T> Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Build a node and register it with `domain`.
    pub(crate) fn create(
        domain: &Domain,
        kind: NodeKind,
        predecessors: &[NodeId],
        initial: T,
        update: Update<T>,
        eq: Option<EqFn<T>>,
    ) -> Result<Self, ReactError> {
        let node = Arc::new(SignalNode {
            id: domain.allocate(),
            domain: domain.clone(),
            value: RwLock::new(initial),
            update,
            eq,
        });
        let handle: Arc<dyn Reactive> = node.clone();
        domain.attach(node.id, kind, predecessors, Arc::downgrade(&handle))?;
        Ok(Self { node })
    }

    /// Derived signal recomputed by `compute`, which must only read the
    /// signals listed in `predecessors`.
    pub(crate) fn derive<F>(
        domain: &Domain,
        predecessors: &[NodeId],
        eq: Option<EqFn<T>>,
        compute: F,
    ) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let initial = compute();
        abort_on(Self::create(
            domain,
            NodeKind::Signal,
            predecessors,
            initial,
            Update::Derived(Box::new(compute)),
            eq,
        ))
    }

    /// Get the current value.
    pub fn get(&self) -> T {
        self.node.value.read().clone()
    }

    /// Read the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&*self.node.value.read())
    }

    /// Get the node's ID.
    pub fn id(&self) -> NodeId {
        self.node.id
    }

    /// The domain this signal belongs to.
    pub fn domain(&self) -> &Domain {
        &self.node.domain
    }
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            node: Arc::clone(&self.node),
        }
    }
}

impl<T> Debug for Signal<T>
where
    T: Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.node.id)
            .field("domain", &self.node.domain.id())
            .field("value", &*self.node.value.read())
            .finish()
    }
}

/// A mutable leaf signal.
///
/// Writes are staged in the domain's transaction; outside a transaction
/// each write is committed immediately as its own tick.
pub struct VarSignal<T> {
    signal: Signal<T>,
}

impl<T> VarSignal<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Stage a new value.
    ///
    /// # Panics
    ///
    /// Panics when called from inside a recompute function, or when the
    /// resulting commit violates an engine contract.
    pub fn set(&self, value: T) {
        abort_on(self.try_set(value))
    }

    /// Stage a new value, reporting contract violations.
    pub fn try_set(&self, value: T) -> Result<(), ReactError> {
        self.signal.domain().register_write(self, value)
    }

    /// Stage a value derived from the latest one, including a value already
    /// staged in the open transaction.
    pub fn modify(&self, f: impl FnOnce(&mut T)) {
        let mut next = match &self.signal.node.update {
            Update::Source(pending) => pending.lock().clone(),
            _ => None,
        }
        .unwrap_or_else(|| self.signal.get());
        f(&mut next);
        self.set(next);
    }

    /// A read-only handle to the same node.
    pub fn signal(&self) -> Signal<T> {
        self.signal.clone()
    }
}

impl<T> Deref for VarSignal<T> {
    type Target = Signal<T>;

    fn deref(&self) -> &Signal<T> {
        &self.signal
    }
}

impl<T> Clone for VarSignal<T> {
    fn clone(&self) -> Self {
        Self {
            signal: self.signal.clone(),
        }
    }
}

impl<T> Debug for VarSignal<T>
where
    T: Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("VarSignal").field(&self.signal).finish()
    }
}

impl Domain {
    /// Create a mutable leaf signal.
    ///
    /// # Panics
    ///
    /// Panics when called from inside a recompute function.
    pub fn make_var<T>(&self, initial: T) -> VarSignal<T>
    where
        T: Clone + PartialEq + Send + Sync + 'static,
    {
        let signal = abort_on(Signal::create(
            self,
            NodeKind::VarSignal,
            &[],
            initial,
            Update::Source(Mutex::new(None)),
            eq_policy::<T>(),
        ));
        VarSignal { signal }
    }

    /// Stage a write to `var`.
    ///
    /// Fails with [`ReactError::CrossDomain`] if `var` belongs to another
    /// domain and with [`ReactError::ReentrantWrite`] if a tick is
    /// evaluating. Commits immediately if no transaction is open.
    pub fn register_write<T>(&self, var: &VarSignal<T>, value: T) -> Result<(), ReactError>
    where
        T: Clone + PartialEq + Send + Sync + 'static,
    {
        let node = &var.signal.node;
        let leaf: Arc<dyn Reactive> = node.clone();
        self.stage_write(node.domain.id(), node.id, leaf, || node.stage(value))
    }
}
