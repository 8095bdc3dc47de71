//! Reactive Domain
//!
//! A domain is one isolated dependency graph plus the engine that
//! propagates changes through it. Every node is created through exactly one
//! domain and can only be wired to nodes of the same domain.
//!
//! # How It Works
//!
//! 1. Creating a node allocates a `NodeId` from the domain counter and
//!    registers the node's topology in the domain graph, together with a
//!    weak handle to its typed implementation.
//!
//! 2. Writes to leaves are staged in the domain's transaction state.
//!
//! 3. Committing runs one tick over the affected part of the graph.
//!
//! 4. When the last handle to a node goes away, the node unregisters itself.
//!
//! The graph holds only weak handles. Ownership flows from derived nodes to
//! their inputs and from observers to their targets, so there are no
//! reference cycles through the domain.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::context::EvalContext;
use super::engine::{Reactive, TickStats};
use super::transaction::TransactionState;
use crate::error::ReactError;
use crate::graph::{Graph, GraphSnapshot, NodeId, NodeKind};

/// Process-wide unique identifier of a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DomainId(u64);

impl DomainId {
    /// Generate a new unique domain ID.
    pub fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "domain-{}", self.0)
    }
}

/// Settings of a domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainConfig {
    /// Label used in logs, errors and snapshots.
    pub name: String,

    /// How many follow-up ticks observer writes may trigger within a single
    /// commit before the commit fails with [`ReactError::CascadeLimit`].
    pub max_cascade: usize,

    /// Emit a `debug` summary for every tick.
    pub trace_ticks: bool,
}

impl DomainConfig {
    /// Default settings with the given name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_max_cascade(mut self, max_cascade: usize) -> Self {
        self.max_cascade = max_cascade;
        self
    }

    pub fn with_trace_ticks(mut self, trace_ticks: bool) -> Self {
        self.trace_ticks = trace_ticks;
        self
    }
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            max_cascade: 64,
            trace_ticks: true,
        }
    }
}

/// Topology plus the weak handles used to evaluate nodes.
pub(crate) struct Registry {
    pub(crate) graph: Graph,
    pub(crate) handles: HashMap<NodeId, Weak<dyn Reactive>>,
}

pub(crate) struct DomainInner {
    pub(crate) id: DomainId,
    pub(crate) config: DomainConfig,
    pub(crate) next_node: AtomicU64,
    pub(crate) tick: AtomicU64,
    pub(crate) registry: Mutex<Registry>,
    pub(crate) state: Mutex<TransactionState>,
    pub(crate) last_tick: Mutex<Option<TickStats>>,
}

/// Handle to a domain. Cloning is cheap and every clone refers to the same
/// graph.
///
/// # Example
///
/// ```rust
/// use ripple_core::Domain;
///
/// let domain = Domain::new("shapes");
/// let width = domain.make_var(60);
/// let height = domain.make_var(70);
/// let area = &width * &height;
///
/// assert_eq!(area.get(), 4200);
/// width.set(90);
/// assert_eq!(area.get(), 6300);
/// ```
#[derive(Clone)]
pub struct Domain {
    pub(crate) inner: Arc<DomainInner>,
}

impl Domain {
    /// Create a domain with default settings.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(DomainConfig::named(name))
    }

    /// Create a domain from a full configuration.
    pub fn with_config(config: DomainConfig) -> Self {
        let id = DomainId::next();
        debug!(domain = %config.name, id = %id, "domain created");

        Self {
            inner: Arc::new(DomainInner {
                id,
                config,
                next_node: AtomicU64::new(0),
                tick: AtomicU64::new(0),
                registry: Mutex::new(Registry {
                    graph: Graph::new(),
                    handles: HashMap::new(),
                }),
                state: Mutex::new(TransactionState::new()),
                last_tick: Mutex::new(None),
            }),
        }
    }

    pub fn id(&self) -> DomainId {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    pub fn config(&self) -> &DomainConfig {
        &self.inner.config
    }

    /// Number of live nodes, observers included.
    pub fn node_count(&self) -> usize {
        self.inner.registry.lock().graph.len()
    }

    /// Number of ticks run so far.
    pub fn current_tick(&self) -> u64 {
        self.inner.tick.load(Ordering::SeqCst)
    }

    /// Statistics of the most recent tick.
    pub fn last_tick(&self) -> Option<TickStats> {
        *self.inner.last_tick.lock()
    }

    /// Copy of the current topology.
    pub fn snapshot(&self) -> GraphSnapshot {
        let registry = self.inner.registry.lock();
        GraphSnapshot::capture(self.name(), self.current_tick(), &registry.graph)
    }

    /// Fail unless `other` is this domain.
    pub(crate) fn ensure_same(&self, other: &Domain) -> Result<(), ReactError> {
        if self.id() == other.id() {
            Ok(())
        } else {
            Err(ReactError::CrossDomain {
                expected: self.id(),
                found: other.id(),
            })
        }
    }

    pub(crate) fn allocate(&self) -> NodeId {
        NodeId::from(self.inner.next_node.fetch_add(1, Ordering::Relaxed))
    }

    /// Register a node's topology and evaluation handle.
    pub(crate) fn attach(
        &self,
        id: NodeId,
        kind: NodeKind,
        predecessors: &[NodeId],
        handle: Weak<dyn Reactive>,
    ) -> Result<(), ReactError> {
        if let Some(node) = EvalContext::current(self.id()) {
            return Err(ReactError::MutationDuringTick { node });
        }

        let mut registry = self.inner.registry.lock();
        registry.graph.insert(id, kind, predecessors)?;
        registry.handles.insert(id, handle);
        Ok(())
    }

    /// Remove a node and its edges. No-op for unknown ids.
    pub(crate) fn unregister(&self, id: NodeId) {
        let mut registry = self.inner.registry.lock();
        registry.handles.remove(&id);
        registry.graph.remove_node(id);
    }

    /// Kind and strong handle of a live node.
    pub(crate) fn lookup(&self, id: NodeId) -> Option<(NodeKind, Arc<dyn Reactive>)> {
        let registry = self.inner.registry.lock();
        let kind = registry.graph.get(id)?.kind();
        let handle = registry.handles.get(&id)?.upgrade()?;
        Some((kind, handle))
    }
}

impl PartialEq for Domain {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Domain {}

impl fmt::Debug for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Domain")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("node_count", &self.node_count())
            .field("tick", &self.current_tick())
            .finish()
    }
}

/// Declare a named, process-wide domain.
///
/// Expands to a unit struct whose associated functions are the entry point
/// for that domain's nodes.
///
/// ```rust
/// ripple_core::reactive_domain!(pub Shapes);
///
/// let side = Shapes::make_var(3);
/// let square = &side * &side;
/// assert_eq!(square.get(), 9);
/// assert_eq!(Shapes::domain().name(), "Shapes");
/// ```
#[macro_export]
macro_rules! reactive_domain {
    ($vis:vis $name:ident) => {
        #[allow(dead_code)]
        $vis struct $name;

        #[allow(dead_code)]
        impl $name {
            /// The domain instance, created on first use.
            pub fn domain() -> &'static $crate::Domain {
                static DOMAIN: ::std::sync::OnceLock<$crate::Domain> = ::std::sync::OnceLock::new();
                DOMAIN.get_or_init(|| $crate::Domain::new(stringify!($name)))
            }

            pub fn make_var<T>(initial: T) -> $crate::VarSignal<T>
            where
                T: Clone + PartialEq + Send + Sync + 'static,
            {
                Self::domain().make_var(initial)
            }

            pub fn make_event_source<E>() -> $crate::EventSource<E>
            where
                E: Clone + Send + Sync + 'static,
            {
                Self::domain().make_event_source()
            }

            pub fn transaction() -> $crate::Transaction {
                Self::domain().transaction()
            }
        }
    };
}
