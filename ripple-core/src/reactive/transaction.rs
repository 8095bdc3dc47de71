//! Transactions
//!
//! A transaction batches writes to leaves so they are propagated together in
//! a single tick. At most one transaction is open per domain; opening a scope
//! while one is open joins it, and only the scope that opened the
//! transaction commits it.
//!
//! Writes made outside any transaction open an implicit one-write
//! transaction and commit it immediately.

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, error, warn};

use super::context::EvalContext;
use super::domain::{Domain, DomainId};
use super::engine::Reactive;
use crate::error::ReactError;
use crate::graph::NodeId;

/// Where a domain is in its transaction lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    /// No transaction is open.
    Idle,
    /// A transaction is collecting writes.
    Open,
    /// A tick is evaluating nodes. Writes are rejected.
    Propagating,
    /// A tick is running observers. Writes are staged for a follow-up tick.
    Notifying,
}

pub(crate) struct TransactionState {
    pub(crate) phase: Phase,
    /// Leaves written since the last commit, in first-write order. Holding
    /// them here keeps them alive until the tick has applied the write.
    pub(crate) staged: IndexMap<NodeId, Arc<dyn Reactive>>,
}

impl TransactionState {
    pub(crate) fn new() -> Self {
        Self {
            phase: Phase::Idle,
            staged: IndexMap::new(),
        }
    }
}

impl Domain {
    /// Open a transaction scope.
    ///
    /// If a transaction is already open the returned guard joins it and
    /// committing is left to the outer scope.
    pub fn transaction(&self) -> Transaction {
        let owner = {
            let mut state = self.inner.state.lock();
            if state.phase == Phase::Idle {
                state.phase = Phase::Open;
                true
            } else {
                false
            }
        };

        if owner {
            debug!(domain = %self.name(), "transaction opened");
        } else {
            debug!(domain = %self.name(), "transaction joined");
        }

        Transaction {
            domain: self.clone(),
            owner,
            finished: false,
        }
    }

    /// Run `f` inside a transaction scope and commit when it returns.
    ///
    /// # Panics
    ///
    /// Panics if the commit violates an engine contract, see
    /// [`Transaction::commit`].
    pub fn batch<R>(&self, f: impl FnOnce() -> R) -> R {
        let tx = self.transaction();
        let result = f();
        drop(tx);
        result
    }

    /// Like [`Domain::batch`], but reports commit errors.
    pub fn try_batch<R>(&self, f: impl FnOnce() -> R) -> Result<R, ReactError> {
        let tx = self.transaction();
        let result = f();
        tx.commit()?;
        Ok(result)
    }

    /// Whether a transaction is open or a tick is running.
    pub fn in_transaction(&self) -> bool {
        self.inner.state.lock().phase != Phase::Idle
    }

    /// Stage a write to a leaf.
    ///
    /// `store` records the new value inside the leaf; it only runs once the
    /// write has been accepted. Commits right away if no transaction is open.
    pub(crate) fn stage_write(
        &self,
        owner: DomainId,
        leaf_id: NodeId,
        leaf: Arc<dyn Reactive>,
        store: impl FnOnce(),
    ) -> Result<(), ReactError> {
        if owner != self.id() {
            return Err(ReactError::CrossDomain {
                expected: self.id(),
                found: owner,
            });
        }
        if let Some(node) = EvalContext::current(self.id()) {
            return Err(ReactError::ReentrantWrite { node });
        }

        let commit_now = {
            let mut state = self.inner.state.lock();
            if state.phase == Phase::Propagating {
                return Err(ReactError::ReentrantWrite { node: leaf_id });
            }

            store();
            state.staged.insert(leaf_id, leaf);

            if state.phase == Phase::Idle {
                state.phase = Phase::Open;
                true
            } else {
                false
            }
        };

        if commit_now {
            self.commit()
        } else {
            Ok(())
        }
    }
}

/// Scope guard for a transaction.
///
/// Dropping the guard commits the transaction if this scope opened it. This
/// also happens when the scope is left by unwinding.
///
/// # Example
///
/// ```rust
/// use ripple_core::Domain;
///
/// let domain = Domain::new("tx");
/// let a = domain.make_var(1);
/// let b = domain.make_var(2);
/// let sum = &a + &b;
///
/// {
///     let _tx = domain.transaction();
///     a.set(10);
///     b.set(20);
///     // Nothing is visible until the scope ends.
///     assert_eq!(sum.get(), 3);
/// }
/// assert_eq!(sum.get(), 30);
/// ```
#[must_use = "dropping the transaction immediately commits it"]
pub struct Transaction {
    domain: Domain,
    owner: bool,
    finished: bool,
}

impl Transaction {
    /// Whether this scope opened the transaction and will commit it.
    pub fn is_owner(&self) -> bool {
        self.owner
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    /// Commit now instead of at the end of the scope.
    ///
    /// For a joined scope this does nothing; the outer scope commits.
    pub fn commit(mut self) -> Result<(), ReactError> {
        self.finish()
    }

    fn finish(&mut self) -> Result<(), ReactError> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;

        if !self.owner {
            return Ok(());
        }
        debug!(domain = %self.domain.name(), "transaction committing");
        self.domain.commit()
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        let unwinding = std::thread::panicking();
        if unwinding && self.owner && !self.finished {
            warn!(domain = %self.domain.name(), "committing transaction during unwind");
        }

        if let Err(err) = self.finish() {
            if unwinding {
                error!(domain = %self.domain.name(), error = %err, "transaction commit failed");
            } else {
                panic!("{err}");
            }
        }
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("domain", &self.domain.id())
            .field("owner", &self.owner)
            .field("finished", &self.finished)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outer_scope_owns_nested_scopes_join() {
        let domain = Domain::new("nested");
        assert!(!domain.in_transaction());

        let outer = domain.transaction();
        assert!(outer.is_owner());
        assert!(domain.in_transaction());

        let inner = domain.transaction();
        assert!(!inner.is_owner());
        drop(inner);
        assert!(domain.in_transaction());

        drop(outer);
        assert!(!domain.in_transaction());
    }

    #[test]
    fn writes_are_invisible_until_commit() {
        let domain = Domain::new("atomic");
        let a = domain.make_var(1);

        let tx = domain.transaction();
        a.set(5);
        assert_eq!(a.get(), 1);
        tx.commit().unwrap();

        assert_eq!(a.get(), 5);
    }

    #[test]
    fn nested_scope_does_not_commit_early() {
        let domain = Domain::new("nested-writes");
        let a = domain.make_var(0);

        let outer = domain.transaction();
        {
            let _inner = domain.transaction();
            a.set(7);
        }
        assert_eq!(a.get(), 0);
        drop(outer);
        assert_eq!(a.get(), 7);
    }

    #[test]
    fn empty_commit_runs_no_tick() {
        let domain = Domain::new("empty");
        domain.transaction().commit().unwrap();
        assert_eq!(domain.current_tick(), 0);
        assert!(!domain.in_transaction());
    }

    #[test]
    fn last_write_in_a_transaction_wins() {
        let domain = Domain::new("last-write");
        let a = domain.make_var(0);

        let result = domain.batch(|| {
            a.set(1);
            a.set(2);
            a.set(3);
            "done"
        });

        assert_eq!(result, "done");
        assert_eq!(a.get(), 3);
        assert_eq!(domain.current_tick(), 1);
    }

    #[test]
    fn scope_commits_when_unwinding() {
        let domain = Domain::new("unwind");
        let a = domain.make_var(0);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _tx = domain.transaction();
            a.set(9);
            panic!("early exit");
        }));

        assert!(result.is_err());
        assert_eq!(a.get(), 9);
        assert!(!domain.in_transaction());
    }

    #[test]
    fn try_batch_reports_success() {
        let domain = Domain::new("try-batch");
        let a = domain.make_var(1);
        let value = domain.try_batch(|| {
            a.set(4);
            a.get()
        });
        assert_eq!(value.unwrap(), 1);
        assert_eq!(a.get(), 4);
    }
}
