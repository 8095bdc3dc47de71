//! Evaluation Context
//!
//! Tracks which node the current thread is evaluating, per domain. The
//! write and construction paths consult it to reject re-entrant writes and
//! graph mutation from inside recompute functions.
//!
//! # Implementation
//!
//! A thread-local stack of `(domain, node)` entries. The engine pushes an
//! entry around every `evaluate` call and the returned guard pops it, also
//! during unwinding.

use std::cell::RefCell;

use super::domain::DomainId;
use crate::graph::NodeId;

thread_local! {
    static EVAL_STACK: RefCell<Vec<ContextEntry>> = const { RefCell::new(Vec::new()) };
}

#[derive(Debug, Clone, Copy)]
struct ContextEntry {
    domain: DomainId,
    node: NodeId,
}

/// Guard that pops the context when dropped.
pub(crate) struct EvalContext {
    domain: DomainId,
    node: NodeId,
}

impl EvalContext {
    /// Mark `node` of `domain` as being evaluated on this thread until the
    /// guard is dropped.
    pub(crate) fn enter(domain: DomainId, node: NodeId) -> Self {
        EVAL_STACK.with(|stack| {
            stack.borrow_mut().push(ContextEntry { domain, node });
        });

        Self { domain, node }
    }

    /// The innermost node of `domain` being evaluated on this thread, if any.
    pub(crate) fn current(domain: DomainId) -> Option<NodeId> {
        EVAL_STACK.with(|stack| {
            stack
                .borrow()
                .iter()
                .rev()
                .find(|entry| entry.domain == domain)
                .map(|entry| entry.node)
        })
    }

}

impl Drop for EvalContext {
    fn drop(&mut self) {
        EVAL_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();

            if let Some(entry) = popped {
                debug_assert!(
                    entry.domain == self.domain && entry.node == self.node,
                    "EvalContext mismatch: expected {} in {}, got {} in {}",
                    self.node,
                    self.domain,
                    entry.node,
                    entry.domain
                );
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_tracks_node_per_domain() {
        let a = DomainId::next();
        let b = DomainId::next();
        let node = NodeId::from(3);

        assert_eq!(EvalContext::current(a), None);

        {
            let _ctx = EvalContext::enter(a, node);
            assert_eq!(EvalContext::current(a), Some(node));
            assert_eq!(EvalContext::current(b), None);
        }

        assert_eq!(EvalContext::current(a), None);
    }

    #[test]
    fn nested_contexts() {
        let a = DomainId::next();
        let b = DomainId::next();

        let _outer = EvalContext::enter(a, NodeId::from(1));
        {
            let _inner = EvalContext::enter(b, NodeId::from(2));
            assert_eq!(EvalContext::current(a), Some(NodeId::from(1)));
            assert_eq!(EvalContext::current(b), Some(NodeId::from(2)));
        }
        assert_eq!(EvalContext::current(b), None);
        assert_eq!(EvalContext::current(a), Some(NodeId::from(1)));
    }

    #[test]
    fn guard_pops_on_unwind() {
        let domain = DomainId::next();
        let result = std::panic::catch_unwind(|| {
            let _ctx = EvalContext::enter(domain, NodeId::from(5));
            panic!("recompute failed");
        });

        assert!(result.is_err());
        assert_eq!(EvalContext::current(domain), None);
    }
}
