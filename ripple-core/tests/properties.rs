//! Property tests over random layered graphs.
//!
//! Every derived node is a binary function of two earlier nodes, so node
//! order is a valid topological order and a from-scratch recomputation is a
//! single forward pass.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use proptest::prelude::*;
use proptest::sample::Index;
use ripple_core::{lift2, Domain, Signal, VarSignal};

#[derive(Debug, Clone, Copy)]
enum Op {
    Add,
    Sub,
    Mul,
    Max,
}

impl Op {
    fn apply(self, a: i64, b: i64) -> i64 {
        match self {
            Op::Add => a.wrapping_add(b),
            Op::Sub => a.wrapping_sub(b),
            Op::Mul => a.wrapping_mul(b),
            Op::Max => a.max(b),
        }
    }
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![Just(Op::Add), Just(Op::Sub), Just(Op::Mul), Just(Op::Max)]
}

struct Network {
    domain: Domain,
    vars: Vec<VarSignal<i64>>,
    nodes: Vec<Signal<i64>>,
    wiring: Vec<(usize, usize, Op)>,
    runs: Vec<Arc<AtomicUsize>>,
}

impl Network {
    fn build(leaves: &[i64], edges: &[(Index, Index, Op)]) -> Self {
        let domain = Domain::new("random-dag");
        let vars: Vec<VarSignal<i64>> = leaves.iter().map(|v| domain.make_var(*v)).collect();
        let mut nodes: Vec<Signal<i64>> = vars.iter().map(|v| v.signal()).collect();
        let mut wiring = Vec::new();
        let mut runs = Vec::new();

        for (left, right, op) in edges {
            let (l, r, op) = (left.index(nodes.len()), right.index(nodes.len()), *op);
            let count = Arc::new(AtomicUsize::new(0));
            let count_clone = count.clone();
            let node = lift2(&nodes[l], &nodes[r], move |a, b| {
                count_clone.fetch_add(1, Ordering::SeqCst);
                op.apply(*a, *b)
            });
            nodes.push(node);
            wiring.push((l, r, op));
            runs.push(count);
        }

        Self {
            domain,
            vars,
            nodes,
            wiring,
            runs,
        }
    }

    /// Values of every node computed directly from the leaves.
    fn expected(&self) -> Vec<i64> {
        let mut values: Vec<i64> = self.vars.iter().map(|v| v.get()).collect();
        for &(l, r, op) in &self.wiring {
            let value = op.apply(values[l], values[r]);
            values.push(value);
        }
        values
    }

    fn reset_runs(&self) {
        for count in &self.runs {
            count.store(0, Ordering::SeqCst);
        }
    }

    fn max_runs(&self) -> usize {
        self.runs
            .iter()
            .map(|count| count.load(Ordering::SeqCst))
            .max()
            .unwrap_or(0)
    }

    fn actual(&self) -> Vec<i64> {
        self.nodes.iter().map(|n| n.get()).collect()
    }
}

proptest! {
    #[test]
    fn batch_matches_recomputation(
        leaves in prop::collection::vec(-20i64..20, 1..6),
        edges in prop::collection::vec((any::<Index>(), any::<Index>(), arb_op()), 0..32),
        writes in prop::collection::vec((any::<Index>(), -20i64..20), 1..10),
    ) {
        let net = Network::build(&leaves, &edges);
        prop_assert_eq!(net.actual(), net.expected());
        net.reset_runs();

        net.domain.batch(|| {
            for (leaf, value) in &writes {
                net.vars[leaf.index(net.vars.len())].set(*value);
            }
        });

        prop_assert_eq!(net.domain.current_tick(), 1);
        prop_assert_eq!(net.actual(), net.expected());
        prop_assert!(net.max_runs() <= 1, "a node was evaluated {} times in one tick", net.max_runs());
    }

    #[test]
    fn single_writes_match_recomputation(
        leaves in prop::collection::vec(-20i64..20, 1..6),
        edges in prop::collection::vec((any::<Index>(), any::<Index>(), arb_op()), 1..32),
        writes in prop::collection::vec((any::<Index>(), -20i64..20), 1..10),
    ) {
        let net = Network::build(&leaves, &edges);

        for (leaf, value) in &writes {
            net.reset_runs();
            net.vars[leaf.index(net.vars.len())].set(*value);
            prop_assert_eq!(net.actual(), net.expected());
            prop_assert!(net.max_runs() <= 1);
        }
        prop_assert_eq!(net.domain.current_tick(), writes.len() as u64);
    }
}
