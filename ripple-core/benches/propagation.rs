//! Propagation Benchmarks
//!
//! Measures one commit through a wide fan-out and through a deep chain, plus
//! a batched commit where most of the graph is skipped.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ripple_core::{Domain, Signal};

fn fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("fan_out");
    for width in [10usize, 100, 1000] {
        let domain = Domain::new("fan-out");
        let source = domain.make_var(0i64);
        let leaves: Vec<Signal<i64>> = (0..width as i64).map(|k| source.map(move |v| v + k)).collect();

        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |b, _| {
            let mut next = 0i64;
            b.iter(|| {
                next += 1;
                source.set(black_box(next));
            });
        });
        black_box(&leaves);
    }
    group.finish();
}

fn deep_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("deep_chain");
    for depth in [10usize, 100, 1000] {
        let domain = Domain::new("chain");
        let source = domain.make_var(0i64);
        let mut tail = source.signal();
        for _ in 0..depth {
            tail = tail.map(|v| v.wrapping_add(1));
        }

        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
            let mut next = 0i64;
            b.iter(|| {
                next += 1;
                source.set(black_box(next));
                black_box(tail.get())
            });
        });
    }
    group.finish();
}

fn equality_cutoff(c: &mut Criterion) {
    let domain = Domain::new("cutoff");
    let source = domain.make_var(0i64);
    let parity = source.map(|v| v % 2);
    let downstream: Vec<Signal<i64>> = (0..1000).map(|k| parity.map(move |p| p * k)).collect();

    c.bench_function("equality_cutoff", |b| {
        let mut next = 0i64;
        b.iter(|| {
            // Keep parity constant so only the first level is evaluated.
            next += 2;
            source.set(black_box(next));
        });
    });
    black_box(&downstream);
}

criterion_group!(benches, fan_out, deep_chain, equality_cutoff);
criterion_main!(benches);
