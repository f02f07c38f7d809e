//! Benchmarks for spreading-activation recall over the graph store.
//!
//! Run with: cargo bench --package spomen-core activation

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use spomen_core::{
    spread, ActivationConfig, GraphStore, MemoryEdge, MemoryNode, MemorySpace, NodeKind,
};

const T0: i64 = 1_700_000_000;

fn memory_id(n: u64) -> String {
    format!("m{n}")
}

/// Ring of `num_nodes` facts where each node points at its next `fanout`
/// successors.
fn ring_store(num_nodes: u64, fanout: u64) -> GraphStore {
    let store = GraphStore::new();
    for n in 0..num_nodes {
        store.upsert_node(MemoryNode::new(
            memory_id(n),
            MemorySpace::Work,
            NodeKind::Fact,
            format!("fact {n}"),
            T0,
        ));
    }
    for n in 0..num_nodes {
        for i in 0..fanout {
            let target = (n + i + 1) % num_nodes;
            let edge = MemoryEdge::new(
                memory_id(n),
                memory_id(target),
                MemorySpace::Work,
                "related_to",
                0.6,
                T0,
            )
            .expect("valid weight");
            store.upsert_edge(edge).expect("endpoints present");
        }
    }
    store
}

fn config(max_hops: u32) -> ActivationConfig {
    ActivationConfig {
        max_hops,
        decay_per_hop: 0.9,
        epsilon: 0.05,
        top_k: 8,
    }
}

fn bench_spread_by_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("spread/fanout");

    for fanout in [4, 8, 16] {
        let store = ring_store(1_000, fanout);
        let cfg = config(2);

        group.bench_with_input(BenchmarkId::new("fanout", fanout), &fanout, |b, _| {
            b.iter(|| black_box(spread(&store, MemorySpace::Work, &["m0"], &cfg)));
        });
    }
    group.finish();
}

fn bench_spread_by_hops(c: &mut Criterion) {
    let mut group = c.benchmark_group("spread/max_hops");
    let store = ring_store(1_000, 8);

    for hops in [1, 2, 3] {
        let cfg = config(hops);

        group.bench_with_input(BenchmarkId::new("hops", hops), &hops, |b, _| {
            b.iter(|| black_box(spread(&store, MemorySpace::Work, &["m0"], &cfg)));
        });
    }
    group.finish();
}

fn bench_spread_multi_seed(c: &mut Criterion) {
    let mut group = c.benchmark_group("spread/seeds");
    let store = ring_store(1_000, 8);
    let cfg = config(2);

    let single = ["m0"];
    let quad = ["m0", "m250", "m500", "m750"];

    group.bench_function("1", |b| {
        b.iter(|| black_box(spread(&store, MemorySpace::Work, &single, &cfg)));
    });
    group.bench_function("4", |b| {
        b.iter(|| black_box(spread(&store, MemorySpace::Work, &quad, &cfg)));
    });
    group.finish();
}

fn bench_upsert_edge(c: &mut Criterion) {
    c.bench_function("GraphStore::upsert_edge", |b| {
        let store = ring_store(1_000, 1);
        let mut n = 0u64;

        b.iter(|| {
            let edge = MemoryEdge::new(
                memory_id(n % 1_000),
                memory_id((n + 3) % 1_000),
                MemorySpace::Work,
                "bench",
                0.5,
                T0,
            )
            .expect("valid weight");
            store.upsert_edge(edge).expect("endpoints present");
            n += 1;
        });
    });
}

fn bench_neighbors(c: &mut Criterion) {
    let mut group = c.benchmark_group("GraphStore::neighbors");

    for fanout in [5, 10, 50] {
        let store = ring_store(1_000, fanout);

        group.bench_with_input(BenchmarkId::new("fanout", fanout), &fanout, |b, _| {
            b.iter(|| black_box(store.neighbors("m42", MemorySpace::Work)));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_spread_by_fanout,
    bench_spread_by_hops,
    bench_spread_multi_seed,
    bench_upsert_edge,
    bench_neighbors,
);
criterion_main!(benches);
