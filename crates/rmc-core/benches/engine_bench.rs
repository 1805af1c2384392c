// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use rmc_core::action::MemoryOrder;
use rmc_core::api;
use rmc_core::atomic::Atomic;
use rmc_core::checker::Checker;
use rmc_core::clock::ClockVector;
use rmc_core::config::CheckerConfig;
use rmc_core::cyclegraph::CycleGraph;
use rmc_core::ids::{ActionId, ThreadId};
use std::sync::Arc;

/// Clock-vector merge is the hottest per-action operation in the engine:
/// every committed action merges at least one parent vector.
fn bench_clock_vector_merge(c: &mut Criterion) {
    c.bench_function("clock_vector_merge_16_threads", |b| {
        let a = ClockVector::new(None, ThreadId(15), 100);
        b.iter_batched(
            || ClockVector::new(None, ThreadId(0), 1),
            |mut target| {
                target.merge(black_box(&a));
                target
            },
            BatchSize::SmallInput,
        )
    });
}

/// Reachability is called on every candidate mo edge insertion
/// ([`rmc_core::execution`]'s read/write handling), so its cost scales
/// directly with the branching factor of the exploration.
fn bench_cyclegraph_reachability(c: &mut Criterion) {
    c.bench_function("cyclegraph_reachable_chain_64", |b| {
        let mut graph = CycleGraph::new();
        for i in 0..64u32 {
            graph.add_edge(ActionId(i), ActionId(i + 1));
        }
        b.iter(|| black_box(graph.reachable(ActionId(0), ActionId(64))))
    });
}

fn bench_cyclegraph_add_edge_no_cycle(c: &mut Criterion) {
    c.bench_function("cyclegraph_add_edge_linear_chain", |b| {
        b.iter_batched(
            CycleGraph::new,
            |mut graph| {
                for i in 0..64u32 {
                    graph.add_edge(ActionId(i), ActionId(i + 1));
                }
                graph
            },
            BatchSize::SmallInput,
        )
    });
}

/// End-to-end cost of the may-read-from search and mo-feasibility check
/// (`crate::execution::read`), exercised indirectly through a read that has
/// many candidate writes competing for its reads-from slot.
fn bench_read_with_many_candidate_writes(c: &mut Criterion) {
    c.bench_function("read_many_candidate_writes", |b| {
        b.iter(|| {
            let mut checker = Checker::new(CheckerConfig::default().with_step_bound(2_000));
            let report = checker.check(|| {
                let x = Arc::new(Atomic::new(0u32));
                let mut joins = Vec::new();
                for i in 0..8u32 {
                    let xi = x.clone();
                    joins.push(api::thread_create(move || {
                        xi.store(i, MemoryOrder::Relaxed);
                    }));
                }
                for j in joins {
                    api::thread_join(j);
                }
                let _ = x.load(MemoryOrder::Relaxed);
            });
            black_box(report.executions_explored)
        })
    });
}

criterion_group!(
    clock_benches,
    bench_clock_vector_merge,
);

criterion_group!(
    cyclegraph_benches,
    bench_cyclegraph_reachability,
    bench_cyclegraph_add_edge_no_cycle,
);

criterion_group!(engine_benches, bench_read_with_many_candidate_writes);

criterion_main!(clock_benches, cyclegraph_benches, engine_benches);
