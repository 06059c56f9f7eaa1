//! Join benchmarks.
//!
//! Sort-merge join for equi and range predicates at different cluster counts.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use strata_bench::fixtures::Scale;
use strata_bench::harness::BenchContext;
use strata_core::operators::{JoinSortMerge, Operator};
use strata_core::ScanType;

fn bench_equi_join(c: &mut Criterion) {
    let mut group = c.benchmark_group("join/equi");
    let ctx = BenchContext::with_workers(Scale::Medium, 4);

    for cluster_count in [1, 2, 4, 8, 16] {
        group.bench_with_input(
            BenchmarkId::new("clusters", cluster_count),
            &cluster_count,
            |b, &cluster_count| {
                b.iter(|| {
                    let join = JoinSortMerge::new(
                        ctx.table("orders"),
                        ctx.table("customers"),
                        (1, 0),
                        ScanType::Equals,
                    )
                    .and_then(|join| join.with_cluster_count(cluster_count))
                    .unwrap();
                    black_box(Operator::new(join.into()).execute_tree().unwrap());
                });
            },
        );
    }

    group.finish();
}

fn bench_range_join(c: &mut Criterion) {
    let mut group = c.benchmark_group("join/range");
    // Range joins produce large outputs; keep inputs small.
    let ctx = BenchContext::with_workers(Scale::Tiny, 4);

    for cluster_count in [1, 4, 8] {
        group.bench_with_input(
            BenchmarkId::new("clusters", cluster_count),
            &cluster_count,
            |b, &cluster_count| {
                b.iter(|| {
                    let join = JoinSortMerge::new(
                        ctx.table("customers"),
                        ctx.table("orders"),
                        (0, 1),
                        ScanType::LessThan,
                    )
                    .and_then(|join| join.with_cluster_count(cluster_count))
                    .unwrap();
                    black_box(Operator::new(join.into()).execute_tree().unwrap());
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_equi_join, bench_range_join);
criterion_main!(benches);
