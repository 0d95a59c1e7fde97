//! Oracle Operations Benchmarks
//!
//! Benchmarks for folding actions through the oracle and diffing observations.
//!
//! Run with: `cargo bench --bench oracle_ops`

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use todoprobe::adapter::Observation;
use todoprobe::scenario::catalog;
use todoprobe::{Action, Filter, Oracle};

fn mixed_actions(n: usize) -> Vec<Action> {
    (0..n)
        .map(|i| match i % 6 {
            0 | 1 => Action::add(format!("item {i}")),
            2 => Action::toggle(0),
            3 => Action::filter(Filter::ALL[i % 3]),
            4 => Action::edit(0, format!("  edited {i}  ")),
            _ => Action::filter(Filter::All),
        })
        .collect()
}

fn bench_oracle_fold(c: &mut Criterion) {
    let mut group = c.benchmark_group("oracle_fold");

    for count in [10, 100, 1000] {
        let actions = mixed_actions(count);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{count}_actions")),
            &actions,
            |bench, actions| {
                bench.iter(|| {
                    let mut oracle = Oracle::new();
                    for action in actions {
                        let _ = black_box(oracle.apply(action));
                    }
                    black_box(oracle);
                });
            },
        );
    }

    group.finish();
}

fn bench_catalog(c: &mut Criterion) {
    let scenarios = catalog();
    c.bench_function("catalog_projections", |bench| {
        bench.iter(|| {
            for scenario in &scenarios {
                let projections = Oracle::new().run(&scenario.actions);
                let _ = black_box(projections);
            }
        });
    });
}

fn bench_observation_diff(c: &mut Criterion) {
    let mut oracle = Oracle::new();
    for action in mixed_actions(200) {
        let _ = oracle.apply(&action);
    }
    let expected = Observation::expected_from(&oracle.projection());
    let mut observed = expected.clone();
    observed.titles.reverse();
    observed.counter = None;

    c.bench_function("observation_diff", |bench| {
        bench.iter(|| black_box(expected.diff(black_box(&observed))));
    });
}

criterion_group!(benches, bench_oracle_fold, bench_catalog, bench_observation_diff);
criterion_main!(benches);
