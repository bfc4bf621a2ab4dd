//! Benchmarks for option ranking and explanation over the enumeration oracle.
//!
//! Run with `cargo bench --bench ranking --features test-support`
//! (add `parallel` to compare the rayon fan-out).

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use doctorbn_core::service::explain_options;
use doctorbn_core::testing::{diamond_network, EnumerationOracle};
use doctorbn_core::{rank_options, AdvisorConfig, Evidence, Goal, GoalDirection, RankingConfig, Scenario};

fn bench_rank_options(c: &mut Criterion) {
    let scenario = Scenario::builder(diamond_network())
        .evidence("Symptom", "high")
        .targets(["Treatment", "Diet"])
        .goal("Recovery", "yes", GoalDirection::Maximize)
        .goal("SideEffect", "present", GoalDirection::Minimize)
        .build()
        .expect("bench scenario");
    let config = RankingConfig::default();

    c.bench_function("rank_options/diamond", |b| {
        b.iter(|| black_box(rank_options(black_box(&scenario), &EnumerationOracle, &config)))
    });
}

fn bench_explain_options(c: &mut Criterion) {
    let network = diamond_network();
    let evidence = Evidence::from([("Symptom".to_string(), "high".to_string())]);
    let options = Evidence::from([("Treatment".to_string(), "drugA".to_string())]);
    let goals = [Goal::new("Recovery", "yes", GoalDirection::Maximize)];
    let config = AdvisorConfig::default();

    c.bench_function("explain_options/diamond", |b| {
        b.iter(|| {
            black_box(explain_options(
                &network,
                &evidence,
                &options,
                &goals,
                &EnumerationOracle,
                &config,
            ))
        })
    });
}

criterion_group!(benches, bench_rank_options, bench_explain_options);
criterion_main!(benches);
