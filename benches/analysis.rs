//! Analysis pipeline benchmarks over generated fault trees.

use std::collections::HashMap;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use faultline::generator::{generate, GeneratorConfig};
use faultline::{RiskAnalysis, Settings};
use faultline_core::{preprocess, Mocus, Pdag};

fn benchmark_cut_set_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("cut_set_generation");
    for size in [50usize, 100, 200] {
        let config = GeneratorConfig { num_basic_events: size, ..Default::default() };
        let (model, top) = generate(&config, 42).expect("generation succeeds");
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let overrides = HashMap::new();
                let mut pdag = Pdag::from_gate(&model, top, &overrides, false);
                preprocess(&mut pdag);
                let collection = Mocus::new(&pdag, 15).minimal_cut_sets();
                black_box(collection.len())
            });
        });
    }
    group.finish();
}

fn benchmark_full_analysis(c: &mut Criterion) {
    let config = GeneratorConfig { num_basic_events: 200, ..Default::default() };
    c.bench_function("probability_200_events", |b| {
        b.iter(|| {
            let (model, _) = generate(&config, 42).expect("generation succeeds");
            let settings = Settings::default()
                .probability_analysis(true)
                .limit_order(15)
                .num_sums(3)
                .seed(42);
            let mut analysis = RiskAnalysis::new(model, settings).expect("settings are valid");
            analysis.analyze().expect("analysis succeeds");
            black_box(analysis.results()[0].probability.as_ref().map(|p| p.p_total))
        });
    });
}

criterion_group!(benches, benchmark_cut_set_generation, benchmark_full_analysis);
criterion_main!(benches);
