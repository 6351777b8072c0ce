//! Statistical comparison benchmarks
//!
//! The comparison runs once per invocation, so these are guardrails rather
//! than hot-path tuning: the exact rank-sum distribution must stay cheap
//! for realistic sample counts.
//!
//! Run with: cargo bench --bench stats_benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use agentmark::report::ReportGroup;
use agentmark::stats;

fn series(n: usize, offset: f64) -> Vec<f64> {
    (0..n).map(|i| offset + (i as f64) * 1_000.0).collect()
}

fn bench_mann_whitney(c: &mut Criterion) {
    let mut group = c.benchmark_group("mann_whitney");

    for n in [5_usize, 20] {
        let xs = series(n, 1_000_000.0);
        let ys = series(n, 1_050_000.0);
        group.bench_with_input(BenchmarkId::new("exact", n), &n, |b, _| {
            b.iter(|| stats::mann_whitney(black_box(&xs), black_box(&ys)));
        });
    }

    // Tied pools take the approximation path.
    let xs: Vec<f64> = (0..100).map(|i| f64::from(i / 2)).collect();
    let ys: Vec<f64> = (0..100).map(|i| f64::from(i / 2) + 10.0).collect();
    group.bench_function("approximate_100", |b| {
        b.iter(|| stats::mann_whitney(black_box(&xs), black_box(&ys)));
    });

    group.finish();
}

fn bench_compare_pipeline(c: &mut Criterion) {
    let mut old_text = String::new();
    let mut new_text = String::new();
    for label in ["fast", "slow", "noserver"] {
        for i in 0..5 {
            old_text.push_str(&format!("BenchmarkFib-{label} 1 {} ns/op\n", 1_000_000 + i));
            new_text.push_str(&format!("BenchmarkFib-{label} 1 {} ns/op\n", 1_200_000 + i));
        }
    }
    let old = ReportGroup::from_text("no profiling", old_text);
    let new = ReportGroup::from_text("profiling", new_text);

    c.bench_function("compare_and_render", |b| {
        b.iter(|| stats::compare(black_box(&old), black_box(&new), 0.05).to_string());
    });
}

criterion_group!(benches, bench_mann_whitney, bench_compare_pipeline);
criterion_main!(benches);
