//! Criterion benchmarks for complete nested simulation runs.

use std::hint::black_box;

use assay_bench::{reference_scan, stress_scan};
use criterion::{criterion_group, criterion_main, Criterion};

fn bench_reference_scan(c: &mut Criterion) {
    let mut scan = reference_scan();
    c.bench_function("reference_scan_20x50", |b| {
        b.iter(|| black_box(scan.run(None).unwrap()));
    });
}

fn bench_stress_scan(c: &mut Criterion) {
    let mut scan = stress_scan();
    let mut group = c.benchmark_group("stress");
    group.sample_size(20);
    group.bench_function("stress_scan_10x10x100", |b| {
        b.iter(|| black_box(scan.run(None).unwrap()));
    });
    group.finish();
}

criterion_group!(benches, bench_reference_scan, bench_stress_scan);
criterion_main!(benches);
