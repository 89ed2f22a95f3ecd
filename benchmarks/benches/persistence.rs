//! Persistence Benchmarks
//!
//! Full save and load passes over registries of increasing payload size,
//! backed by an in-memory region so only the engine itself is measured.
//!
//! Run with: cargo bench --bench persistence

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use keel::persistence::{FlashConfig, PersistenceEngine};
use keel::prelude::*;
use keel_benchmarks::{build_registry, region_for, BENCH_IDENTITY};
use std::time::Duration;

/// Payload bytes per module
const STATE_SIZES: &[usize] = &[16, 128, 1024];

const MODULES: u8 = 8;

fn bench_save(c: &mut Criterion) {
    let mut group = c.benchmark_group("save");
    group.measurement_time(Duration::from_secs(5));

    for &size in STATE_SIZES {
        group.throughput(Throughput::Bytes((MODULES as usize * size) as u64));
        group.bench_with_input(BenchmarkId::new("forced", size), &size, |b, &size| {
            let registry = build_registry(MODULES, size).unwrap();
            let bus = StaticBus::new(BENCH_IDENTITY);
            let mut engine = PersistenceEngine::new(
                Box::new(region_for(MODULES, size)),
                FlashConfig::default(),
            );

            b.iter(|| {
                black_box(engine.save(&registry, &bus, true).unwrap());
            });
        });
    }

    group.finish();
}

fn bench_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("load");
    group.measurement_time(Duration::from_secs(5));

    for &size in STATE_SIZES {
        group.throughput(Throughput::Bytes((MODULES as usize * size) as u64));
        group.bench_with_input(BenchmarkId::new("restored", size), &size, |b, &size| {
            let region = region_for(MODULES, size);
            let bus = StaticBus::new(BENCH_IDENTITY);
            let registry = build_registry(MODULES, size).unwrap();
            PersistenceEngine::new(Box::new(region.clone()), FlashConfig::default())
                .save(&registry, &bus, true)
                .unwrap();

            let mut registry = build_registry(MODULES, size).unwrap();
            let mut engine = PersistenceEngine::new(Box::new(region), FlashConfig::default());

            b.iter(|| {
                black_box(engine.load(&mut registry, BENCH_IDENTITY).unwrap());
            });
        });
    }

    group.finish();
}

/// Unforced saves inside the rewrite interval only pay for the check
fn bench_rate_limited(c: &mut Criterion) {
    let registry = build_registry(MODULES, 128).unwrap();
    let bus = StaticBus::new(BENCH_IDENTITY);
    let mut engine = PersistenceEngine::new(Box::new(region_for(MODULES, 128)), FlashConfig::default());
    engine.save(&registry, &bus, true).unwrap();

    c.bench_function("save_rate_limited", |b| {
        b.iter(|| {
            black_box(engine.save(&registry, &bus, false).unwrap());
        });
    });
}

criterion_group!(benches, bench_save, bench_load, bench_rate_limited);
criterion_main!(benches);
