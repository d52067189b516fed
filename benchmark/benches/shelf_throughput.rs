// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Shelve and resolve throughput.
//!
//! Compares the local (file) and in-process memory backends, and cold
//! resolution against memoized resolution.

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use memshelf_benchmark::{float_payload, record_payload, Record, PAYLOAD_LENGTHS};
use memshelf_core::{memo, BackendKind, BackendOptions, NoopRegistry, Shelf};
use std::sync::Arc;
use tempfile::TempDir;

fn open(dir: &TempDir, kind: BackendKind) -> Shelf {
    Shelf::open(
        dir.path().join(kind.name()),
        &BackendOptions::new(kind),
        Arc::new(NoopRegistry),
    )
    .expect("Failed to open shelf")
}

/// Benchmark writing a fresh item per iteration.
fn bench_shelve(c: &mut Criterion) {
    let mut group = c.benchmark_group("shelve_f64");
    group.measurement_time(Duration::from_secs(5));

    for kind in [BackendKind::Local, BackendKind::Memory] {
        for &len in PAYLOAD_LENGTHS {
            group.throughput(Throughput::Bytes((len * 8) as u64));
            let payload = float_payload(len, 0);

            group.bench_with_input(BenchmarkId::new(kind.name(), len), &payload, |b, payload| {
                let dir = TempDir::new().expect("Failed to create temp dir");
                let shelf = open(&dir, kind);
                b.iter(|| {
                    let future = shelf.shelve(black_box(payload)).expect("Shelve failed");
                    black_box(future);
                });
            });
        }
    }

    group.finish();
}

/// Benchmark resolving a handle without the memo cache.
fn bench_resolve_cold(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_cold");
    group.measurement_time(Duration::from_secs(5));

    for &len in PAYLOAD_LENGTHS {
        group.bench_with_input(BenchmarkId::new("records", len), &len, |b, &len| {
            let dir = TempDir::new().expect("Failed to create temp dir");
            let shelf = open(&dir, BackendKind::Local);
            let future = shelf
                .shelve(&record_payload(len, 1))
                .expect("Shelve failed");

            b.iter(|| {
                memo::forget(future.key());
                let value: Arc<Vec<Record>> = future.result().expect("Resolve failed");
                black_box(value);
            });
        });
    }

    group.finish();
}

/// Benchmark repeated resolution served from the memo cache.
fn bench_resolve_memoized(c: &mut Criterion) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let shelf = open(&dir, BackendKind::Local);
    let future = shelf
        .shelve(&float_payload(65_536, 2))
        .expect("Shelve failed");
    future.result().expect("Resolve failed");

    c.bench_function("resolve_memoized", |b| {
        b.iter(|| black_box(future.result().expect("Resolve failed")));
    });
}

criterion_group!(
    benches,
    bench_shelve,
    bench_resolve_cold,
    bench_resolve_memoized
);
criterion_main!(benches);
