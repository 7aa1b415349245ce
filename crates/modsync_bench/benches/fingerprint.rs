//! Fingerprint benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use modsync_bench::file_data;
use modsync_core::{fingerprint, fingerprint_reader, HashConfig};
use std::io::Cursor;
use std::path::Path;
use tempfile::TempDir;

/// Benchmark hashing whole files, below the sampling threshold.
fn bench_full_hash(c: &mut Criterion) {
    let mut group = c.benchmark_group("fingerprint_full");
    let config = HashConfig::default();

    for size in [1024usize, 64 * 1024, 1024 * 1024] {
        let data = file_data(size, 1);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &data, |b, data| {
            b.iter(|| {
                let hash =
                    fingerprint_reader(Cursor::new(black_box(data)), Path::new("bench"), &config)
                        .unwrap();
                black_box(hash);
            });
        });
    }

    group.finish();
}

/// Benchmark sampled hashing of large files on disk.
fn bench_sampled_hash(c: &mut Criterion) {
    let mut group = c.benchmark_group("fingerprint_sampled");
    let dir = TempDir::new().unwrap();
    let config = HashConfig::default();

    for mib in [16usize, 64] {
        let path = dir.path().join(format!("{mib}.bin"));
        std::fs::write(&path, file_data(mib * 1024 * 1024, 7)).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(format!("{mib}MiB")), &path, |b, path| {
            b.iter(|| {
                let hash = fingerprint(black_box(path), &config).unwrap();
                black_box(hash);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_full_hash, bench_sampled_hash);
criterion_main!(benches);
