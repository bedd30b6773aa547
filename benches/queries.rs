//! Performance benchmarks for construction, loading and queries
//!
//! Run with: cargo bench

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use std::path::PathBuf;
use succinct::utils::line_offsets;
use succinct::{StorageMode, SuccinctConfig, SuccinctIndexedFile};
use tempfile::TempDir;

/// Log-like text with repeating structure
fn create_benchmark_data(lines: usize) -> Vec<u8> {
    let mut data = Vec::new();
    for i in 0..lines {
        let line = format!(
            "2024-01-{:02} 12:{:02}:{:02} GET /api/v1/users/{} status={} bytes={}\n",
            i % 28 + 1,
            i % 60,
            (i * 7) % 60,
            i % 977,
            if i % 13 == 0 { 500 } else { 200 },
            (i * 31) % 10_000
        );
        data.extend_from_slice(line.as_bytes());
    }
    data
}

fn create_benchmark_index(lines: usize) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("bench.succinct");
    let data = create_benchmark_data(lines);
    let offsets = line_offsets(&data);
    SuccinctIndexedFile::new(&data, &offsets, &SuccinctConfig::default())
        .expect("Failed to build index")
        .write_to_file(&path)
        .expect("Failed to write index");
    (temp_dir, path)
}

fn bench_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("construction");
    group.sample_size(10);
    for lines in [1_000, 10_000] {
        let data = create_benchmark_data(lines);
        let offsets = line_offsets(&data);
        group.bench_with_input(BenchmarkId::from_parameter(lines), &data, |b, data| {
            b.iter(|| SuccinctIndexedFile::new(black_box(data), &offsets, &SuccinctConfig::default()))
        });
    }
    group.finish();
}

fn bench_queries(c: &mut Criterion) {
    let (_temp_dir, path) = create_benchmark_index(20_000);

    for (name, mode) in [("memory", StorageMode::MemoryOnly), ("mmap", StorageMode::MemoryMapped)] {
        let file = SuccinctIndexedFile::load(&path, mode).expect("Failed to load index");
        let mut group = c.benchmark_group(format!("queries_{}", name));

        group.bench_function("count_common", |b| b.iter(|| file.count(black_box(b"GET /api"))));
        group.bench_function("count_rare", |b| b.iter(|| file.count(black_box(b"users/976 status=500"))));
        group.bench_function("search_rare", |b| b.iter(|| file.search(black_box(b"status=500 bytes=0"))));
        group.bench_function("record_search", |b| {
            b.iter(|| file.record_search_ids(black_box(b"users/42 ")))
        });
        group.bench_function("extract_64b", |b| b.iter(|| file.extract(black_box(123_456), 64)));
        group.bench_function("record_bytes", |b| b.iter(|| file.record_bytes(black_box(9_999))));

        group.finish();
    }
}

fn bench_index_loading(c: &mut Criterion) {
    let (_temp_dir, path) = create_benchmark_index(20_000);

    let mut group = c.benchmark_group("index_load");
    group.bench_function("memory", |b| {
        b.iter(|| SuccinctIndexedFile::load(black_box(&path), StorageMode::MemoryOnly))
    });
    group.bench_function("mmap", |b| {
        b.iter(|| SuccinctIndexedFile::load(black_box(&path), StorageMode::MemoryMapped))
    });
    group.finish();
}

criterion_group!(benches, bench_construction, bench_queries, bench_index_loading);

criterion_main!(benches);
