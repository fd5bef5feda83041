//! Tag store benchmarks
//!
//! Covers the hot paths:
//! - get (share-value fast path, cross-type reads, path traversal)
//! - set (flat and nested)
//! - as_tree (cached and rebuilt)
//! - readable_copy / snapshot reads
//!
//! ## Running
//!
//! ```bash
//! cargo bench --bench store_benchmarks
//! cargo bench --bench store_benchmarks -- "get"
//! cargo bench --bench store_benchmarks -- "export"
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tagstore::{Tag, TagReadable, TagStore};

/// Store widths for scaling benchmarks
const WIDTHS: &[usize] = &[4, 32, 256];

fn populated_store(width: usize) -> TagStore {
    let store = TagStore::new();
    for i in 0..width {
        store.set(&Tag::int(&format!("bench-key-{i}")), i as i64);
    }
    store
}

fn bench_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("get");

    let store = populated_store(32);
    let hot = Tag::int("bench-key-0");
    group.bench_function("fast_path", |b| {
        b.iter(|| black_box(store.get(black_box(&hot))))
    });

    let cross = Tag::tree("bench-key-0");
    group.bench_function("cross_type", |b| {
        b.iter(|| black_box(store.get(black_box(&cross))))
    });

    let nested = TagStore::new();
    let deep = Tag::int("value").at_path(["bench-a", "bench-b", "bench-c"]);
    nested.set(&deep, 1);
    group.bench_function("path_depth_3", |b| {
        b.iter(|| black_box(nested.get(black_box(&deep))))
    });

    let missing = Tag::int("bench-absent").default_value(0);
    group.bench_function("absent_with_default", |b| {
        b.iter(|| black_box(store.get(black_box(&missing))))
    });

    group.finish();
}

fn bench_set(c: &mut Criterion) {
    let mut group = c.benchmark_group("set");

    let store = populated_store(32);
    let tag = Tag::int("bench-key-0");
    group.bench_function("overwrite_flat", |b| {
        let mut i = 0i64;
        b.iter(|| {
            i += 1;
            store.set(&tag, black_box(i));
        })
    });

    let nested = TagStore::new();
    let deep = Tag::int("value").at_path(["bench-a", "bench-b"]);
    nested.set(&deep, 0);
    group.bench_function("overwrite_nested", |b| {
        let mut i = 0i64;
        b.iter(|| {
            i += 1;
            nested.set(&deep, black_box(i));
        })
    });

    group.finish();
}

fn bench_export(c: &mut Criterion) {
    let mut group = c.benchmark_group("export");

    for &width in WIDTHS {
        let store = populated_store(width);
        // Warm: the cache survives between iterations
        group.bench_with_input(BenchmarkId::new("as_tree_cached", width), &store, |b, s| {
            b.iter(|| black_box(s.as_tree()))
        });

        let dirty = populated_store(width);
        let tag = Tag::int("bench-key-0");
        group.bench_with_input(BenchmarkId::new("as_tree_rebuilt", width), &dirty, |b, s| {
            let mut i = 0i64;
            b.iter(|| {
                i += 1;
                s.set(&tag, i);
                black_box(s.as_tree())
            })
        });
    }

    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot");

    let store = populated_store(32);
    group.bench_function("readable_copy", |b| {
        b.iter(|| black_box(store.readable_copy()))
    });

    let snapshot = store.readable_copy();
    let tag = Tag::int("bench-key-0");
    group.bench_function("snapshot_get", |b| {
        b.iter(|| black_box(snapshot.get_tag(black_box(&tag))))
    });

    group.finish();
}

criterion_group!(benches, bench_get, bench_set, bench_export, bench_snapshot);
criterion_main!(benches);
