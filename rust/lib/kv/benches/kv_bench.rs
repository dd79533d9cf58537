use criterion::{Criterion, black_box, criterion_group, criterion_main};
use tempfile::TempDir;

use relgraph_kv::{KVOp, KVStore, MemoryKV, RedbStore};

/// Edge-shaped batch: guard, primary insert, index insert.
fn edge_batch(i: u64) -> Vec<KVOp> {
    vec![
        KVOp::AssertAbsent { key: format!("rel:edge:4:{i:04}:1:x:block") },
        KVOp::Insert {
            key: format!("rel:edge:4:{i:04}:1:x:follow"),
            value: b"edge".to_vec(),
        },
        KVOp::Insert {
            key: format!("rel:in:1:x:4:{i:04}:follow"),
            value: b"edge".to_vec(),
        },
    ]
}

fn bench_redb_batch(c: &mut Criterion) {
    let tmp = TempDir::new().unwrap();
    let store = RedbStore::open(&tmp.path().join("bench.redb")).unwrap();

    c.bench_function("redb_edge_batch", |b| {
        let mut i = 0u64;
        b.iter(|| {
            store.apply(black_box(&edge_batch(i))).unwrap();
            i += 1;
        });
    });
}

fn bench_memory_batch(c: &mut Criterion) {
    let store = MemoryKV::new();

    c.bench_function("memory_edge_batch", |b| {
        let mut i = 0u64;
        b.iter(|| {
            store.apply(black_box(&edge_batch(i))).unwrap();
            i += 1;
        });
    });
}

fn bench_redb_get(c: &mut Criterion) {
    let tmp = TempDir::new().unwrap();
    let store = RedbStore::open(&tmp.path().join("bench.redb")).unwrap();

    // Pre-populate.
    for i in 0..1000 {
        store.apply(&edge_batch(i)).unwrap();
    }

    c.bench_function("redb_point_lookup", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = format!("rel:edge:4:{:04}:1:x:follow", i % 1000);
            let _ = store.get(black_box(&key)).unwrap();
            i += 1;
        });
    });
}

fn bench_redb_scan(c: &mut Criterion) {
    let tmp = TempDir::new().unwrap();
    let store = RedbStore::open(&tmp.path().join("bench.redb")).unwrap();

    for i in 0..1000 {
        store.apply(&edge_batch(i)).unwrap();
    }

    c.bench_function("redb_scan_incoming_1000", |b| {
        b.iter(|| {
            let results = store.scan(black_box("rel:in:1:x:")).unwrap();
            assert_eq!(results.len(), 1000);
        });
    });
}

criterion_group!(
    benches,
    bench_redb_batch,
    bench_memory_batch,
    bench_redb_get,
    bench_redb_scan,
);
criterion_main!(benches);
