use criterion::{black_box, criterion_group, criterion_main, Criterion};
use intmap::IntMap;
use std::collections::{BTreeMap, HashMap};

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("intmap_build");

    let keys: Vec<u64> = (0..10_000u64).map(|i| i * 3).collect();

    group.bench_function("persistent_insert", |b| {
        b.iter(|| {
            let map = keys
                .iter()
                .fold(IntMap::new(), |acc, &k| acc.replace(k, k));
            black_box(map);
        });
    });

    group.bench_function("transient_insert", |b| {
        b.iter(|| {
            let mut t = IntMap::new().transient();
            for &k in &keys {
                t.replace(k, k).unwrap();
            }
            black_box(t.persistent().unwrap());
        });
    });

    group.bench_function("std_btreemap_insert", |b| {
        b.iter(|| {
            let mut map = BTreeMap::new();
            for &k in &keys {
                map.insert(k, k);
            }
            black_box(map);
        });
    });

    group.bench_function("std_hashmap_insert", |b| {
        b.iter(|| {
            let mut map = HashMap::new();
            for &k in &keys {
                map.insert(k, k);
            }
            black_box(map);
        });
    });

    group.finish();
}

fn bench_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("intmap_get");

    let keys: Vec<u64> = (0..10_000u64).map(|i| i * 3).collect();
    let map: IntMap<u64> = keys.iter().map(|&k| (k, k)).collect();
    let btree: BTreeMap<u64, u64> = keys.iter().map(|&k| (k, k)).collect();

    group.bench_function("intmap_get", |b| {
        b.iter(|| {
            for &k in &keys {
                black_box(map.get(k));
            }
        });
    });

    group.bench_function("std_btreemap_get", |b| {
        b.iter(|| {
            for &k in &keys {
                black_box(btree.get(&k));
            }
        });
    });

    group.finish();
}

fn bench_versioned_updates(c: &mut Criterion) {
    let mut group = c.benchmark_group("intmap_versioned_updates");

    // the flow-analysis shape: keep every version, touch few keys each
    let base: IntMap<u64> = (0..10_000u64).map(|k| (k, k)).collect();

    group.bench_function("persistent_point_updates", |b| {
        b.iter(|| {
            let mut versions = Vec::with_capacity(1000);
            let mut current = base.clone();
            for k in 0..1000u64 {
                current = current.replace(k * 7 % 10_000, k);
                versions.push(current.clone());
            }
            black_box(versions);
        });
    });

    group.bench_function("btreemap_point_updates_cloned", |b| {
        let base: BTreeMap<u64, u64> = (0..10_000u64).map(|k| (k, k)).collect();
        b.iter(|| {
            let mut versions = Vec::with_capacity(1000);
            let mut current = base.clone();
            for k in 0..1000u64 {
                current.insert(k * 7 % 10_000, k);
                versions.push(current.clone());
            }
            black_box(versions);
        });
    });

    group.finish();
}

fn bench_union(c: &mut Criterion) {
    let mut group = c.benchmark_group("intmap_union");

    let left: IntMap<u64> = (0..10_000u64).map(|k| (k * 2, k)).collect();
    let right: IntMap<u64> = (0..10_000u64).map(|k| (k * 2 + 1, k)).collect();
    let nearby = left.replace(20_001, 1).replace(20_003, 2);

    group.bench_function("union_disjoint", |b| {
        b.iter(|| {
            black_box(left.union_with(&right, |x, _| *x));
        });
    });

    group.bench_function("union_mostly_shared", |b| {
        b.iter(|| {
            black_box(left.union_with(&nearby, |x, _| *x));
        });
    });

    group.bench_function("intersect_mostly_shared", |b| {
        b.iter(|| {
            black_box(left.intersect_with(&nearby, |x, _| *x));
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_build,
    bench_get,
    bench_versioned_updates,
    bench_union
);
criterion_main!(benches);
