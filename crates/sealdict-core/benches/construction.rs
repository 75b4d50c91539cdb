use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use sealdict_core::{build_store, DictKey, StoreConfig};

fn items(n: usize) -> Vec<(String, String)> {
    (0..n)
        .map(|i| (format!("key-{:08}", i), format!("value-{}", i)))
        .collect()
}

fn construction_benchmark(c: &mut Criterion) {
    let key = DictKey::new(*b"1234123412341234");
    let mut group = c.benchmark_group("build_store");

    for n in [100, 1_000, 10_000] {
        let data = items(n);
        group.bench_with_input(BenchmarkId::new("sequential", n), &data, |b, data| {
            b.iter(|| build_store(&key, data.iter().cloned(), &StoreConfig::default()).unwrap());
        });

        let config = StoreConfig {
            workers: 4,
            ..StoreConfig::default()
        };
        group.bench_with_input(BenchmarkId::new("workers_4", n), &data, |b, data| {
            b.iter(|| build_store(&key, data.iter().cloned(), &config).unwrap());
        });
    }

    group.finish();
}

fn lookup_benchmark(c: &mut Criterion) {
    let key = DictKey::new(*b"1234123412341234");
    let data = items(10_000);
    let (context, store) = build_store(&key, data.iter().cloned(), &StoreConfig::default()).unwrap();

    c.bench_function("lookup", |b| {
        b.iter(|| context.get(&store, b"key-00004242").unwrap());
    });
    c.bench_function("evaluate", |b| {
        b.iter(|| context.evaluate(b"key-00004242"));
    });
}

criterion_group!(benches, construction_benchmark, lookup_benchmark);
criterion_main!(benches);
