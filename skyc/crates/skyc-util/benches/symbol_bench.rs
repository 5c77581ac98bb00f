//! Symbol module benchmarks
//!
//! These benchmarks measure the performance of symbol interning operations.
//! Run with: `cargo bench --bench symbol_bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use skyc_util::symbol::{SharedInterner, StringInterner};

fn bench_intern(c: &mut Criterion) {
    let mut group = c.benchmark_group("intern");
    group.throughput(Throughput::Elements(1));

    group.bench_function("intern_new_string", |b| {
        let mut interner = StringInterner::new();
        let mut counter = 0u64;
        b.iter(|| {
            counter += 1;
            interner.intern(format!("new_string_{counter}").as_bytes())
        })
    });

    group.bench_function("intern_existing_string", |b| {
        let mut interner = StringInterner::new();
        interner.intern(b"existing_string");
        b.iter(|| black_box(interner.intern(black_box(b"existing_string"))))
    });

    group.bench_function("shared_intern_existing_string", |b| {
        let interner = SharedInterner::new();
        interner.intern(b"existing_string");
        b.iter(|| black_box(interner.intern(black_box(b"existing_string"))))
    });

    group.finish();
}

fn bench_identifier_mix(c: &mut Criterion) {
    let mut group = c.benchmark_group("identifier_mix");

    for unique in [16usize, 256, 4096] {
        let names: Vec<String> = (0..unique).map(|i| format!("local_{i}")).collect();
        group.throughput(Throughput::Elements(names.len() as u64 * 4));
        group.bench_with_input(BenchmarkId::from_parameter(unique), &names, |b, names| {
            b.iter(|| {
                let mut interner = StringInterner::new();
                for _ in 0..4 {
                    for name in names {
                        black_box(interner.intern(name.as_bytes()));
                    }
                }
                interner.len()
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_intern, bench_identifier_mix);
criterion_main!(benches);
