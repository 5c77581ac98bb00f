//! Lexer Benchmarks
//!
//! Run with: `cargo bench --package skyc-lex`

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use skyc_lex::tokenize;
use skyc_util::StringInterner;

fn lexer_token_count(source: &str) -> usize {
    let mut interner = StringInterner::new();
    tokenize(source.as_bytes(), "=bench", &mut interner).map_or(0, |tokens| tokens.len())
}

fn bench_lexer_statements(c: &mut Criterion) {
    let mut group = c.benchmark_group("lexer");

    let source = "local x = 42 function f(a, b) return a + b * x end";
    group.throughput(Throughput::Bytes(source.len() as u64));

    group.bench_function("simple_local", |b| {
        b.iter(|| lexer_token_count(black_box("local x = 42")))
    });

    group.bench_function("function_with_body", |b| {
        b.iter(|| lexer_token_count(black_box(source)))
    });

    group.finish();
}

fn bench_lexer_literals(c: &mut Criterion) {
    let mut group = c.benchmark_group("lexer_literals");

    let strings = r#"local s = "escaped\tstring\n" .. 'single' .. [==[long
        bracket ]] content]==] .. "\x41\u{48}\65""#;
    let numbers = "local n = 3 + 3.0 + 0xff + 314.16e-2 + 0x1p4 + .5 + 9007199254740993";

    group.bench_function("strings", |b| b.iter(|| lexer_token_count(black_box(strings))));
    group.bench_function("numbers", |b| b.iter(|| lexer_token_count(black_box(numbers))));

    group.finish();
}

fn bench_lexer_large(c: &mut Criterion) {
    let mut group = c.benchmark_group("lexer_large");

    let unit = "-- comment line\nlocal t = {1, 2, 3; x = 'y'} for i = 1, #t do t[i] = t[i] // 2 end\n";
    let source = unit.repeat(500);
    group.throughput(Throughput::Bytes(source.len() as u64));

    group.bench_function("repeated_block", |b| {
        b.iter(|| lexer_token_count(black_box(&source)))
    });

    group.finish();
}

criterion_group!(benches, bench_lexer_statements, bench_lexer_literals, bench_lexer_large);
criterion_main!(benches);
