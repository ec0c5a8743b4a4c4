use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use emergence_engine::{EmergenceConfig, Engine, EngineConfig, StoppingPolicy};

/// Repeated phrase, one token per word
fn generate_repetitive_tokens(size: usize) -> Vec<String> {
    let pattern = ["the", "quick", "brown", "fox", "jumps", "over", "the", "lazy", "dog"];
    pattern
        .iter()
        .cycle()
        .take(size)
        .map(|s| s.to_string())
        .collect()
}

/// Component-tree-like stream with a few structural variations
fn generate_component_tokens(size: usize) -> Vec<String> {
    let blocks: [&[&str]; 4] = [
        &["TAG:div", "PROP:className", "TAG:span", "PROP:key"],
        &["TAG:Button", "PROP:variant", "PROP:onClick"],
        &["TAG:Button", "PROP:size", "PROP:onClick"],
        &["IMPORT:react", "IMPORT:useState"],
    ];

    let mut result = Vec::with_capacity(size);
    let mut i = 0;
    while result.len() < size {
        result.extend(blocks[i % blocks.len()].iter().map(|s| s.to_string()));
        // Skip a block now and then so the stream is not strictly periodic
        i += if i % 7 == 3 { 2 } else { 1 };
    }
    result.truncate(size);
    result
}

/// Low-repetition stream over a large alphabet
fn generate_low_repetition(size: usize) -> Vec<String> {
    let mut seed = 12345u64;
    (0..size)
        .map(|_| {
            // Simple LCG random
            seed = seed.wrapping_mul(1103515245).wrapping_add(12345);
            format!("t{}", (seed >> 16) % 512)
        })
        .collect()
}

fn bench_policies(c: &mut Criterion, group_name: &str, sizes: &[usize], generate: fn(usize) -> Vec<String>) {
    let mdl = Engine::default();
    let exhaustive =
        Engine::new(EngineConfig::default().with_stopping(StoppingPolicy::Exhaustive)).unwrap();
    let mut group = c.benchmark_group(group_name);

    for size in sizes {
        let data = generate(*size);

        group.bench_with_input(BenchmarkId::new("Mdl", size), &data, |b, data| {
            b.iter(|| black_box(mdl.analyze(black_box(data)).unwrap()));
        });

        group.bench_with_input(BenchmarkId::new("Exhaustive", size), &data, |b, data| {
            b.iter(|| black_box(exhaustive.analyze(black_box(data)).unwrap()));
        });
    }

    group.finish();
}

fn bench_repetitive(c: &mut Criterion) {
    bench_policies(c, "repetitive_tokens", &[1_000, 10_000, 100_000], generate_repetitive_tokens);
}

fn bench_components(c: &mut Criterion) {
    bench_policies(c, "component_tokens", &[1_000, 10_000, 50_000], generate_component_tokens);
}

fn bench_low_repetition(c: &mut Criterion) {
    bench_policies(c, "low_repetition", &[1_000, 10_000, 50_000], generate_low_repetition);
}

fn bench_emergence(c: &mut Criterion) {
    let sizes = [1_000, 10_000];
    let engine = Engine::new(
        EngineConfig::default()
            .with_stopping(StoppingPolicy::Exhaustive)
            .with_emergence(EmergenceConfig::default()),
    )
    .unwrap();
    let mut group = c.benchmark_group("emergence");

    for size in sizes.iter() {
        let data = generate_component_tokens(*size);

        group.bench_with_input(BenchmarkId::new("Analyze", size), &data, |b, data| {
            b.iter(|| black_box(engine.analyze(black_box(data)).unwrap()));
        });

        group.bench_with_input(BenchmarkId::new("Windows", size), &data, |b, data| {
            b.iter(|| black_box(engine.analyze_windows(black_box(data), 256, None).unwrap()));
        });
    }

    group.finish();
}

fn bench_expansion(c: &mut Criterion) {
    let sizes = [1_000, 10_000, 100_000];
    let mut group = c.benchmark_group("expansion");

    for size in sizes.iter() {
        let data = generate_repetitive_tokens(*size);

        // Prepare the grammar once
        let analysis = Engine::default().analyze(&data).unwrap();

        group.bench_with_input(BenchmarkId::new("Expand", size), &analysis, |b, analysis| {
            b.iter(|| {
                let count: usize = black_box(analysis.grammar.expand().count());
                black_box(count)
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_repetitive,
    bench_components,
    bench_low_repetition,
    bench_emergence,
    bench_expansion
);
criterion_main!(benches);
