//! Benchmark for noise generation performance.
//!
//! TARGET: one 241x241 tile field in well under a frame budget per worker
//!
//! Run with: cargo bench --package tessera_procedural --bench noise_benchmark

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tessera_procedural::noise::{
    NoiseField, NoiseParameters, NormalizeMode, SimplexNoise, WorldSeed,
};

fn benchmark_single_sample(c: &mut Criterion) {
    let noise = SimplexNoise::new(WorldSeed::new(42));

    c.bench_function("single_noise_sample", |b| {
        let mut x = 0.0f64;
        b.iter(|| {
            x += 0.1;
            black_box(noise.sample(black_box(x), black_box(x * 0.7)))
        });
    });
}

fn benchmark_tile_field(c: &mut Criterion) {
    let mut group = c.benchmark_group("tile_field");
    group.sample_size(20);

    for octaves in [1, 4, 8] {
        let params = NoiseParameters {
            octaves,
            normalize_mode: NormalizeMode::Global,
            ..NoiseParameters::default()
        };
        group.throughput(Throughput::Elements(243 * 243));
        group.bench_with_input(BenchmarkId::new("octaves", octaves), &params, |b, params| {
            b.iter(|| black_box(NoiseField::generate(241, 1, black_box(params))));
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_single_sample, benchmark_tile_field);
criterion_main!(benches);
