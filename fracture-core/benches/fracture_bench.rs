//! Engine throughput benchmarks.
//!
//! Run with: `cargo bench --package fracture-core`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fracture_core::{
    relax, FortuneEngine, JumpFloodEngine, PixelSeed, Rect, RelaxOptions, SiteGenerator,
};

fn bench_fortune(c: &mut Criterion) {
    let bounds = Rect::new(0.0, 0.0, 1000.0, 1000.0);
    let mut group = c.benchmark_group("fortune");

    for count in [100, 1_000, 10_000] {
        let sites = SiteGenerator::new(1).uniform(count, &bounds);
        let mut engine = FortuneEngine::new();
        group.bench_with_input(BenchmarkId::from_parameter(count), &sites, |b, sites| {
            b.iter(|| black_box(engine.compute(sites, bounds)));
        });
    }

    group.finish();
}

fn bench_relax(c: &mut Criterion) {
    let bounds = Rect::new(0.0, 0.0, 1000.0, 1000.0);
    let mut generator = SiteGenerator::new(2);
    let sites = generator.uniform(1_000, &bounds);
    let mut engine = FortuneEngine::new();
    let diagram = engine.compute(&sites, bounds);
    let options = RelaxOptions::with_iterations(1);

    c.bench_function("relax_1000", |b| {
        b.iter(|| black_box(relax(&mut engine, &diagram, &options, generator.rng_mut())));
    });
}

fn bench_jump_flood(c: &mut Criterion) {
    let bounds = Rect::new(0.0, 0.0, 1.0, 1.0);
    let mut group = c.benchmark_group("jump_flood");
    group.sample_size(20);

    for size in [128u32, 512] {
        let engine = match JumpFloodEngine::new(size, size) {
            Ok(engine) => engine,
            Err(e) => panic!("engine setup failed: {}", e),
        };
        let seeds: Vec<PixelSeed> = SiteGenerator::new(3)
            .uniform(256, &bounds)
            .into_iter()
            .map(|p| engine.world_to_pixel(p, &bounds))
            .collect();
        group.bench_with_input(BenchmarkId::from_parameter(size), &seeds, |b, seeds| {
            b.iter(|| black_box(engine.compute(seeds, &bounds)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_fortune, bench_relax, bench_jump_flood);
criterion_main!(benches);
