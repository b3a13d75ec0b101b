//! Benchmarks for formation sampling and the per-frame update paths.
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use swarmform::prelude::*;

fn bench_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate");
    let config = EngineConfig::default();

    for formation in [Formation::Saturn, Formation::Heart, Formation::Sphere, Formation::Cube] {
        group.bench_function(formation.name(), |b| {
            let mut ctx = SampleContext::seeded(1);
            b.iter(|| black_box(swarmform::generate(&formation, 20_000, &config, None, &mut ctx)))
        });
    }

    group.finish();
}

fn bench_blend(c: &mut Criterion) {
    let mut group = c.benchmark_group("blend");

    for count in [5_000usize, 20_000, 100_000] {
        group.bench_with_input(BenchmarkId::new("particles", count), &count, |b, &count| {
            let mut engine = Engine::with_context(
                EngineConfig::new().with_particle_count(count),
                SampleContext::seeded(2),
            );
            engine.handle_gesture(Gesture::Fist, 0.0);
            let mut time = 0.0;
            b.iter(|| {
                time += 0.016;
                engine.update(black_box(time));
            })
        });
    }

    group.finish();
}

fn bench_routine(c: &mut Criterion) {
    let mut group = c.benchmark_group("routine");

    let sources = [
        ("ring", "const a = i / count * Math.PI * 2;\npositions[i * 3] = Math.cos(a + time) * 10;\npositions[i * 3 + 1] = 0;\npositions[i * 3 + 2] = Math.sin(a + time) * 10;"),
        (
            "spiral_colored",
            "let t = i / count;\nlet r = 2 + t * 8;\nlet a = t * 40 + time;\n\
             positions[i * 3] = Math.cos(a) * r;\npositions[i * 3 + 1] = (t - 0.5) * 16;\npositions[i * 3 + 2] = Math.sin(a) * r;\n\
             colors[i * 3] = t; colors[i * 3 + 1] = 1 - t; colors[i * 3 + 2] = 0.5 + 0.5 * Math.sin(time);",
        ),
    ];

    for (name, source) in sources {
        group.bench_function(name, |b| {
            let mut routine = compile(source).expect("benchmark routine compiles");
            let mut buf = ParticleBuffer::new(20_000);
            let mut time = 0.0;
            b.iter(|| {
                time += 0.016;
                let (positions, colors) = buf.split_mut();
                let _ = black_box(routine.run(20_000, time, positions, colors));
            })
        });
    }

    group.bench_function("compile", |b| {
        b.iter(|| black_box(compile(sources[1].1)))
    });

    group.finish();
}

criterion_group!(benches, bench_generate, bench_blend, bench_routine);
criterion_main!(benches);
