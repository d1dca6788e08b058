//! # Clustering Tick Benchmark
//!
//! Target: 32,768 particles (the default 32^3 snowfield) re-clustered in
//! well under a frame.
//!
//! Run with: `cargo bench --package flurry_core`

// Benchmarks don't need docs
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use flurry_core::{ClusterEngine, EngineConfig, Kinematics, LinearMotion, Particle};

/// Particles in the default snowfield.
const PARTICLE_COUNT: usize = 32 * 32 * 32;

fn falling_field(count: usize) -> Vec<Particle> {
    let mut particles = flurry_core::cube_lattice(count, flurry_core::Bounds::default());
    for (i, p) in particles.iter_mut().enumerate() {
        p.velocity.y = -(1.0 + (i % 7) as f32);
    }
    particles
}

fn bench_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("construction");
    group.sample_size(10);
    for half in [32usize, 64, 128] {
        group.bench_with_input(BenchmarkId::from_parameter(half), &half, |b, &half| {
            b.iter(|| {
                let config = EngineConfig::with_half_cluster_size(half);
                black_box(ClusterEngine::new(falling_field(PARTICLE_COUNT), config))
            });
        });
    }
    group.finish();
}

fn bench_tick_static(c: &mut Criterion) {
    let config = EngineConfig::with_half_cluster_size(64);
    let Ok(mut engine) = ClusterEngine::new(falling_field(PARTICLE_COUNT), config) else {
        return;
    };

    c.bench_function("tick_static_32k", |b| {
        b.iter(|| black_box(engine.tick(black_box(1.0 / 60.0))));
    });
}

fn bench_tick_moving(c: &mut Criterion) {
    let config = EngineConfig::with_half_cluster_size(64);
    let Ok(mut engine) = ClusterEngine::new(falling_field(PARTICLE_COUNT), config) else {
        return;
    };
    let mut motion = LinearMotion;

    c.bench_function("step_moving_32k", |b| {
        b.iter(|| black_box(engine.step(&mut motion, black_box(1.0 / 60.0))));
    });
}

fn bench_heavy_churn(c: &mut Criterion) {
    // Every tick sends a large share of particles back through the pool.
    let config = EngineConfig::with_half_cluster_size(64).reset_count(4096);
    let Ok(mut engine) = ClusterEngine::new(falling_field(PARTICLE_COUNT), config) else {
        return;
    };
    let mut shuffle = |particles: &mut [Particle], dt: f32| {
        LinearMotion.advance(particles, dt * 20.0);
    };

    c.bench_function("step_churn_32k", |b| {
        b.iter(|| black_box(engine.step(&mut shuffle, black_box(1.0 / 60.0))));
    });
}

criterion_group!(
    benches,
    bench_construction,
    bench_tick_static,
    bench_tick_moving,
    bench_heavy_churn,
);
criterion_main!(benches);
