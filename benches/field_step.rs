//! Benchmarks for the CPU field programs and mesh generation.
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use moire::mesh::PointFieldMesh;
use moire::{CpuFieldBackend, SimulationDriver};

fn bench_field_programs(c: &mut Criterion) {
    let mut group = c.benchmark_group("field");

    for resolution in [64u32, 128, 256] {
        group.bench_with_input(BenchmarkId::new("advance", resolution), &resolution, |b, &res| {
            let mut driver = SimulationDriver::new(CpuFieldBackend::new(res, res));
            driver.inject(0.0, 0.0, 0.1, 0.5);
            b.iter(|| {
                driver.advance();
                black_box(driver.readable());
            })
        });

        group.bench_with_input(BenchmarkId::new("inject", resolution), &resolution, |b, &res| {
            let mut driver = SimulationDriver::new(CpuFieldBackend::new(res, res));
            b.iter(|| black_box(driver.inject(0.3, -0.2, 0.05, 0.05)))
        });
    }

    group.finish();
}

fn bench_mesh_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("mesh_build");

    for (name, width, height) in [("laptop", 1280.0, 720.0), ("4k", 3840.0, 2160.0), ("phone", 390.0, 844.0)] {
        group.bench_function(name, |b| {
            b.iter(|| black_box(PointFieldMesh::build(black_box(width), black_box(height), 41.0, 3.0)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_field_programs, bench_mesh_build);
criterion_main!(benches);
