//! Benchmarks for the spectral hot path: transform round trip, gradient,
//! and the full pressure projection.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use cyclone_rs::{Backend, Grid, Projection, SpectralTransform};
use ndarray::Array3;

fn make_field(grid: &Grid) -> Array3<f64> {
    let mut field = grid.zeros();
    for ((i, j, k), value) in field.indexed_iter_mut() {
        *value = (i as f64 * 0.31 + j as f64 * 0.17 - k as f64 * 0.53).sin();
    }
    field
}

fn bench_transform_round_trip(c: &mut Criterion) {
    let grid = Grid::new(64, 64, 16, 2.0e6, 2.0e6, 2.0e4);
    let transform = SpectralTransform::new(&grid, Backend::Serial);
    let field = make_field(&grid);

    c.bench_function("transform_round_trip_64x64x16", |b| {
        b.iter(|| {
            let spec = transform.forward(black_box(&field));
            black_box(transform.inverse(&spec))
        })
    });
}

fn bench_gradient(c: &mut Criterion) {
    let grid = Grid::new(64, 64, 16, 2.0e6, 2.0e6, 2.0e4);
    let transform = SpectralTransform::new(&grid, Backend::Serial);
    let field = make_field(&grid);

    c.bench_function("gradient_x_64x64x16", |b| {
        b.iter(|| black_box(transform.gradient_x(&grid, black_box(&field))))
    });
}

fn bench_projection(c: &mut Criterion) {
    let grid = Grid::new(64, 64, 16, 2.0e6, 2.0e6, 2.0e4);
    let transform = SpectralTransform::new(&grid, Backend::Serial);
    let projection = Projection::default();
    let u0 = make_field(&grid);
    let v0 = make_field(&grid);
    let w0 = make_field(&grid);

    c.bench_function("pressure_projection_64x64x16", |b| {
        b.iter(|| {
            let mut u = u0.clone();
            let mut v = v0.clone();
            let mut w = w0.clone();
            projection
                .project(&grid, &transform, &mut u, &mut v, &mut w)
                .unwrap();
            black_box(u)
        })
    });
}

criterion_group!(
    benches,
    bench_transform_round_trip,
    bench_gradient,
    bench_projection
);
criterion_main!(benches);
