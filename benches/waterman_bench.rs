use criterion::{Criterion, black_box, criterion_group, criterion_main};
use math_waterman::{ConvexHull3D, compute_mesh, waterman_points};

fn bench_lattice(c: &mut Criterion) {
    c.bench_function("waterman_points_r20", |b| {
        b.iter(|| waterman_points(black_box(20.0)).unwrap())
    });
}

fn bench_hull(c: &mut Criterion) {
    let candidates = waterman_points(15.0).unwrap();

    c.bench_function("quickhull_r15", |b| {
        b.iter(|| ConvexHull3D::build(black_box(&candidates)).unwrap())
    });
}

fn bench_compute_mesh(c: &mut Criterion) {
    for radius in [5.0, 10.0, 20.0] {
        c.bench_function(&format!("compute_mesh_r{radius}"), |b| {
            b.iter(|| compute_mesh(black_box(radius)).unwrap())
        });
    }
}

criterion_group!(benches, bench_lattice, bench_hull, bench_compute_mesh);
criterion_main!(benches);
