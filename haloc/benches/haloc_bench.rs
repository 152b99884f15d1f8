use std::collections::HashSet;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use giztoy_haloc::{DescriptorMatrix, HalocConfig, Hasher, Matcher, ProjectionBasis};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn make_descriptors(rows: usize, cols: usize, phase: f32) -> DescriptorMatrix {
    let data = (0..rows * cols)
        .map(|i| ((i as f32) * 0.013 + phase).sin())
        .collect();
    DescriptorMatrix::new(rows, cols, data).unwrap()
}

fn bench_basis(c: &mut Criterion) {
    c.bench_function("haloc_basis_3x500", |b| {
        b.iter(|| {
            let mut rng = StdRng::seed_from_u64(42);
            let _ = black_box(ProjectionBasis::generate(3, 500, &mut rng));
        });
    });

    c.bench_function("haloc_basis_32x500", |b| {
        b.iter(|| {
            let mut rng = StdRng::seed_from_u64(42);
            let _ = black_box(ProjectionBasis::generate(32, 500, &mut rng));
        });
    });
}

fn bench_hash(c: &mut Criterion) {
    let mut h = Hasher::new(&HalocConfig::new(3, 500).with_seed(1)).unwrap();
    let desc = make_descriptors(495, 128, 0.0);
    let _ = h.calc_hash(&desc);

    c.bench_function("haloc_hash_495x128", |b| {
        b.iter(|| {
            let _ = black_box(h.calc_hash(black_box(&desc)));
        });
    });

    let big = make_descriptors(800, 128, 0.0);
    c.bench_function("haloc_hash_subsampled_800x128", |b| {
        b.iter(|| {
            let _ = black_box(h.calc_hash(black_box(&big)));
        });
    });
}

fn bench_query(c: &mut Criterion) {
    let mut m = Matcher::new(&HalocConfig::new(3, 100).with_seed(1)).unwrap();
    let ignore = HashSet::new();
    for id in 0..1000u32 {
        let _ = m.process_descriptors(id, &make_descriptors(60, 128, id as f32), 1, &ignore);
    }
    let query = make_descriptors(60, 128, 0.5);

    c.bench_function("haloc_query_1000_images", |b| {
        b.iter(|| {
            let _ = black_box(m.query(5000, black_box(&query), 5, &ignore));
        });
    });
}

criterion_group!(benches, bench_basis, bench_hash, bench_query);
criterion_main!(benches);
