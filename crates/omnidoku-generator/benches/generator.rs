//! Benchmarks for the solved-grid kernel and the uniqueness counter.

use std::sync::Arc;

use criterion::{Criterion, criterion_group, criterion_main};
use omnidoku_core::{Board, SearchAbortControl, Topology, parse_grid};
use omnidoku_generator::{Backend, CandidateCache, SolvedKernel, UniquenessCounter};
use rand::SeedableRng as _;
use rand_pcg::Pcg64Mcg;

fn bench_solved_kernel(c: &mut Criterion) {
    let mut group = c.benchmark_group("solved_kernel");
    for (box_rows, box_cols) in [(3u8, 3u8), (2, 3), (4, 4)] {
        let topo = Topology::shared(box_rows, box_cols).unwrap();
        let kernel = SolvedKernel::new(Backend::Scalar.resolve());
        group.bench_function(format!("{box_rows}x{box_cols}"), |b| {
            let mut board = Board::new(Arc::clone(&topo));
            let mut cache = CandidateCache::new();
            let mut rng = Pcg64Mcg::seed_from_u64(0xC0FFEE);
            let mut solution = Vec::new();
            b.iter(|| {
                let mut budget = SearchAbortControl::new();
                kernel.generate(&mut board, &mut cache, &mut rng, &mut budget, &mut solution)
            });
        });
    }
    group.finish();
}

fn bench_uniqueness(c: &mut Criterion) {
    let topo = Topology::shared(3, 3).unwrap();
    let puzzle = parse_grid(
        "
        530 070 000
        600 195 000
        098 000 060
        800 060 003
        400 803 001
        700 020 006
        060 000 280
        000 419 005
        000 080 079
    ",
        9,
    )
    .unwrap();
    let mut counter = UniquenessCounter::new();
    c.bench_function("uniqueness_limit2_9x9", |b| {
        b.iter(|| {
            let mut budget = SearchAbortControl::new();
            counter.count_solutions_limit2(std::hint::black_box(&puzzle), &topo, &mut budget)
        });
    });
}

criterion_group!(benches, bench_solved_kernel, bench_uniqueness);
criterion_main!(benches);
