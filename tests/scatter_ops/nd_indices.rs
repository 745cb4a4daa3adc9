//! Coordinate-tuple indices under every strategy

use crate::common::{
    all_grids, assert_allclose_f64, assert_bitwise_eq, random_updates, reference_scatter_add,
    run_scatter,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use scatr::prelude::*;

/// `count` tuples into `dims`; about one coordinate in 16 is out of range
fn random_tuples(seed: u64, dims: &[usize], count: usize) -> Vec<i64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count * dims.len())
        .map(|i| {
            let dim = dims[i % dims.len()] as i64;
            match rng.gen_range(0..32) {
                0 => -1,
                1 => dim,
                _ => rng.gen_range(0..dim),
            }
        })
        .collect()
}

/// Row of each tuple, or -1 when any coordinate is out of range
fn reference_rows(dims: &[usize], tuples: &[i64]) -> Vec<i64> {
    tuples
        .chunks(dims.len())
        .map(|tuple| {
            let mut row = 0i64;
            for (&coord, &dim) in tuple.iter().zip(dims) {
                if coord < 0 || coord >= dim as i64 {
                    return -1;
                }
                row = row * dim as i64 + coord;
            }
            row
        })
        .collect()
}

fn strategies(layout: IndexLayout) -> [(ScatterConfig, Strategy); 3] {
    let base = ScatterConfig::for_types::<f64, i64>().with_index_layout(layout);
    [
        (base, Strategy::Atomic),
        (base.with_group_duplicates(true), Strategy::SortGrouped),
        (base.with_deterministic(true), Strategy::Deterministic),
    ]
}

#[test]
fn test_tuples_match_reference_on_every_strategy() {
    let dims = [3usize, 4, 5];
    let rows = 60;
    let row_len = 3;
    let count = 400;
    let layout = IndexLayout::tuple(&dims).unwrap();

    let tuples = random_tuples(11, &dims, count);
    let flat = reference_rows(&dims, &tuples);
    assert!(flat.contains(&-1));

    let mut rng = StdRng::seed_from_u64(12);
    let initial: Vec<f64> = (0..rows * row_len)
        .map(|_| rng.gen_range(-50i32..50) as f64)
        .collect();
    let updates: Vec<f64> = (0..count * row_len)
        .map(|_| rng.gen_range(-100i32..100) as f64)
        .collect();
    let expected = reference_scatter_add(&initial, &flat, &updates, row_len, false, false);

    for grid in all_grids() {
        for (config, strategy) in strategies(layout) {
            let mut acc = initial.clone();
            let launch = run_scatter(
                &grid,
                &config,
                &Tiling::new(4, 32).unwrap(),
                &mut acc,
                &tuples,
                Updates::PerIndex(&updates),
                row_len,
            );
            assert_eq!(launch, Launch::Completed(strategy));
            let msg = format!("{} {strategy}", grid.name());
            assert_allclose_f64(&acc, &expected, 0.0, 1e-3, &msg);
        }
    }
}

#[test]
fn test_tuples_equal_flattened_rows_bitwise() {
    let dims = [6usize, 7];
    let row_len = 2;
    let count = 900;
    let layout = IndexLayout::tuple(&dims).unwrap();
    let tuples = random_tuples(21, &dims, count);
    let flat = reference_rows(&dims, &tuples);
    let updates = random_updates(22, count * row_len, 10.0);
    let tiling = Tiling::new(3, 50).unwrap();
    let grid = ThreadGrid::new(3);

    let run = |config: &ScatterConfig, indices: &[i64]| {
        let mut acc = vec![0.5f64; 42 * row_len];
        run_scatter(
            &grid,
            config,
            &tiling,
            &mut acc,
            indices,
            Updates::PerIndex(&updates),
            row_len,
        );
        acc
    };

    // Same flattened keys, same chunks: the deterministic output cannot differ
    let det = ScatterConfig::for_types::<f64, i64>().with_deterministic(true);
    let by_tuple = run(&det.with_index_layout(layout), &tuples);
    let by_row = run(&det, &flat);
    assert_bitwise_eq(&by_tuple, &by_row, "tuple vs row");
}

#[test]
fn test_bad_coordinate_drops_whole_tuple() {
    // (0, 4) would flatten to row 4, which exists, but column 4 does not
    let layout = IndexLayout::tuple(&[2, 3]).unwrap();
    let tuples = [0i32, 4, 1, 0, 1, -1, 0, 1];
    let updates = [1.0f32, 10.0, 100.0, 1000.0];

    for (config, strategy) in [
        ScatterConfig::for_types::<f32, i32>(),
        ScatterConfig::for_types::<f32, i32>().with_group_duplicates(true),
        ScatterConfig::for_types::<f32, i32>().with_deterministic(true),
    ]
    .into_iter()
    .zip([Strategy::Atomic, Strategy::SortGrouped, Strategy::Deterministic])
    {
        let mut acc = vec![0.0f32; 6];
        let launch = run_scatter(
            &Serial,
            &config.with_index_layout(layout),
            &Tiling::new(1, 4).unwrap(),
            &mut acc,
            &tuples,
            Updates::PerIndex(&updates),
            1,
        );
        assert_eq!(launch, Launch::Completed(strategy));
        assert_eq!(acc, [0.0, 1000.0, 0.0, 10.0, 0.0, 0.0], "{strategy}");
    }
}

#[test]
fn test_rank_seven_tuples() {
    let dims = [2usize; 7];
    let layout = IndexLayout::tuple(&dims).unwrap();
    let tuples = random_tuples(31, &dims, 300);
    let flat = reference_rows(&dims, &tuples);
    let expected_hits = reference_scatter_add(&[0.0; 128], &flat, &[1.0], 1, true, false);

    for (config, strategy) in strategies(layout) {
        let mut acc = vec![0.0f64; 128];
        let launch = run_scatter(
            &ThreadGrid::new(4),
            &config.with_scalar_updates(true),
            &Tiling::new(4, 16).unwrap(),
            &mut acc,
            &tuples,
            Updates::Broadcast(&[1.0]),
            1,
        );
        assert_eq!(launch, Launch::Completed(strategy));
        assert_allclose_f64(&acc, &expected_hits, 0.0, 1e-6, &strategy.to_string());
    }
}

#[test]
fn test_tuple_layout_through_launch_bytes() {
    let dims = [4usize, 4];
    let layout = IndexLayout::tuple(&dims).unwrap();
    let tuples: Vec<i32> = vec![3, 3, 0, 1, 3, 3, 4, 0];
    let updates = [2.0f32, 5.0, 7.0, 100.0];
    let config = ScatterConfig::for_types::<f32, i32>()
        .with_index_layout(layout)
        .with_group_duplicates(true);
    let tiling = Tiling::new(2, 2).unwrap();
    let regions = workspace_layout(&config, Shape::new(16, 1), 4, &tiling);
    let mut ws = Workspace::for_layout(&regions);

    let mut acc = vec![0.0f32; 16];
    let args = RawArgs {
        accumulator: bytemuck::cast_slice_mut(&mut acc),
        indices: bytemuck::cast_slice(&tuples),
        updates: bytemuck::cast_slice(&updates),
        row_len: 1,
    };
    let launch = launch_bytes(&ThreadGrid::new(2), &config, &tiling, args, &mut ws).unwrap();
    assert_eq!(launch, Launch::Completed(Strategy::SortGrouped));
    assert_eq!(acc[15], 9.0);
    assert_eq!(acc[1], 5.0);
    assert_eq!(acc.iter().sum::<f32>(), 14.0);
}
