//! Concrete scenarios run under every strategy and substrate

use crate::common::{Fixture, all_grids, assert_allclose_f64, run_scatter};
use scatr::prelude::*;

fn configs() -> Vec<ScatterConfig> {
    let base = ScatterConfig::for_types::<f64, i64>();
    vec![
        base,
        base.with_group_duplicates(true),
        base.with_deterministic(true),
    ]
}

fn with_scalar(config: ScatterConfig) -> ScatterConfig {
    config.with_scalar_updates(true)
}

#[test]
fn test_end_to_end() {
    let indices = [0i64, 1, 0, 3, 1];
    let updates = [1.0, 2.0, 3.0, 4.0, 5.0];
    for grid in all_grids() {
        for config in configs() {
            for (units, chunk_len) in [(1, 8), (2, 2), (3, 1)] {
                let tiling = Tiling::new(units, chunk_len).unwrap();
                let mut acc = vec![0.0; 4];
                let launch = run_scatter(
                    &grid,
                    &config,
                    &tiling,
                    &mut acc,
                    &indices,
                    Updates::PerIndex(&updates),
                    1,
                );
                assert!(launch.is_completed());
                let msg = format!("{} {:?} units={units} chunk={chunk_len}", grid.name(), launch);
                assert_allclose_f64(&acc, &[4.0, 7.0, 0.0, 4.0], 0.0, 1e-7, &msg);
            }
        }
    }
}

#[test]
fn test_scalar_broadcast() {
    for grid in all_grids() {
        for config in configs() {
            let tiling = Tiling::new(2, 1).unwrap();
            let mut acc = vec![0.0; 8];
            run_scatter(
                &grid,
                &with_scalar(config),
                &tiling,
                &mut acc,
                &[2i64, 2, 5],
                Updates::Broadcast(&[3.0]),
                1,
            );
            let mut expected = vec![0.0; 8];
            expected[2] = 6.0;
            expected[5] = 3.0;
            assert_allclose_f64(&acc, &expected, 0.0, 1e-7, grid.name());
        }
    }
}

#[test]
fn test_subtract() {
    for grid in all_grids() {
        for config in configs() {
            let tiling = Tiling::new(1, 4).unwrap();
            let mut acc = vec![10.0];
            run_scatter(
                &grid,
                &config.with_subtract(true),
                &tiling,
                &mut acc,
                &[0i64, 0],
                Updates::PerIndex(&[1.0, 2.0]),
                1,
            );
            // Single chunk: exact for every strategy
            assert_eq!(acc, [7.0], "{}", grid.name());
        }
    }
}

#[test]
fn test_empty_input_leaves_accumulator() {
    for grid in all_grids() {
        for config in configs() {
            let tiling = Tiling::new(4, 16).unwrap();
            let mut acc = vec![1.5, -2.5, 3.25];
            let launch = run_scatter(
                &grid,
                &config,
                &tiling,
                &mut acc,
                &[] as &[i64],
                Updates::PerIndex(&[]),
                1,
            );
            assert!(launch.is_completed());
            assert_eq!(acc, [1.5, -2.5, 3.25]);
        }
    }
}

#[test]
fn test_index_filtering() {
    // -1 and N must never touch anything
    let indices = [-1i64, 3, 1, 4, i64::MIN, i64::MAX];
    let updates = [100.0, 100.0, 2.0, 100.0, 100.0, 100.0];
    for grid in all_grids() {
        for config in configs() {
            let tiling = Tiling::new(2, 2).unwrap();
            let mut acc = vec![1.0, 1.0, 1.0];
            run_scatter(
                &grid,
                &config,
                &tiling,
                &mut acc,
                &indices,
                Updates::PerIndex(&updates),
                1,
            );
            assert_eq!(acc, [1.0, 3.0, 1.0], "{}", grid.name());
        }
    }
}

#[test]
fn test_wide_rows_match_reference() {
    let fixture = Fixture::random(7, 13, 9, 300);
    let expected = fixture.expected();
    for grid in all_grids() {
        for config in configs() {
            for (units, chunk_len) in [(1, 1000), (4, 16), (7, 5)] {
                let tiling = Tiling::new(units, chunk_len).unwrap();
                let mut acc = fixture.accumulator.clone();
                run_scatter(
                    &grid,
                    &config,
                    &tiling,
                    &mut acc,
                    &fixture.indices,
                    Updates::PerIndex(&fixture.updates),
                    fixture.row_len,
                );
                // Deterministic results carry the quantization error
                let msg = format!("{} units={units} chunk={chunk_len}", grid.name());
                assert_allclose_f64(&acc, &expected, 1e-9, 1e-3, &msg);
            }
        }
    }
}

#[test]
fn test_racing_strategies_exact_on_integer_values() {
    let fixture = Fixture::random(11, 20, 3, 500);
    let expected = fixture.expected();
    let base = ScatterConfig::for_types::<f64, i64>();
    for grid in all_grids() {
        for config in [base, base.with_group_duplicates(true)] {
            let tiling = Tiling::new(3, 37).unwrap();
            let mut acc = fixture.accumulator.clone();
            run_scatter(
                &grid,
                &config,
                &tiling,
                &mut acc,
                &fixture.indices,
                Updates::PerIndex(&fixture.updates),
                fixture.row_len,
            );
            assert_eq!(acc, expected, "{}", grid.name());
        }
    }
}

#[test]
fn test_out_of_place() {
    let input = vec![1.0f32, 2.0, 3.0];
    let mut output = vec![0.0f32; 3];
    let config = ScatterConfig::for_types::<f32, i32>().with_group_duplicates(true);
    let tiling = Tiling::new(2, 1).unwrap();
    let mut ws = Workspace::new(0);
    let args = ScatterArgs {
        accumulator: &mut output,
        indices: &[2i32, 0, 2],
        updates: Updates::PerIndex(&[1.0, 1.0, 1.0]),
        row_len: 1,
    };
    let launch = scatter_add_out(&Serial, &config, &tiling, &input, args, &mut ws).unwrap();
    assert_eq!(launch, Launch::Completed(Strategy::SortGrouped));
    assert_eq!(input, [1.0, 2.0, 3.0]);
    assert_eq!(output, [2.0, 2.0, 5.0]);
}
