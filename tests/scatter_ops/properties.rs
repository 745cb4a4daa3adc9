//! Property-based checks over random scatter problems

use crate::common::{Fixture, assert_bitwise_eq, random_updates, reference_scatter_add, run_scatter};
use proptest::prelude::*;
use scatr::kernels::quant::RowScale;
use scatr::kernels::sort::KeyGrouper;
use scatr::prelude::{CommitLayout, ScatterConfig, ThreadGrid, Tiling, Updates};

/// (rows, row_len, count, seed)
fn problem() -> impl Strategy<Value = (usize, usize, usize, u64)> {
    (1usize..24, 1usize..5, 0usize..400, any::<u64>())
}

fn tiling() -> impl Strategy<Value = (usize, usize)> {
    (1usize..9, 1usize..64)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn test_racing_strategies_match_reference(
        (rows, row_len, count, seed) in problem(),
        (units, chunk_len) in tiling(),
        grouped in any::<bool>(),
    ) {
        let fixture = Fixture::random(seed, rows, row_len, count);
        let config = ScatterConfig::for_types::<f64, i64>().with_group_duplicates(grouped);
        let mut acc = fixture.accumulator.clone();
        run_scatter(
            &ThreadGrid::new(3),
            &config,
            &Tiling::new(units, chunk_len).unwrap(),
            &mut acc,
            &fixture.indices,
            Updates::PerIndex(&fixture.updates),
            row_len,
        );
        prop_assert_eq!(acc, fixture.expected());
    }

    #[test]
    fn test_deterministic_ignores_unit_count(
        (rows, row_len, count, seed) in problem(),
        chunk_len in 1usize..64,
        units in 2usize..9,
        by_chunk in any::<bool>(),
    ) {
        let fixture = Fixture::random(seed, rows, row_len, count);
        let updates = random_updates(seed ^ 0x5eed, fixture.updates.len(), 100.0);
        let config = ScatterConfig::for_types::<f64, i64>().with_deterministic(true);
        let commit = if by_chunk { CommitLayout::ByChunk } else { CommitLayout::ByRow };

        let run = |tiling: Tiling| {
            let mut acc = fixture.accumulator.clone();
            run_scatter(
                &ThreadGrid::new(4),
                &config,
                &tiling,
                &mut acc,
                &fixture.indices,
                Updates::PerIndex(&updates),
                row_len,
            );
            acc
        };
        let single = run(Tiling::new(1, chunk_len).unwrap());
        let many = run(Tiling::new(units, chunk_len).unwrap().with_commit(commit));
        assert_bitwise_eq(&many, &single, "units");

        // Each chunk adds at most one partial per row, so the error stays
        // within chunks^2 * magnitude / 2^31 of the exact sum
        let exact = reference_scatter_add(
            &fixture.accumulator, &fixture.indices, &updates, row_len, false, false,
        );
        let chunks = count.div_ceil(chunk_len).max(1) as f64;
        let magnitude = 100.0 * chunk_len as f64;
        let bound = chunks * chunks * magnitude / (1u64 << 31) as f64 + 1e-9;
        for (got, want) in single.iter().zip(&exact) {
            prop_assert!((got - want).abs() <= bound, "{} vs {} (bound {})", got, want, bound);
        }
    }

    #[test]
    fn test_grouping_partitions_positions(keys in prop::collection::vec(-40i64..40, 0..300)) {
        let mut grouper = KeyGrouper::new();
        let grouping = grouper.group(&keys);

        let uniques = grouping.unique_keys();
        prop_assert!(uniques.windows(2).all(|w| w[0] < w[1]));

        let mut seen = vec![false; keys.len()];
        for (key, positions) in grouping.groups() {
            prop_assert!(!positions.is_empty());
            prop_assert!(positions.windows(2).all(|w| w[0] < w[1]));
            for &pos in positions {
                prop_assert_eq!(keys[pos as usize], key);
                prop_assert!(!seen[pos as usize]);
                seen[pos as usize] = true;
            }
        }
        prop_assert!(seen.into_iter().all(|s| s));
    }

    #[test]
    fn test_quantized_sum_within_bound(
        partials in prop::collection::vec(-1.0e6f64..1.0e6, 1..32),
    ) {
        let magnitude = partials.iter().fold(0.0f64, |m, p| m.max(p.abs()));
        let scale = RowScale::new(magnitude, partials.len() as u32);
        let sum: i64 = partials.iter().map(|&p| i64::from(scale.quantize(p))).sum();
        let exact: f64 = partials.iter().sum();
        prop_assert!(sum.unsigned_abs() <= i32::MAX as u64);
        prop_assert!((scale.dequantize(sum) - exact).abs() <= scale.error_bound() + 1e-6);
    }
}
