//! Common test utilities
#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use scatr::prelude::*;

/// Any of the grid substrates, so one test body can run on all of them
#[derive(Clone, Debug)]
pub enum TestGrid {
    Serial,
    Threads(ThreadGrid),
    #[cfg(feature = "rayon")]
    Rayon(RayonGrid),
}

impl ParallelFor for TestGrid {
    fn name(&self) -> &'static str {
        match self {
            Self::Serial => Serial.name(),
            Self::Threads(grid) => grid.name(),
            #[cfg(feature = "rayon")]
            Self::Rayon(grid) => grid.name(),
        }
    }

    fn run<S, F>(&self, slots: &mut [S], body: F)
    where
        S: Send,
        F: Fn(usize, &mut S) + Send + Sync,
    {
        match self {
            Self::Serial => Serial.run(slots, body),
            Self::Threads(grid) => grid.run(slots, body),
            #[cfg(feature = "rayon")]
            Self::Rayon(grid) => grid.run(slots, body),
        }
    }
}

/// Every substrate, with a couple of thread counts
pub fn all_grids() -> Vec<TestGrid> {
    let mut grids = vec![
        TestGrid::Serial,
        TestGrid::Threads(ThreadGrid::new(2)),
        TestGrid::Threads(ThreadGrid::new(5)),
    ];
    #[cfg(feature = "rayon")]
    {
        grids.push(TestGrid::Rayon(RayonGrid::new()));
        grids.push(TestGrid::Rayon(
            RayonGrid::with_threads(3).expect("rayon pool").with_min_len(2),
        ));
    }
    grids
}

/// Run a scatter-add with a workspace sized by `workspace_layout`
pub fn run_scatter<G, T, I>(
    grid: &G,
    config: &ScatterConfig,
    tiling: &Tiling,
    accumulator: &mut [T],
    indices: &[I],
    updates: Updates<'_, T>,
    row_len: usize,
) -> Launch
where
    G: ParallelFor,
    T: Element,
    I: IndexElement,
{
    let shape = Shape::new(accumulator.len() / row_len, row_len);
    let count = indices.len() / config.index_layout.rank();
    let layout = workspace_layout(config, shape, count, tiling);
    let mut ws = Workspace::for_layout(&layout);
    let args = ScatterArgs {
        accumulator,
        indices,
        updates,
        row_len,
    };
    scatter_add(grid, config, tiling, args, &mut ws).expect("scatter_add failed")
}

/// Sequential f64 reference: `acc[idx[i]] += sign * updates[i]` for valid indices
pub fn reference_scatter_add(
    accumulator: &[f64],
    indices: &[i64],
    updates: &[f64],
    row_len: usize,
    broadcast: bool,
    subtract: bool,
) -> Vec<f64> {
    let rows = accumulator.len() / row_len;
    let mut out = accumulator.to_vec();
    let sign = if subtract { -1.0 } else { 1.0 };
    for (i, &index) in indices.iter().enumerate() {
        if index < 0 || index as usize >= rows {
            continue;
        }
        let row = index as usize;
        for e in 0..row_len {
            let update = if broadcast {
                updates[e]
            } else {
                updates[i * row_len + e]
            };
            out[row * row_len + e] += sign * update;
        }
    }
    out
}

/// Random scatter problem with integer-valued updates
///
/// Integer values keep every partial sum exact in f64 and f32, so all
/// strategies must agree with the reference bit for bit.
pub struct Fixture {
    pub rows: usize,
    pub row_len: usize,
    pub accumulator: Vec<f64>,
    pub indices: Vec<i64>,
    pub updates: Vec<f64>,
}

impl Fixture {
    /// `count` indices in `[-2, rows + 2)`, so some are out of range
    pub fn random(seed: u64, rows: usize, row_len: usize, count: usize) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let accumulator = (0..rows * row_len)
            .map(|_| rng.gen_range(-50i32..50) as f64)
            .collect();
        let indices = (0..count)
            .map(|_| rng.gen_range(-2..rows as i64 + 2))
            .collect();
        let updates = (0..count * row_len)
            .map(|_| rng.gen_range(-100i32..100) as f64)
            .collect();
        Self {
            rows,
            row_len,
            accumulator,
            indices,
            updates,
        }
    }

    /// Expected result of adding every update
    pub fn expected(&self) -> Vec<f64> {
        reference_scatter_add(
            &self.accumulator,
            &self.indices,
            &self.updates,
            self.row_len,
            false,
            false,
        )
    }
}

/// Random real-valued updates in `[-bound, bound]`
pub fn random_updates(seed: u64, len: usize, bound: f64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen_range(-bound..=bound)).collect()
}

/// Assert two f64 slices are close within tolerance
///
/// Uses the formula: |a - b| <= atol + rtol * |b|
pub fn assert_allclose_f64(a: &[f64], b: &[f64], rtol: f64, atol: f64, msg: &str) {
    assert_eq!(a.len(), b.len(), "{}: length mismatch", msg);
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        let diff = (x - y).abs();
        let tol = atol + rtol * y.abs();
        assert!(
            diff <= tol,
            "{}: element {} differs: {} vs {} (diff={}, tol={})",
            msg,
            i,
            x,
            y,
            diff,
            tol
        );
    }
}

/// Assert two f64 slices are bit-identical
pub fn assert_bitwise_eq(a: &[f64], b: &[f64], msg: &str) {
    assert_eq!(a.len(), b.len(), "{}: length mismatch", msg);
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        assert_eq!(
            x.to_bits(),
            y.to_bits(),
            "{}: element {} differs: {} vs {}",
            msg,
            i,
            x,
            y
        );
    }
}
