//! Index tuples to row indices

use super::region;
use crate::dtype::IndexElement;
use crate::error::Result;
use crate::runtime::{Arena, ParallelFor};
use crate::tiling::IndexLayout;

/// Row written for a tuple with an out-of-range coordinate
pub(crate) const INVALID_ROW: i64 = -1;

/// Flatten `indices`, read as tuples of `layout.rank()` coordinates, into one
/// row per tuple. The rows live in workspace and feed every strategy as plain
/// i64 indices, so grouping keys are flattened offsets.
pub(crate) fn flatten_indices<'a, I, G>(
    grid: &G,
    units: usize,
    layout: &IndexLayout,
    indices: &[I],
    arena: &mut Arena<'a>,
) -> Result<&'a [i64]>
where
    I: IndexElement,
    G: ParallelFor,
{
    let rank = layout.rank();
    let count = indices.len() / rank;
    let rows = arena.take::<i64>(region::FLAT_INDICES, count)?;

    let block = count.div_ceil(units.max(1)).max(1);
    let mut blocks: Vec<(&[I], &mut [i64])> = indices
        .chunks(block * rank)
        .zip(rows.chunks_mut(block))
        .collect();
    grid.run(&mut blocks, |_, (tuples, dst)| {
        for (d, tuple) in dst.iter_mut().zip(tuples.chunks_exact(rank)) {
            *d = layout
                .flatten(tuple)
                .and_then(|row| i64::try_from(row).ok())
                .unwrap_or(INVALID_ROW);
        }
    });
    drop(blocks);
    Ok(rows)
}
