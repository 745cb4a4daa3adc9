//! Unsorted atomic scatter-add

use super::ScatterJob;
use crate::dtype::{AtomicScalar, IndexElement};
use crate::runtime::ParallelFor;
use crate::tiling::Tiling;

/// Add every valid update row into the accumulator with one atomic add per
/// element. Float results depend on scheduling.
pub(crate) fn scatter<G, I, A>(grid: &G, tiling: &Tiling, job: &ScatterJob<'_, I, A>)
where
    G: ParallelFor,
    I: IndexElement,
    A: AtomicScalar,
{
    let count = job.indices.len();
    grid.for_each_unit(tiling.units(), |unit| {
        for chunk in tiling.chunks_of(unit, count) {
            for i in tiling.chunk_range(chunk, count) {
                let Some(row) = job.indices[i].row(job.rows) else {
                    continue;
                };
                let src = job.updates.row(i, job.row_len);
                for (cell, &value) in job.row_cells(row).iter().zip(src) {
                    A::atomic_add(cell, job.signed(value));
                }
            }
        }
    });
}
