//! Sort-grouped scatter-add
//!
//! Each chunk is grouped by key first, and the update rows of all duplicates
//! are summed in a unit-local buffer. The accumulator then receives one atomic
//! add per element of each distinct valid row, instead of one per update.
//! Different chunks still race on shared rows, so float results depend on
//! scheduling.

use super::ScatterJob;
use super::sort::KeyGrouper;
use crate::dtype::{AtomicScalar, Element, IndexElement};
use crate::runtime::ParallelFor;
use crate::tiling::Tiling;

struct UnitScratch<I, A> {
    grouper: KeyGrouper<I>,
    sums: Vec<A>,
}

pub(crate) fn scatter<G, I, A>(grid: &G, tiling: &Tiling, job: &ScatterJob<'_, I, A>)
where
    G: ParallelFor,
    I: IndexElement,
    A: AtomicScalar,
{
    let count = job.indices.len();
    let mut scratch: Vec<UnitScratch<I, A>> = (0..tiling.units())
        .map(|_| UnitScratch {
            grouper: KeyGrouper::new(),
            sums: vec![A::zero(); job.row_len],
        })
        .collect();

    grid.run(&mut scratch, |unit, scratch| {
        let UnitScratch { grouper, sums } = scratch;
        for chunk in tiling.chunks_of(unit, count) {
            let range = tiling.chunk_range(chunk, count);
            let grouping = grouper.group(&job.indices[range.clone()]);
            for (key, positions) in grouping.groups() {
                let Some(row) = key.row(job.rows) else {
                    continue;
                };
                sums.fill(A::zero());
                for &pos in positions {
                    let src = job.updates.row(range.start + pos as usize, job.row_len);
                    for (sum, &value) in sums.iter_mut().zip(src) {
                        *sum = sum.accumulate(value);
                    }
                }
                for (cell, &sum) in job.row_cells(row).iter().zip(sums.iter()) {
                    A::atomic_add(cell, job.signed(sum));
                }
            }
        }
    });
}
