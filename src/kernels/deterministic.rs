//! Deterministic three-stage scatter-add
//!
//! Stages run back to back on the grid; the join at the end of each
//! [`ParallelFor::run`] is the barrier between them.
//!
//! 1. **Group and publish.** Every chunk is grouped by key and the duplicates
//!    of each key are summed in `f64`, in stable sorted order. The partial row
//!    and its key go into the chunk's private workspace slot. For valid keys
//!    the unit publishes `|partial|` per element into the reference magnitude
//!    table (atomic max) and bumps the row's repeat count.
//! 2. **Quantized merge.** Every stored partial is quantized against its
//!    [`RowScale`] and added into the `i32` table.
//! 3. **Commit.** Each touched row is claimed by swapping its repeat count to
//!    zero; the claimer dequantizes the row and performs exactly one atomic add
//!    per element into the accumulator.
//!
//! Max, count and integer add are order-independent, so for a fixed chunk
//! layout the committed values do not depend on unit count, thread count or
//! scheduling. Changing the chunk length changes the partials and may change
//! the result within the quantization error bound.

use super::ScatterJob;
use super::quant::RowScale;
use super::region;
use super::sort::KeyGrouper;
use crate::dtype::{AtomicScalar, Element, IndexElement};
use crate::error::Result;
use crate::runtime::{Arena, ParallelFor};
use crate::tiling::{CommitLayout, Tiling};
use std::sync::atomic::{AtomicI32, AtomicU32, AtomicU64, Ordering};

/// Private workspace slot of one chunk
struct ChunkSlot<'a, I> {
    chunk: usize,
    partials: &'a mut [f64],
    keys: &'a mut [I],
    unique: &'a mut u32,
}

impl<I: IndexElement> ChunkSlot<'_, I> {
    fn stored(&self, row_len: usize) -> impl Iterator<Item = (I, &[f64])> {
        let unique = *self.unique as usize;
        self.keys[..unique]
            .iter()
            .copied()
            .zip(self.partials.chunks_exact(row_len.max(1)))
    }
}

struct UnitState<'a, I> {
    grouper: KeyGrouper<I>,
    chunks: Vec<ChunkSlot<'a, I>>,
}

/// Shared per-row tables
struct RowTables<'a> {
    magnitudes: &'a [AtomicU64],
    counts: &'a [AtomicU32],
    sums: &'a [AtomicI32],
}

impl RowTables<'_> {
    fn scale(&self, offset: usize, count: u32) -> RowScale {
        RowScale::new(
            f64::from_bits(self.magnitudes[offset].load(Ordering::Relaxed)),
            count,
        )
    }
}

pub(crate) fn scatter<'a, G, I, A>(
    grid: &G,
    tiling: &Tiling,
    job: &ScatterJob<'_, I, A>,
    arena: &mut Arena<'a>,
) -> Result<()>
where
    G: ParallelFor,
    I: IndexElement,
    A: AtomicScalar,
{
    let count = job.indices.len();
    let row_len = job.row_len;
    let elems = job.rows * row_len;

    let tables = RowTables {
        magnitudes: arena.take_atomic::<AtomicU64>(region::REFERENCE_MAGNITUDES, elems)?,
        counts: arena.take_atomic::<AtomicU32>(region::REPEAT_COUNTS, job.rows)?,
        sums: arena.take_atomic::<AtomicI32>(region::QUANTIZED_SUMS, elems)?,
    };
    let partials = arena.take::<f64>(region::CHUNK_PARTIALS, count * row_len)?;
    let keys = arena.take::<I>(region::CHUNK_KEYS, count)?;
    let uniques = arena.take::<u32>(region::CHUNK_UNIQUE_COUNTS, tiling.chunk_count(count))?;

    let mut units: Vec<UnitState<'a, I>> = (0..tiling.units())
        .map(|_| UnitState {
            grouper: KeyGrouper::new(),
            chunks: Vec::new(),
        })
        .collect();
    let chunk_len = tiling.chunk_len();
    let slots = partials
        .chunks_mut((chunk_len * row_len).max(1))
        .zip(keys.chunks_mut(chunk_len))
        .zip(uniques.iter_mut())
        .enumerate();
    for (chunk, ((partials, keys), unique)) in slots {
        units[chunk % tiling.units()].chunks.push(ChunkSlot {
            chunk,
            partials,
            keys,
            unique,
        });
    }

    log::trace!("deterministic: group and publish");
    grid.run(&mut units, |_, state| {
        let UnitState { grouper, chunks } = state;
        for slot in chunks.iter_mut() {
            group_chunk(tiling, job, &tables, grouper, slot);
        }
    });

    log::trace!("deterministic: quantized merge");
    grid.run(&mut units, |_, state| {
        for slot in &state.chunks {
            for (key, partial) in slot.stored(row_len) {
                let Some(row) = key.row(job.rows) else {
                    continue;
                };
                let repeat = tables.counts[row].load(Ordering::Relaxed);
                for (e, &value) in partial.iter().enumerate() {
                    let offset = row * row_len + e;
                    let q = tables.scale(offset, repeat).quantize(value);
                    tables.sums[offset].fetch_add(q, Ordering::Relaxed);
                }
            }
        }
    });

    let layout = tiling.commit().resolve(count, job.rows);
    log::trace!("deterministic: commit {layout:?}");
    match layout {
        CommitLayout::ByChunk => grid.run(&mut units, |_, state| {
            for slot in &state.chunks {
                for (key, _) in slot.stored(row_len) {
                    if let Some(row) = key.row(job.rows) {
                        commit_row(job, &tables, row);
                    }
                }
            }
        }),
        CommitLayout::ByRow | CommitLayout::Auto => {
            grid.for_each_unit(tiling.units(), |unit| {
                for row in tiling.rows_of(unit, job.rows) {
                    commit_row(job, &tables, row);
                }
            })
        }
    }
    Ok(())
}

fn group_chunk<I, A>(
    tiling: &Tiling,
    job: &ScatterJob<'_, I, A>,
    tables: &RowTables<'_>,
    grouper: &mut KeyGrouper<I>,
    slot: &mut ChunkSlot<'_, I>,
) where
    I: IndexElement,
    A: AtomicScalar,
{
    let row_len = job.row_len;
    let range = tiling.chunk_range(slot.chunk, job.indices.len());
    let grouping = grouper.group(&job.indices[range.clone()]);

    for (u, (key, positions)) in grouping.groups().enumerate() {
        let partial = &mut slot.partials[u * row_len..(u + 1) * row_len];
        for &pos in positions {
            let src = job.updates.row(range.start + pos as usize, row_len);
            for (acc, &value) in partial.iter_mut().zip(src) {
                *acc += value.to_f64();
            }
        }
        if job.subtract {
            partial.iter_mut().for_each(|v| *v = -*v);
        }
        slot.keys[u] = key;

        if let Some(row) = key.row(job.rows) {
            for (e, &value) in partial.iter().enumerate() {
                tables.magnitudes[row * row_len + e]
                    .fetch_max(value.abs().to_bits(), Ordering::Relaxed);
            }
            tables.counts[row].fetch_add(1, Ordering::Relaxed);
        }
    }
    *slot.unique = grouping.unique_count() as u32;
}

fn commit_row<I, A: AtomicScalar>(job: &ScatterJob<'_, I, A>, tables: &RowTables<'_>, row: usize) {
    let repeat = tables.counts[row].swap(0, Ordering::Relaxed);
    if repeat == 0 {
        return;
    }
    for (e, cell) in job.row_cells(row).iter().enumerate() {
        let offset = row * job.row_len + e;
        let sum = tables.sums[offset].load(Ordering::Relaxed);
        let value = tables.scale(offset, repeat).dequantize(i64::from(sum));
        A::atomic_add(cell, A::from_f64(value));
    }
}
