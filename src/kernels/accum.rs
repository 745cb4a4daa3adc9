//! Accumulator and update views in the accumulation type
//!
//! Natively atomic accumulators (f32, f64, i32, i64) are updated in place
//! through atomic cells. Everything else is copied into a widened shadow in
//! workspace, updated there, and narrowed back once every unit has finished.

use super::Updates;
use super::region;
use crate::dtype::{AtomicScalar, CellOf, Element};
use crate::error::{Error, Result};
use crate::runtime::{Arena, ParallelFor};

/// Atomic view of an accumulator of element type `T`
pub(crate) struct AccumView<'a, T: Element> {
    cells: &'a [CellOf<T>],
    shadow_of: Option<&'a mut [T]>,
}

impl<'a, T: Element> AccumView<'a, T> {
    /// Open `accumulator` for atomic updates, widening into `arena` if needed
    pub fn open<G: ParallelFor>(
        grid: &G,
        units: usize,
        accumulator: &'a mut [T],
        arena: &mut Arena<'a>,
    ) -> Result<Self> {
        if T::DTYPE.supports_in_place_atomics() {
            let native = T::as_accum_mut(accumulator)
                .ok_or_else(|| Error::Backend(format!("{} is not viewable in place", T::DTYPE)))?;
            let cells = T::Accum::as_cells(native)
                .ok_or_else(|| Error::Backend("accumulator misaligned for atomics".into()))?;
            return Ok(Self {
                cells,
                shadow_of: None,
            });
        }

        let shadow = arena.take::<T::Accum>(region::ACCUMULATOR_SHADOW, accumulator.len())?;
        let block = accumulator.len().div_ceil(units.max(1)).max(1);
        let mut blocks: Vec<(&mut [T], &mut [T::Accum])> = accumulator
            .chunks_mut(block)
            .zip(shadow.chunks_mut(block))
            .collect();
        grid.run(&mut blocks, |_, (src, dst)| {
            for (d, &s) in dst.iter_mut().zip(src.iter()) {
                *d = s.widen();
            }
        });
        drop(blocks);

        let cells = T::Accum::as_cells(shadow)
            .ok_or_else(|| Error::Backend("workspace region misaligned for atomics".into()))?;
        Ok(Self {
            cells,
            shadow_of: Some(accumulator),
        })
    }

    /// Atomic cells, one per accumulator element
    pub fn cells(&self) -> &'a [CellOf<T>] {
        self.cells
    }

    /// Returns true if updates land in a widened copy
    pub fn is_shadowed(&self) -> bool {
        self.shadow_of.is_some()
    }

    /// Narrow the shadow back into the accumulator; no-op for in-place views
    pub fn commit<G: ParallelFor>(self, grid: &G, units: usize) {
        let Some(target) = self.shadow_of else {
            return;
        };
        let block = target.len().div_ceil(units.max(1)).max(1);
        let mut blocks: Vec<(&mut [T], &[CellOf<T>])> = target
            .chunks_mut(block)
            .zip(self.cells.chunks(block))
            .collect();
        grid.run(&mut blocks, |_, (dst, cells)| {
            for (d, cell) in dst.iter_mut().zip(cells.iter()) {
                *d = T::narrow(T::Accum::atomic_load(cell));
            }
        });
    }
}

/// Updates in the accumulation type of `T`.
///
/// Native element types are reinterpreted without copying; others are widened
/// into a workspace region.
pub(crate) fn widen_updates<'a, T: Element, G: ParallelFor>(
    grid: &G,
    units: usize,
    updates: Updates<'a, T>,
    arena: &mut Arena<'a>,
) -> Result<Updates<'a, T::Accum>> {
    let data = updates.data();
    let widened: &'a [T::Accum] = if T::DTYPE.has_native_atomic_add() {
        T::as_accum(data)
            .ok_or_else(|| Error::Backend(format!("{} updates are not viewable in place", T::DTYPE)))?
    } else {
        let region = arena.take::<T::Accum>(region::WIDENED_UPDATES, data.len())?;
        let block = data.len().div_ceil(units.max(1)).max(1);
        let mut blocks: Vec<(&[T], &mut [T::Accum])> =
            data.chunks(block).zip(region.chunks_mut(block)).collect();
        grid.run(&mut blocks, |_, (src, dst)| {
            for (d, &s) in dst.iter_mut().zip(src.iter()) {
                *d = s.widen();
            }
        });
        drop(blocks);
        region
    };

    Ok(match updates {
        Updates::PerIndex(_) => Updates::PerIndex(widened),
        Updates::Broadcast(_) => Updates::Broadcast(widened),
    })
}
