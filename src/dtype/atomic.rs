//! Atomic-capable accumulation types
//!
//! Rust has no native atomic float add, so f32/f64 cells are compare-and-swap
//! loops over the IEEE bit pattern held in an `AtomicU32`/`AtomicU64`. This is
//! the same contract a GPU `atomicAdd(float)` offers: every add lands exactly
//! once, the order between units is unspecified.

use super::Element;
use bytemuck::Pod;
use std::sync::atomic::{AtomicI32, AtomicI64, AtomicU32, AtomicU64, Ordering};

/// Element type with an atomic add on the host concurrency substrate.
pub trait AtomicScalar: Element + Pod {
    /// Shared cell type holding one element
    type Cell: Send + Sync;

    /// Atomically add `value` into `cell`
    fn atomic_add(cell: &Self::Cell, value: Self);

    /// Read the current value of `cell`
    fn atomic_load(cell: &Self::Cell) -> Self;

    /// Additive inverse (wrapping for integers)
    fn negate(self) -> Self;

    /// Non-atomic add with the same overflow behaviour as `atomic_add`
    fn accumulate(self, other: Self) -> Self;

    /// View an exclusively borrowed slice as shared atomic cells.
    ///
    /// Returns `None` when the slice is not aligned for the cell type.
    fn as_cells(slice: &mut [Self]) -> Option<&[Self::Cell]>;
}

/// Cell type an accumulator of element type `T` is updated through.
pub type CellOf<T> = <<T as Element>::Accum as AtomicScalar>::Cell;

#[inline]
fn view_as_cells<T, C>(slice: &mut [T]) -> Option<&[C]> {
    if std::mem::size_of::<T>() != std::mem::size_of::<C>() {
        return None;
    }
    let ptr = slice.as_mut_ptr().cast::<C>();
    if !ptr.is_aligned() {
        return None;
    }
    // SAFETY: `C` has the size and bit validity of `T` and `ptr` is aligned for
    // `C`. The exclusive borrow guarantees no other access for the lifetime of
    // the returned shared view, and every mutation goes through `C`'s atomic API.
    Some(unsafe { std::slice::from_raw_parts(ptr, slice.len()) })
}

impl AtomicScalar for f32 {
    type Cell = AtomicU32;

    #[inline]
    fn atomic_add(cell: &AtomicU32, value: f32) {
        let _ = cell.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
            Some((f32::from_bits(bits) + value).to_bits())
        });
    }

    #[inline]
    fn atomic_load(cell: &AtomicU32) -> f32 {
        f32::from_bits(cell.load(Ordering::Relaxed))
    }

    #[inline]
    fn negate(self) -> f32 {
        -self
    }

    #[inline]
    fn accumulate(self, other: f32) -> f32 {
        self + other
    }

    fn as_cells(slice: &mut [f32]) -> Option<&[AtomicU32]> {
        view_as_cells(slice)
    }
}

impl AtomicScalar for f64 {
    type Cell = AtomicU64;

    #[inline]
    fn atomic_add(cell: &AtomicU64, value: f64) {
        let _ = cell.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
            Some((f64::from_bits(bits) + value).to_bits())
        });
    }

    #[inline]
    fn atomic_load(cell: &AtomicU64) -> f64 {
        f64::from_bits(cell.load(Ordering::Relaxed))
    }

    #[inline]
    fn negate(self) -> f64 {
        -self
    }

    #[inline]
    fn accumulate(self, other: f64) -> f64 {
        self + other
    }

    fn as_cells(slice: &mut [f64]) -> Option<&[AtomicU64]> {
        view_as_cells(slice)
    }
}

impl AtomicScalar for i32 {
    type Cell = AtomicI32;

    #[inline]
    fn atomic_add(cell: &AtomicI32, value: i32) {
        cell.fetch_add(value, Ordering::Relaxed);
    }

    #[inline]
    fn atomic_load(cell: &AtomicI32) -> i32 {
        cell.load(Ordering::Relaxed)
    }

    #[inline]
    fn negate(self) -> i32 {
        self.wrapping_neg()
    }

    #[inline]
    fn accumulate(self, other: i32) -> i32 {
        self.wrapping_add(other)
    }

    fn as_cells(slice: &mut [i32]) -> Option<&[AtomicI32]> {
        view_as_cells(slice)
    }
}

impl AtomicScalar for i64 {
    type Cell = AtomicI64;

    #[inline]
    fn atomic_add(cell: &AtomicI64, value: i64) {
        cell.fetch_add(value, Ordering::Relaxed);
    }

    #[inline]
    fn atomic_load(cell: &AtomicI64) -> i64 {
        cell.load(Ordering::Relaxed)
    }

    #[inline]
    fn negate(self) -> i64 {
        self.wrapping_neg()
    }

    #[inline]
    fn accumulate(self, other: i64) -> i64 {
        self.wrapping_add(other)
    }

    fn as_cells(slice: &mut [i64]) -> Option<&[AtomicI64]> {
        view_as_cells(slice)
    }
}
