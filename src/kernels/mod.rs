//! Scatter-add kernels
//!
//! All three strategies run on the accumulation type `A` of the accumulator
//! element (see [`Element::Accum`](crate::dtype::Element)). [`accum`] handles
//! the widening at the edges, so the strategy kernels only see atomic cells and
//! `A`-typed update rows.
//!
//! - [`atomic`]: one atomic add per valid update element
//! - [`grouped`]: group duplicates per chunk, one atomic add per distinct row
//! - [`deterministic`]: group, quantize, merge, commit; bit-reproducible
//!
//! Invalid indices (negative or `>= rows`) are skipped by every strategy.
//! Index tuples are flattened into plain rows by [`flatten`] first.

pub(crate) mod accum;
pub(crate) mod atomic;
pub(crate) mod deterministic;
pub(crate) mod flatten;
pub(crate) mod grouped;
pub mod quant;
pub mod sort;

use crate::dtype::AtomicScalar;

/// Workspace region names, in carve order
pub(crate) mod region {
    pub const ACCUMULATOR_SHADOW: &str = "accumulator shadow";
    pub const WIDENED_UPDATES: &str = "widened updates";
    pub const FLAT_INDICES: &str = "flattened indices";
    pub const REFERENCE_MAGNITUDES: &str = "reference magnitudes";
    pub const REPEAT_COUNTS: &str = "repeat counts";
    pub const QUANTIZED_SUMS: &str = "quantized sums";
    pub const CHUNK_PARTIALS: &str = "chunk partials";
    pub const CHUNK_KEYS: &str = "chunk keys";
    pub const CHUNK_UNIQUE_COUNTS: &str = "chunk unique counts";
}

/// Update rows of a scatter-add
#[derive(Clone, Copy, Debug)]
pub enum Updates<'a, T> {
    /// One row of `row_len` elements per index (`count * row_len` total)
    PerIndex(&'a [T]),
    /// A single row of `row_len` elements applied at every index
    Broadcast(&'a [T]),
}

impl<'a, T> Updates<'a, T> {
    /// Update row applied at position `i`
    #[inline]
    pub fn row(&self, i: usize, row_len: usize) -> &'a [T] {
        match *self {
            Self::PerIndex(data) => &data[i * row_len..(i + 1) * row_len],
            Self::Broadcast(data) => data,
        }
    }

    /// Underlying buffer
    pub fn data(&self) -> &'a [T] {
        match *self {
            Self::PerIndex(data) | Self::Broadcast(data) => data,
        }
    }

    /// Returns true for a broadcast row
    pub fn is_broadcast(&self) -> bool {
        matches!(self, Self::Broadcast(_))
    }

    /// Expected buffer length for `count` indices
    pub fn expected_len(&self, count: usize, row_len: usize) -> usize {
        match self {
            Self::PerIndex(_) => count * row_len,
            Self::Broadcast(_) => row_len,
        }
    }
}

/// Everything a strategy kernel needs, in accumulation type `A`
pub(crate) struct ScatterJob<'a, I, A: AtomicScalar> {
    pub cells: &'a [A::Cell],
    pub indices: &'a [I],
    pub updates: Updates<'a, A>,
    pub rows: usize,
    pub row_len: usize,
    pub subtract: bool,
}

impl<I, A: AtomicScalar> ScatterJob<'_, I, A> {
    /// Accumulator cells of `row`
    #[inline]
    pub fn row_cells(&self, row: usize) -> &[A::Cell] {
        &self.cells[row * self.row_len..(row + 1) * self.row_len]
    }

    /// Apply the subtract flag
    #[inline]
    pub fn signed(&self, value: A) -> A {
        if self.subtract { value.negate() } else { value }
    }
}
