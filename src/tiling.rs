//! Launch sizing
//!
//! The kernels trust a [`Tiling`] (unit count, chunk length, commit layout)
//! and a [`Workspace`](crate::runtime::Workspace) sized by
//! [`workspace_layout`]. This module derives both from the problem shape.
//!
//! Chunks are contiguous slices of the index array. Chunk `c` covers
//! `[c * chunk_len, min((c + 1) * chunk_len, count))` and belongs to unit
//! `c % units`. With an [`IndexLayout`] of rank K, `count` counts K-tuples.

use crate::dtype::{DType, IndexElement};
use crate::error::{Error, Result};
use crate::kernels::region;
use crate::ops::{ScatterConfig, Strategy, select_strategy};
use crate::runtime::WorkspaceLayout;
use std::ops::Range;

/// Default lower bound on the chunk length picked by [`Tiling::plan`]
pub const DEFAULT_MIN_CHUNK_LEN: usize = 256;

/// Accumulator shape: `rows` rows of `row_len` elements
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Shape {
    /// Number of accumulator rows (N)
    pub rows: usize,
    /// Elements per row (D)
    pub row_len: usize,
}

impl Shape {
    /// Shape with `rows` rows of `row_len` elements
    pub fn new(rows: usize, row_len: usize) -> Self {
        Self { rows, row_len }
    }

    /// Total element count (N * D)
    pub fn numel(&self) -> usize {
        self.rows * self.row_len
    }
}

/// Most coordinates one index tuple can carry
pub const MAX_INDEX_RANK: usize = 7;

/// How the index array addresses accumulator rows.
///
/// A flat layout reads one index per row. A tuple layout reads K consecutive
/// indices as coordinates into the K leading accumulator dims `dims`; the
/// accumulator has `dims[0] * .. * dims[K-1]` rows in row-major order, and
/// each tuple is flattened with strides `dims[k+1] * .. * dims[K-1]`.
///
/// A tuple with any coordinate outside `[0, dims[k])` is ignored as a whole,
/// even when its flattened offset would land inside the accumulator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct IndexLayout {
    dims: [usize; MAX_INDEX_RANK],
    // 0 for flat indices
    rank: usize,
}

impl Default for IndexLayout {
    fn default() -> Self {
        Self::flat()
    }
}

impl IndexLayout {
    /// One row index per update
    pub const fn flat() -> Self {
        Self {
            dims: [0; MAX_INDEX_RANK],
            rank: 0,
        }
    }

    /// Tuples of `dims.len()` coordinates into the leading dims `dims`
    pub fn tuple(dims: &[usize]) -> Result<Self> {
        if dims.is_empty() || dims.len() > MAX_INDEX_RANK {
            return Err(Error::invalid_argument(
                "index_layout",
                format!("rank must be in [1, {MAX_INDEX_RANK}], got {}", dims.len()),
            ));
        }
        if dims.iter().try_fold(1usize, |rows, &d| rows.checked_mul(d)).is_none() {
            return Err(Error::invalid_argument(
                "index_layout",
                format!("row count of dims {dims:?} overflows usize"),
            ));
        }
        let mut layout = Self {
            dims: [0; MAX_INDEX_RANK],
            rank: dims.len(),
        };
        layout.dims[..dims.len()].copy_from_slice(dims);
        Ok(layout)
    }

    /// Index elements per tuple (1 for flat indices)
    pub fn rank(&self) -> usize {
        self.rank.max(1)
    }

    /// Leading dims addressed by a tuple; empty for flat indices
    pub fn dims(&self) -> &[usize] {
        &self.dims[..self.rank]
    }

    /// Returns true if every index names a row directly
    pub fn is_flat(&self) -> bool {
        self.rank <= 1
    }

    /// Row count the layout addresses, `None` for flat indices
    pub fn rows(&self) -> Option<usize> {
        if self.rank == 0 {
            return None;
        }
        // `tuple` rejected overflowing products
        Some(self.dims().iter().product())
    }

    /// Number of tuples in an index array of `len` elements, or `None` when
    /// `len` is not a whole number of tuples
    pub fn tuple_count(&self, len: usize) -> Option<usize> {
        let rank = self.rank();
        (len % rank == 0).then(|| len / rank)
    }

    /// Row addressed by `tuple`, or `None` if any coordinate is out of range
    pub(crate) fn flatten<I: IndexElement>(&self, tuple: &[I]) -> Option<usize> {
        debug_assert_eq!(tuple.len(), self.rank);
        tuple
            .iter()
            .zip(self.dims())
            .try_fold(0usize, |offset, (&coord, &dim)| Some(offset * dim + coord.row(dim)?))
    }
}

/// Partitioning of the deterministic commit stage
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CommitLayout {
    /// `ByChunk` when there are fewer indices than rows, `ByRow` otherwise
    #[default]
    Auto,
    /// Units own contiguous blocks of accumulator rows
    ByRow,
    /// Units commit the distinct rows of the chunks they own
    ByChunk,
}

impl CommitLayout {
    /// Concrete layout for `count` indices into `rows` rows
    pub fn resolve(self, count: usize, rows: usize) -> Self {
        match self {
            Self::Auto if count < rows => Self::ByChunk,
            Self::Auto => Self::ByRow,
            layout => layout,
        }
    }
}

/// Grid and chunk configuration of one launch
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Tiling {
    units: usize,
    chunk_len: usize,
    commit: CommitLayout,
}

impl Tiling {
    /// Tiling with `units` compute units and chunks of `chunk_len` indices
    pub fn new(units: usize, chunk_len: usize) -> Result<Self> {
        if units == 0 {
            return Err(Error::invalid_argument("units", "must be at least 1"));
        }
        if chunk_len == 0 || u32::try_from(chunk_len).is_err() {
            return Err(Error::invalid_argument(
                "chunk_len",
                format!("must be in [1, {}], got {chunk_len}", u32::MAX),
            ));
        }
        Ok(Self {
            units,
            chunk_len,
            commit: CommitLayout::Auto,
        })
    }

    /// Derive a tiling for `count` indices scattered into `shape`
    pub fn plan(shape: Shape, count: usize, hints: &TilingHints) -> Self {
        let units = hints.units.unwrap_or_else(available_units).max(1);
        let min_chunk = hints.min_chunk_len.clamp(1, u32::MAX as usize);
        let target = count.div_ceil(units * hints.chunks_per_unit.max(1));
        let chunk_len = target.clamp(min_chunk, u32::MAX as usize);
        let chunks = count.div_ceil(chunk_len);

        let tiling = Self {
            units: units.min(chunks).max(1),
            chunk_len,
            commit: hints.commit,
        };
        log::debug!(
            "tiling for {}x{} <- {count}: {} units, chunk_len {}",
            shape.rows,
            shape.row_len,
            tiling.units,
            tiling.chunk_len
        );
        tiling
    }

    /// Set the deterministic commit layout
    pub fn with_commit(mut self, commit: CommitLayout) -> Self {
        self.commit = commit;
        self
    }

    /// Number of compute units
    pub fn units(&self) -> usize {
        self.units
    }

    /// Indices per chunk
    pub fn chunk_len(&self) -> usize {
        self.chunk_len
    }

    /// Requested commit layout
    pub fn commit(&self) -> CommitLayout {
        self.commit
    }

    /// Number of chunks covering `count` indices
    #[inline]
    pub fn chunk_count(&self, count: usize) -> usize {
        count.div_ceil(self.chunk_len)
    }

    /// Index range of chunk `chunk`
    #[inline]
    pub fn chunk_range(&self, chunk: usize, count: usize) -> Range<usize> {
        let start = chunk * self.chunk_len;
        start..(start + self.chunk_len).min(count)
    }

    /// Chunks owned by `unit`, in program order
    #[inline]
    pub fn chunks_of(&self, unit: usize, count: usize) -> impl Iterator<Item = usize> + use<> {
        (unit..self.chunk_count(count)).step_by(self.units)
    }

    /// Contiguous block of rows `unit` owns in a row-partitioned stage
    pub fn rows_of(&self, unit: usize, rows: usize) -> Range<usize> {
        let per_unit = rows.div_ceil(self.units);
        let start = (unit * per_unit).min(rows);
        start..(start + per_unit).min(rows)
    }
}

/// Knobs for [`Tiling::plan`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TilingHints {
    /// Compute units to use; the machine's parallelism when `None`
    pub units: Option<usize>,
    /// Lower bound on the chunk length
    pub min_chunk_len: usize,
    /// Chunks each unit should get, for load balance
    pub chunks_per_unit: usize,
    /// Commit layout of the deterministic path
    pub commit: CommitLayout,
}

impl Default for TilingHints {
    fn default() -> Self {
        Self {
            units: None,
            min_chunk_len: DEFAULT_MIN_CHUNK_LEN,
            chunks_per_unit: 4,
            commit: CommitLayout::Auto,
        }
    }
}

impl TilingHints {
    /// Fix the number of compute units
    pub fn with_units(mut self, units: usize) -> Self {
        self.units = Some(units);
        self
    }

    /// Set the minimum chunk length
    pub fn with_min_chunk_len(mut self, min_chunk_len: usize) -> Self {
        self.min_chunk_len = min_chunk_len;
        self
    }
}

fn available_units() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1)
}

/// Heuristic for enabling duplicate grouping.
///
/// Grouping pays off when each row is hit many times per chunk: many more
/// indices than rows, or very wide rows with a moderate duplicate ratio.
pub fn prefers_grouping(shape: Shape, count: usize) -> bool {
    count > 10 * shape.rows || (shape.row_len >= 100_000 && count > 128 && count > 3 * shape.rows)
}

/// Workspace regions a launch of `config` needs, in carve order.
///
/// `count` is the number of index tuples. Unmatched configurations need no
/// workspace.
pub fn workspace_layout(
    config: &ScatterConfig,
    shape: Shape,
    count: usize,
    tiling: &Tiling,
) -> WorkspaceLayout {
    let mut layout = WorkspaceLayout::new();
    let (Some(strategy), Some(accum)) =
        (select_strategy(config), config.accumulator.accumulation_dtype())
    else {
        return layout;
    };

    if !config.accumulator.supports_in_place_atomics() {
        layout.push(region::ACCUMULATOR_SHADOW, accum.size_in_bytes(), shape.numel());
    }
    if !config.accumulator.has_native_atomic_add() {
        let len = if config.scalar_updates {
            shape.row_len
        } else {
            count * shape.row_len
        };
        layout.push(region::WIDENED_UPDATES, accum.size_in_bytes(), len);
    }
    // Tuples are flattened to i64 rows before any strategy runs
    let key = if config.index_layout.is_flat() {
        config.index
    } else {
        layout.push(region::FLAT_INDICES, DType::I64.size_in_bytes(), count);
        DType::I64
    };
    if strategy == Strategy::Deterministic {
        layout.push(region::REFERENCE_MAGNITUDES, 8, shape.numel());
        layout.push(region::REPEAT_COUNTS, 4, shape.rows);
        layout.push(region::QUANTIZED_SUMS, 4, shape.numel());
        layout.push(region::CHUNK_PARTIALS, DType::F64.size_in_bytes(), count * shape.row_len);
        layout.push(region::CHUNK_KEYS, key.size_in_bytes(), count);
        layout.push(region::CHUNK_UNIQUE_COUNTS, 4, tiling.chunk_count(count));
    }
    layout
}
