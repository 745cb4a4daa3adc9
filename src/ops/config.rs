//! Launch configuration and strategy selection

use crate::dtype::{DType, Element, IndexElement};
use crate::tiling::{IndexLayout, Shape};
use std::fmt;

/// Addressing class of a launch
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AddressWidth {
    /// Offsets must fit in `i32`
    Narrow,
    /// 64-bit offsets
    #[default]
    Wide,
}

/// Static description of a scatter-add launch.
///
/// The dtypes are runtime tags; the typed entry point checks them against
/// the buffers it is given.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ScatterConfig {
    /// Accumulator (and update) element type
    pub accumulator: DType,
    /// Index element type
    pub index: DType,
    /// Row numbers or coordinate tuples
    pub index_layout: IndexLayout,
    /// Addressing class
    pub address: AddressWidth,
    /// Updates are one row broadcast to every index
    pub scalar_updates: bool,
    /// Subtract updates instead of adding them
    pub subtract: bool,
    /// Require bit-reproducible output
    pub deterministic: bool,
    /// Group duplicate indices per chunk before the atomic add
    pub group_duplicates: bool,
}

impl ScatterConfig {
    /// Plain atomic scatter-add of `accumulator` elements at `index` indices
    pub fn new(accumulator: DType, index: DType) -> Self {
        Self {
            accumulator,
            index,
            index_layout: IndexLayout::flat(),
            address: AddressWidth::Wide,
            scalar_updates: false,
            subtract: false,
            deterministic: false,
            group_duplicates: false,
        }
    }

    /// Configuration for accumulator type `T` and index type `I`
    pub fn for_types<T: Element, I: IndexElement>() -> Self {
        Self::new(T::DTYPE, I::DTYPE)
    }

    /// Read indices as coordinate tuples (or row numbers again)
    pub fn with_index_layout(mut self, layout: IndexLayout) -> Self {
        self.index_layout = layout;
        self
    }

    /// Set the addressing class
    pub fn with_address(mut self, address: AddressWidth) -> Self {
        self.address = address;
        self
    }

    /// Set scalar (broadcast) update mode
    pub fn with_scalar_updates(mut self, scalar: bool) -> Self {
        self.scalar_updates = scalar;
        self
    }

    /// Set subtract mode
    pub fn with_subtract(mut self, subtract: bool) -> Self {
        self.subtract = subtract;
        self
    }

    /// Request bit-reproducible output
    pub fn with_deterministic(mut self, deterministic: bool) -> Self {
        self.deterministic = deterministic;
        self
    }

    /// Group duplicates per chunk (ignored when deterministic)
    pub fn with_group_duplicates(mut self, group: bool) -> Self {
        self.group_duplicates = group;
        self
    }

    /// Returns true if a launch of `count` index tuples into `shape` can be
    /// addressed with this configuration's address width
    pub fn addresses(&self, shape: Shape, count: usize) -> bool {
        match self.address {
            AddressWidth::Wide => true,
            AddressWidth::Narrow => {
                let limit = i32::MAX as usize;
                let index_len = count.saturating_mul(self.index_layout.rank());
                [shape.numel(), count.saturating_mul(shape.row_len), index_len]
                    .iter()
                    .all(|&extent| extent <= limit)
            }
        }
    }
}

/// Reduction strategy
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// One atomic add per update element
    Atomic,
    /// Per-chunk duplicate grouping, one atomic add per distinct row
    SortGrouped,
    /// Grouping, quantized merge and single commit; bit-reproducible
    Deterministic,
}

impl Strategy {
    /// Short name for log output
    pub const fn name(self) -> &'static str {
        match self {
            Self::Atomic => "atomic",
            Self::SortGrouped => "sort-grouped",
            Self::Deterministic => "deterministic",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of a launch
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Launch {
    /// The accumulator was updated with this strategy
    Completed(Strategy),
    /// No strategy matches the configuration; nothing was touched
    Skipped,
}

impl Launch {
    /// Returns true if a strategy ran
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

/// Pick the strategy for `config`, or `None` if no strategy matches.
///
/// Integer and bool accumulators never take the deterministic path: integer
/// addition is associative, so the atomic path is already reproducible for
/// them.
pub fn select_strategy(config: &ScatterConfig) -> Option<Strategy> {
    config.accumulator.accumulation_dtype()?;
    if !matches!(config.index, DType::I32 | DType::I64) {
        return None;
    }

    let strategy = if config.deterministic {
        if config.accumulator.is_float() {
            Strategy::Deterministic
        } else {
            Strategy::Atomic
        }
    } else if config.group_duplicates {
        Strategy::SortGrouped
    } else {
        Strategy::Atomic
    };
    Some(strategy)
}
