//! # scatr
//!
//! **Parallel scatter-add reduction with a bit-reproducible mode.**
//!
//! scatr computes `accumulator[index[i]] += update[i]` for every `i` across a
//! grid of parallel compute units, under one of three strategies. Indices are
//! either row numbers or tuples of up to seven coordinates
//! ([`IndexLayout`](tiling::IndexLayout)).
//!
//! - **Atomic**: one atomic add per update element
//! - **Sort-grouped**: duplicates summed per chunk, one atomic add per row
//! - **Deterministic**: duplicates grouped per chunk, merged through a
//!   fixed-point bridge, committed once; the output is bit-identical no matter
//!   how the units are scheduled
//!
//! ## Quick Start
//!
//! ```rust
//! use scatr::prelude::*;
//!
//! let mut acc = vec![0.0f64; 6];
//! let indices = [2i32, 2, 5];
//! let config = ScatterConfig::for_types::<f64, i32>()
//!     .with_scalar_updates(true)
//!     .with_deterministic(true);
//! let shape = Shape::new(6, 1);
//! let tiling = Tiling::plan(shape, indices.len(), &TilingHints::default());
//! let mut ws = Workspace::for_layout(&workspace_layout(&config, shape, indices.len(), &tiling));
//!
//! let args = ScatterArgs {
//!     accumulator: &mut acc,
//!     indices: &indices,
//!     updates: Updates::Broadcast(&[3.0]),
//!     row_len: 1,
//! };
//! scatter_add(&DefaultGrid::default(), &config, &tiling, args, &mut ws)?;
//! assert_eq!(acc, [0.0, 0.0, 6.0, 0.0, 0.0, 3.0]);
//! # Ok::<(), scatr::error::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `rayon` (default): work-stealing [`RayonGrid`](runtime::RayonGrid)
//! - `f16` (default): half-precision accumulators (F16, BF16)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dtype;
pub mod error;
pub mod kernels;
pub mod ops;
pub mod runtime;
pub mod tiling;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::dtype::{DType, Element, IndexElement};
    pub use crate::error::{Error, Result};
    pub use crate::kernels::Updates;
    pub use crate::ops::{
        AddressWidth, Launch, RawArgs, ScatterArgs, ScatterConfig, Strategy, launch_bytes,
        scatter_add, scatter_add_out, select_strategy,
    };
    pub use crate::runtime::{DefaultGrid, ParallelFor, Serial, ThreadGrid, Workspace};
    pub use crate::tiling::{
        CommitLayout, IndexLayout, Shape, Tiling, TilingHints, prefers_grouping,
        workspace_layout,
    };

    #[cfg(feature = "rayon")]
    pub use crate::runtime::RayonGrid;
}
