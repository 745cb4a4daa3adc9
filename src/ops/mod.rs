//! Scatter-add operations
//!
//! # Design
//!
//! ```text
//! ScatterConfig ──select_strategy──> Strategy
//!                                      ├── Atomic         kernels::atomic
//!                                      ├── SortGrouped    kernels::grouped
//!                                      └── Deterministic  kernels::deterministic
//! ```
//!
//! [`scatter_add`] is the typed entry point and [`launch_bytes`] the
//! type-erased one. Both validate buffer lengths, pick a strategy, and return
//! [`Launch::Skipped`] without touching the accumulator when none matches.

mod config;
mod dispatch;
mod scatter_add;

pub use config::{AddressWidth, Launch, ScatterConfig, Strategy, select_strategy};
pub use dispatch::{RawArgs, launch_bytes};
pub use scatter_add::{ScatterArgs, scatter_add, scatter_add_out};
