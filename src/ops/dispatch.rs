//! Runtime dtype dispatch for byte-buffer launches
//!
//! [`launch_bytes`] is the type-erased entry: buffers arrive as raw bytes and
//! the element types come from the [`ScatterConfig`]. The `dispatch_accumulator!`
//! macro turns the accumulator `DType` into a concrete Rust type.
//!
//! # Usage
//!
//! ```ignore
//! fn element_size(dtype: DType) -> Option<usize> {
//!     dispatch_accumulator!(dtype, T => {
//!         Some(std::mem::size_of::<T>())
//!     }, None)
//! }
//! ```
//!
//! ## Supported Types
//!
//! - `F64` -> `f64`
//! - `F32` -> `f32`
//! - `F16` -> `half::f16` (requires "f16" feature)
//! - `BF16` -> `half::bf16` (requires "f16" feature)
//! - `I64` -> `i64`
//! - `I32` -> `i32`
//! - `I16` -> `i16`
//! - `I8` -> `i8`
//! - `U8` -> `u8`
//! - `Bool` -> `bool`
//!
//! Every other dtype evaluates the fallback expression.

use super::config::{Launch, ScatterConfig};
use super::scatter_add::{ScatterArgs, scatter_add, skipped};
use crate::dtype::{DType, Element, IndexElement};
use crate::error::{Error, Result};
use crate::kernels::Updates;
use crate::runtime::{ParallelFor, Workspace};
use crate::tiling::Tiling;
use bytemuck::{CheckedBitPattern, NoUninit};

/// Macro for runtime dispatch over accumulator element types.
///
/// Executes `$body` with `$T` bound to the Rust type of `$dtype`, or evaluates
/// `$unsupported` when `$dtype` is not an accumulator type (or its feature is
/// disabled).
#[macro_export]
macro_rules! dispatch_accumulator {
    ($dtype:expr, $T:ident => $body:block, $unsupported:expr) => {
        match $dtype {
            $crate::dtype::DType::F64 => {
                type $T = f64;
                $body
            }
            $crate::dtype::DType::F32 => {
                type $T = f32;
                $body
            }
            #[cfg(feature = "f16")]
            $crate::dtype::DType::F16 => {
                type $T = half::f16;
                $body
            }
            #[cfg(feature = "f16")]
            $crate::dtype::DType::BF16 => {
                type $T = half::bf16;
                $body
            }
            $crate::dtype::DType::I64 => {
                type $T = i64;
                $body
            }
            $crate::dtype::DType::I32 => {
                type $T = i32;
                $body
            }
            $crate::dtype::DType::I16 => {
                type $T = i16;
                $body
            }
            $crate::dtype::DType::I8 => {
                type $T = i8;
                $body
            }
            $crate::dtype::DType::U8 => {
                type $T = u8;
                $body
            }
            $crate::dtype::DType::Bool => {
                type $T = bool;
                $body
            }
            _ => $unsupported,
        }
    };
}

/// Byte buffers of one type-erased scatter-add
#[derive(Debug)]
pub struct RawArgs<'a> {
    /// Accumulator elements of `config.accumulator`
    pub accumulator: &'a mut [u8],
    /// Index elements of `config.index`
    pub indices: &'a [u8],
    /// Update elements of `config.accumulator`
    pub updates: &'a [u8],
    /// Elements per row (D)
    pub row_len: usize,
}

// Checked casts also reject bool bytes other than 0 and 1
fn view<'a, T: CheckedBitPattern>(arg: &'static str, bytes: &'a [u8]) -> Result<&'a [T]> {
    bytemuck::checked::try_cast_slice(bytes)
        .map_err(|e| Error::invalid_argument(arg, e.to_string()))
}

fn view_mut<'a, T>(arg: &'static str, bytes: &'a mut [u8]) -> Result<&'a mut [T]>
where
    T: CheckedBitPattern + NoUninit,
{
    bytemuck::checked::try_cast_slice_mut(bytes)
        .map_err(|e| Error::invalid_argument(arg, e.to_string()))
}

/// Scatter-add over raw byte buffers, dispatching on the configuration dtypes.
///
/// Dtype combinations without a strategy return [`Launch::Skipped`]. Buffers
/// whose length or alignment does not fit the element type are rejected, as
/// are bool buffers holding bytes other than 0 and 1.
pub fn launch_bytes<G: ParallelFor>(
    grid: &G,
    config: &ScatterConfig,
    tiling: &Tiling,
    args: RawArgs<'_>,
    workspace: &mut Workspace,
) -> Result<Launch> {
    dispatch_accumulator!(config.accumulator, T => {
        match config.index {
            DType::I32 => launch_typed::<G, T, i32>(grid, config, tiling, args, workspace),
            DType::I64 => launch_typed::<G, T, i64>(grid, config, tiling, args, workspace),
            _ => Ok(skipped(config, "unsupported index dtype")),
        }
    }, Ok(skipped(config, "unsupported accumulator dtype")))
}

fn launch_typed<G, T, I>(
    grid: &G,
    config: &ScatterConfig,
    tiling: &Tiling,
    args: RawArgs<'_>,
    workspace: &mut Workspace,
) -> Result<Launch>
where
    G: ParallelFor,
    T: Element,
    I: IndexElement,
{
    let updates = view::<T>("updates", args.updates)?;
    let typed = ScatterArgs {
        accumulator: view_mut::<T>("accumulator", args.accumulator)?,
        indices: view::<I>("indices", args.indices)?,
        updates: if config.scalar_updates {
            Updates::Broadcast(updates)
        } else {
            Updates::PerIndex(updates)
        },
        row_len: args.row_len,
    };
    scatter_add(grid, config, tiling, typed, workspace)
}
