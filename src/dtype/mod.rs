//! Data type system for scatr
//!
//! This module provides the `DType` tag used by the runtime dispatcher, the
//! `Element` trait connecting accumulator element types to it, the
//! `IndexElement` trait for index arrays, and the atomic-capable
//! `AtomicScalar` accumulation types.

mod atomic;
mod element;
mod index;

pub use atomic::{AtomicScalar, CellOf};
pub use element::Element;
pub use index::IndexElement;

use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64};

/// Element types understood by the runtime dispatcher
///
/// The discriminant values are stable:
/// - Floats: 0-9 (F64=0, F32=1, F16=2, BF16=3)
/// - Signed ints: 10-19 (I64=10, I32=11, I16=12, I8=13)
/// - Unsigned ints: 20-29 (U64=20, U32=21, U16=22, U8=23)
/// - Bool: 30
///
/// Not every dtype is a valid accumulator or index type. Unsupported
/// combinations are rejected by the dispatcher, not by this enum.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
#[repr(u8)]
pub enum DType {
    /// 64-bit floating point
    F64 = 0,
    /// 32-bit floating point
    F32 = 1,
    /// 16-bit floating point (IEEE 754)
    F16 = 2,
    /// 16-bit brain floating point
    BF16 = 3,

    /// 64-bit signed integer
    I64 = 10,
    /// 32-bit signed integer
    I32 = 11,
    /// 16-bit signed integer
    I16 = 12,
    /// 8-bit signed integer
    I8 = 13,

    /// 64-bit unsigned integer
    U64 = 20,
    /// 32-bit unsigned integer
    U32 = 21,
    /// 16-bit unsigned integer
    U16 = 22,
    /// 8-bit unsigned integer
    U8 = 23,

    /// Boolean type
    Bool = 30,
}

impl DType {
    /// Size of one element in bytes
    #[inline]
    pub const fn size_in_bytes(self) -> usize {
        match self {
            Self::F64 | Self::I64 | Self::U64 => 8,
            Self::F32 | Self::I32 | Self::U32 => 4,
            Self::F16 | Self::BF16 | Self::I16 | Self::U16 => 2,
            Self::I8 | Self::U8 | Self::Bool => 1,
        }
    }

    /// Returns true if this is a floating point type
    #[inline]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::F64 | Self::F32 | Self::F16 | Self::BF16)
    }

    /// Atomic-capable type this dtype is accumulated in.
    ///
    /// `None` means the dtype cannot be used as an accumulator. Bool counts in
    /// i32 and reads back as "any nonzero".
    pub const fn accumulation_dtype(self) -> Option<Self> {
        match self {
            Self::F64 => Some(Self::F64),
            Self::F32 | Self::F16 | Self::BF16 => Some(Self::F32),
            Self::I64 => Some(Self::I64),
            Self::I32 | Self::I16 | Self::I8 | Self::U8 | Self::Bool => Some(Self::I32),
            Self::U64 | Self::U32 | Self::U16 => None,
        }
    }

    /// Returns true if elements of this dtype support atomic add directly
    #[inline]
    pub const fn has_native_atomic_add(self) -> bool {
        matches!(self, Self::F64 | Self::F32 | Self::I64 | Self::I32)
    }

    /// Returns true if an accumulator of this dtype can be viewed as atomic
    /// cells in place, without a widened shadow copy in workspace.
    ///
    /// 64-bit atomics may need stricter alignment than the plain type on some
    /// 32-bit targets.
    pub fn supports_in_place_atomics(self) -> bool {
        match self {
            Self::F32 | Self::I32 => {
                std::mem::align_of::<u32>() >= std::mem::align_of::<AtomicU32>()
            }
            Self::F64 | Self::I64 => {
                std::mem::align_of::<u64>() >= std::mem::align_of::<AtomicU64>()
            }
            _ => false,
        }
    }

    /// Short name for display (e.g., "f32", "i64")
    pub const fn short_name(self) -> &'static str {
        match self {
            Self::F64 => "f64",
            Self::F32 => "f32",
            Self::F16 => "f16",
            Self::BF16 => "bf16",
            Self::I64 => "i64",
            Self::I32 => "i32",
            Self::I16 => "i16",
            Self::I8 => "i8",
            Self::U64 => "u64",
            Self::U32 => "u32",
            Self::U16 => "u16",
            Self::U8 => "u8",
            Self::Bool => "bool",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}
