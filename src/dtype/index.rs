//! Index element types

use super::DType;
use bytemuck::Pod;
use std::fmt::Debug;

/// Trait for index array element types (i32 and i64)
pub trait IndexElement: Copy + Send + Sync + Pod + Ord + Debug + 'static {
    /// The corresponding DType for this Rust type
    const DTYPE: DType;

    /// Padding value placed after the last sorted key; never a valid row
    const SENTINEL: Self;

    /// Order-preserving image of the key as an unsigned integer.
    ///
    /// Flipping the sign bit maps the signed range onto the unsigned range so
    /// that a radix sort over the image sorts the signed keys.
    fn sort_key(self) -> u64;

    /// Row addressed by this index, or `None` when outside `[0, rows)`
    fn row(self, rows: usize) -> Option<usize>;
}

impl IndexElement for i32 {
    const DTYPE: DType = DType::I32;
    const SENTINEL: Self = i32::MAX;

    #[inline]
    fn sort_key(self) -> u64 {
        ((self as u32) ^ 0x8000_0000) as u64
    }

    #[inline]
    fn row(self, rows: usize) -> Option<usize> {
        usize::try_from(self).ok().filter(|&r| r < rows)
    }
}

impl IndexElement for i64 {
    const DTYPE: DType = DType::I64;
    const SENTINEL: Self = i64::MAX;

    #[inline]
    fn sort_key(self) -> u64 {
        (self as u64) ^ 0x8000_0000_0000_0000
    }

    #[inline]
    fn row(self, rows: usize) -> Option<usize> {
        usize::try_from(self).ok().filter(|&r| r < rows)
    }
}
