//! Element trait for mapping accumulator element types to DType

use super::{AtomicScalar, DType};
use bytemuck::{CheckedBitPattern, NoUninit};
use std::fmt::Debug;

/// Trait for types that can be accumulator or update elements
///
/// This trait connects Rust's type system to scatr's runtime dtype system and
/// names the atomic-capable type each element is accumulated in.
///
/// # Bounds
/// - `Copy + Send + Sync + 'static` - Basic trait requirements
/// - `NoUninit + CheckedBitPattern` - Validated views of byte buffers
///   (bytemuck); `bool` only accepts the bytes 0 and 1
/// - `PartialOrd + Debug` - Test and diagnostic convenience
///
/// # Widening
///
/// Types without a native atomic add (f16, bf16, i16, i8, u8, bool) widen to
/// an atomic-capable `Accum` type; `narrow` converts back. For types with a
/// native atomic add, `Accum` is `Self` and both conversions are identities.
pub trait Element:
    Copy + Send + Sync + NoUninit + CheckedBitPattern + 'static + PartialOrd + Debug
{
    /// The corresponding DType for this Rust type
    const DTYPE: DType;

    /// Atomic-capable type this element is accumulated in
    type Accum: AtomicScalar;

    /// Convert to f64 for generic numeric operations
    fn to_f64(self) -> f64;

    /// Convert from f64 to this type
    fn from_f64(v: f64) -> Self;

    /// Zero value
    fn zero() -> Self;

    /// Convert into the accumulation type
    fn widen(self) -> Self::Accum;

    /// Convert back from the accumulation type
    fn narrow(v: Self::Accum) -> Self;

    /// The slice itself when `Accum` is `Self`, `None` for widened types
    #[inline]
    fn as_accum(_slice: &[Self]) -> Option<&[Self::Accum]> {
        None
    }

    /// Mutable counterpart of [`Element::as_accum`]
    #[inline]
    fn as_accum_mut(_slice: &mut [Self]) -> Option<&mut [Self::Accum]> {
        None
    }
}

macro_rules! impl_native_element {
    ($ty:ty, $dtype:expr, $zero:expr) => {
        impl Element for $ty {
            const DTYPE: DType = $dtype;
            type Accum = $ty;

            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }

            #[inline]
            fn from_f64(v: f64) -> Self {
                v as $ty
            }

            #[inline]
            fn zero() -> Self {
                $zero
            }

            #[inline]
            fn widen(self) -> $ty {
                self
            }

            #[inline]
            fn narrow(v: $ty) -> Self {
                v
            }

            #[inline]
            fn as_accum(slice: &[$ty]) -> Option<&[$ty]> {
                Some(slice)
            }

            #[inline]
            fn as_accum_mut(slice: &mut [$ty]) -> Option<&mut [$ty]> {
                Some(slice)
            }
        }
    };
}

impl_native_element!(f64, DType::F64, 0.0);
impl_native_element!(f32, DType::F32, 0.0);
impl_native_element!(i64, DType::I64, 0);
impl_native_element!(i32, DType::I32, 0);

// Narrow integers accumulate in i32; narrowing back truncates to the low bits,
// which is two's complement wrap-around for the narrow type.
macro_rules! impl_widened_int_element {
    ($ty:ty, $dtype:expr) => {
        impl Element for $ty {
            const DTYPE: DType = $dtype;
            type Accum = i32;

            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }

            #[inline]
            fn from_f64(v: f64) -> Self {
                v as $ty
            }

            #[inline]
            fn zero() -> Self {
                0
            }

            #[inline]
            fn widen(self) -> i32 {
                self as i32
            }

            #[inline]
            fn narrow(v: i32) -> Self {
                v as $ty
            }
        }
    };
}

impl_widened_int_element!(i16, DType::I16);
impl_widened_int_element!(i8, DType::I8);
impl_widened_int_element!(u8, DType::U8);

// Bool counts hits in i32: any nonzero total reads back as true, so adding
// `true` anywhere sets the element and subtracting can clear it again.
impl Element for bool {
    const DTYPE: DType = DType::Bool;
    type Accum = i32;

    #[inline]
    fn to_f64(self) -> f64 {
        f64::from(u8::from(self))
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        v != 0.0
    }

    #[inline]
    fn zero() -> Self {
        false
    }

    #[inline]
    fn widen(self) -> i32 {
        i32::from(self)
    }

    #[inline]
    fn narrow(v: i32) -> Self {
        v != 0
    }
}

// ============================================================================
// Half-precision floating point types (requires "f16" feature)
// ============================================================================

#[cfg(feature = "f16")]
impl Element for half::f16 {
    const DTYPE: DType = DType::F16;
    type Accum = f32;

    #[inline]
    fn to_f64(self) -> f64 {
        self.to_f64()
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        half::f16::from_f64(v)
    }

    #[inline]
    fn zero() -> Self {
        half::f16::ZERO
    }

    #[inline]
    fn widen(self) -> f32 {
        self.to_f32()
    }

    #[inline]
    fn narrow(v: f32) -> Self {
        half::f16::from_f32(v)
    }
}

#[cfg(feature = "f16")]
impl Element for half::bf16 {
    const DTYPE: DType = DType::BF16;
    type Accum = f32;

    #[inline]
    fn to_f64(self) -> f64 {
        self.to_f64()
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        half::bf16::from_f64(v)
    }

    #[inline]
    fn zero() -> Self {
        half::bf16::ZERO
    }

    #[inline]
    fn widen(self) -> f32 {
        self.to_f32()
    }

    #[inline]
    fn narrow(v: f32) -> Self {
        half::bf16::from_f32(v)
    }
}
