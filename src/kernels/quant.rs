//! Fixed-point quantization bridge
//!
//! Floating-point addition is not associative, so a sum of partials depends on
//! the order the partials arrive in. Integer addition is. The deterministic
//! path therefore converts every partial sum into a fixed-point `i32` relative
//! to a per-element reference, adds the integers atomically, and converts the
//! total back once.
//!
//! The reference of a row element is `magnitude * repeat_count`, where
//! `magnitude` is the largest absolute partial any chunk produced for it and
//! `repeat_count` is the number of chunks that touched the row. Each quantized
//! term is then bounded by `scale / repeat_count`, and the integer total by
//! `scale`, so with `scale = 2^30` the accumulation cannot overflow.
//!
//! # Error bound
//!
//! Each term is rounded once (at most half a unit), so the dequantized sum of
//! `c` terms differs from the exact sum by at most
//! `c * 0.5 / scale * (magnitude * c) = c² * magnitude / 2^31`. Two chunks
//! give `magnitude / 2^29`; the bound grows quadratically from there.

/// Fixed-point scale used by the deterministic path (2^30)
pub const QUANT_SCALE: f64 = (1u64 << 30) as f64;

#[inline]
fn nonzero(reference: f64) -> f64 {
    if reference == 0.0 { 1.0 } else { reference }
}

/// Quantize `value` against `reference`.
///
/// Computes `round(value / reference * scale)` with ties to even, saturating
/// at the `i32` range. NaN quantizes to 0. A zero reference is replaced by 1,
/// which only happens when every contribution is exactly zero.
#[inline]
pub fn quantize(value: f64, reference: f64, scale: f64) -> i32 {
    (value / nonzero(reference) * scale).round_ties_even() as i32
}

/// Inverse of [`quantize`] for a sum of quantized terms
#[inline]
pub fn dequantize(sum: i64, reference: f64, scale: f64) -> f64 {
    sum as f64 / scale * nonzero(reference)
}

/// Quantization anchor of one accumulator element
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RowScale {
    /// Largest absolute partial sum any chunk produced
    pub magnitude: f64,
    /// Number of chunks that contributed to the row
    pub repeat_count: u32,
}

impl RowScale {
    /// Anchor for `repeat_count` partials bounded by `magnitude`
    pub fn new(magnitude: f64, repeat_count: u32) -> Self {
        Self {
            magnitude,
            repeat_count,
        }
    }

    /// Divisor applied on both sides of the bridge
    #[inline]
    pub fn reference(&self) -> f64 {
        self.magnitude * f64::from(self.repeat_count.max(1))
    }

    /// Quantize one partial with [`QUANT_SCALE`]
    #[inline]
    pub fn quantize(&self, partial: f64) -> i32 {
        quantize(partial, self.reference(), QUANT_SCALE)
    }

    /// Dequantize an accumulated integer sum with [`QUANT_SCALE`]
    #[inline]
    pub fn dequantize(&self, sum: i64) -> f64 {
        dequantize(sum, self.reference(), QUANT_SCALE)
    }

    /// Worst-case absolute error of a dequantized sum under this anchor
    pub fn error_bound(&self) -> f64 {
        let c = f64::from(self.repeat_count.max(1));
        c * 0.5 / QUANT_SCALE * self.reference()
    }
}
