//! Soft-value numeric domains
//!
//! The decoder is written once against the [`Llr`] trait and instantiated per
//! precision: `f32`, `f64`, or a saturating fixed-point representation
//! [`Fixed<BITS, FRAC>`](Fixed) of configurable total bit-width.
//!
//! The sign of a soft value carries the likely bit (negative means 1) and the
//! magnitude carries the confidence.

use core::fmt;
use serde::{Deserialize, Serialize};

use crate::constants::{BIT_ONE, BIT_ZERO, Q16_FRACTIONAL_BITS, Q8_FRACTIONAL_BITS};

/// Arithmetic capabilities a soft-value type must offer to run through the decoder
pub trait Llr: Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// The neutral soft value (no information)
    const ZERO: Self;

    /// Convert from `f64`, saturating to the representable range
    fn from_f64(value: f64) -> Self;

    /// Convert to `f64`
    fn to_f64(self) -> f64;

    /// Addition; saturates for fixed-point domains
    fn sat_add(self, rhs: Self) -> Self;

    /// Subtraction; saturates for fixed-point domains
    fn sat_sub(self, rhs: Self) -> Self;

    /// Negation; saturates for fixed-point domains
    fn sat_neg(self) -> Self;

    /// True when the value is strictly negative
    fn is_negative(self) -> bool;

    /// Convert from `f32`, saturating to the representable range
    #[inline]
    fn from_f32(value: f32) -> Self {
        Self::from_f64(value as f64)
    }

    /// Hard decision on this value: 1 when negative, 0 otherwise
    #[inline]
    fn hard_bit(self) -> u8 {
        if self.is_negative() {
            BIT_ONE
        } else {
            BIT_ZERO
        }
    }
}

impl Llr for f32 {
    const ZERO: Self = 0.0;

    #[inline]
    fn from_f64(value: f64) -> Self {
        value as f32
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline]
    fn sat_add(self, rhs: Self) -> Self {
        self + rhs
    }

    #[inline]
    fn sat_sub(self, rhs: Self) -> Self {
        self - rhs
    }

    #[inline]
    fn sat_neg(self) -> Self {
        -self
    }

    #[inline]
    fn is_negative(self) -> bool {
        self < 0.0
    }
}

impl Llr for f64 {
    const ZERO: Self = 0.0;

    #[inline]
    fn from_f64(value: f64) -> Self {
        value
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self
    }

    #[inline]
    fn sat_add(self, rhs: Self) -> Self {
        self + rhs
    }

    #[inline]
    fn sat_sub(self, rhs: Self) -> Self {
        self - rhs
    }

    #[inline]
    fn sat_neg(self) -> Self {
        -self
    }

    #[inline]
    fn is_negative(self) -> bool {
        self < 0.0
    }
}

/// Saturating fixed-point soft value
///
/// The raw integer holds `value * 2^FRAC` and is confined to the symmetric
/// range `[-(2^(BITS-1) - 1), 2^(BITS-1) - 1]`, so negation never overflows.
/// `BITS` must lie in `2..=32` and `FRAC` must be smaller than `BITS`.
/// Serialized as the raw integer; deserialization saturates like
/// [`Fixed::from_raw`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub struct Fixed<const BITS: u32, const FRAC: u32>(i32);

/// 8-bit fixed-point precision
pub type Q8 = Fixed<8, Q8_FRACTIONAL_BITS>;

/// 16-bit fixed-point precision
pub type Q16 = Fixed<16, Q16_FRACTIONAL_BITS>;

impl<const BITS: u32, const FRAC: u32> Fixed<BITS, FRAC> {
    const VALID: () = assert!(
        BITS >= 2 && BITS <= 32 && FRAC < BITS,
        "Fixed<BITS, FRAC> needs 2 <= BITS <= 32 and FRAC < BITS"
    );

    /// Largest raw magnitude
    pub const MAX_RAW: i32 = {
        let () = Self::VALID;
        ((1i64 << (BITS - 1)) - 1) as i32
    };

    /// Build from a raw quantized integer, saturating to the bit-width
    pub const fn from_raw(raw: i32) -> Self {
        if raw > Self::MAX_RAW {
            Self(Self::MAX_RAW)
        } else if raw < -Self::MAX_RAW {
            Self(-Self::MAX_RAW)
        } else {
            Self(raw)
        }
    }

    /// Raw quantized integer
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Quantization step (`2^-FRAC`)
    pub fn step() -> f64 {
        1.0 / (1u64 << FRAC) as f64
    }

    #[inline]
    fn saturate(raw: i64) -> Self {
        let max = Self::MAX_RAW as i64;
        Self(raw.clamp(-max, max) as i32)
    }
}

impl<const BITS: u32, const FRAC: u32> From<i32> for Fixed<BITS, FRAC> {
    fn from(raw: i32) -> Self {
        Self::from_raw(raw)
    }
}

impl<const BITS: u32, const FRAC: u32> From<Fixed<BITS, FRAC>> for i32 {
    fn from(value: Fixed<BITS, FRAC>) -> Self {
        value.0
    }
}

impl<const BITS: u32, const FRAC: u32> Llr for Fixed<BITS, FRAC> {
    const ZERO: Self = Self(0);

    #[inline]
    fn from_f64(value: f64) -> Self {
        // `as` saturates at the i64 bounds and maps NaN to 0
        let scaled = (value * (1u64 << FRAC) as f64).round() as i64;
        Self::saturate(scaled)
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self.0 as f64 * Self::step()
    }

    #[inline]
    fn sat_add(self, rhs: Self) -> Self {
        Self::saturate(self.0 as i64 + rhs.0 as i64)
    }

    #[inline]
    fn sat_sub(self, rhs: Self) -> Self {
        Self::saturate(self.0 as i64 - rhs.0 as i64)
    }

    #[inline]
    fn sat_neg(self) -> Self {
        Self::saturate(-(self.0 as i64))
    }

    #[inline]
    fn is_negative(self) -> bool {
        self.0 < 0
    }
}

/// Quantize floating-point channel values into the soft-value domain `R`
pub fn quantize<R: Llr>(values: &[f32]) -> Vec<R> {
    values.iter().map(|&v| R::from_f32(v)).collect()
}

/// Flip the sign of every soft value whose mask bit is set
///
/// This is the channel-side half of coset decoding: values scrambled this way
/// are un-scrambled by the decoder's hard-decision step when coset decoding
/// is enabled with the same mask.
pub fn apply_coset<R: Llr>(mask: &[u8], values: &mut [R]) {
    for (value, &bit) in values.iter_mut().zip(mask.iter()) {
        if bit != 0 {
            *value = value.sat_neg();
        }
    }
}
