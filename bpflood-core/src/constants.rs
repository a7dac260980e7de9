//! Constants and limits for the bpflood decoder

/// Width in bytes of the emulated vector register used by the reorderer.
///
/// Matches a 256-bit (AVX2) register; the number of lanes per register for an
/// element type `T` is `REGISTER_BYTES / size_of::<T>()`.
pub const REGISTER_BYTES: usize = 32;

/// Iteration budget used by [`DecoderBuilder`](crate::decoder::DecoderBuilder)
/// when none is given.
pub const DEFAULT_ITERATIONS: usize = 10;

/// Largest frame count served by [`StaticReorderer`](crate::reorder::StaticReorderer).
///
/// The size-specialized reorderer only exists for power-of-two frame counts
/// up to this bound.
pub const MAX_STATIC_FRAMES: usize = 16;

/// Largest extrinsic magnitude emitted by the log-domain check-node update.
///
/// Past roughly 36.7, `tanh(x / 2)` rounds to exactly 1.0 in `f64` and
/// `2 * atanh(1)` diverges; messages are clamped here so the variable-node
/// sums stay finite.
pub const MAX_CHECK_MESSAGE: f64 = 36.0;

/// Number of fractional bits of the default 8-bit fixed-point precision.
pub const Q8_FRACTIONAL_BITS: u32 = 2;

/// Number of fractional bits of the default 16-bit fixed-point precision.
pub const Q16_FRACTIONAL_BITS: u32 = 4;

/// Bit value of a hard decision on a negative soft value
pub const BIT_ONE: u8 = 1;

/// Bit value of a hard decision on a non-negative soft value
pub const BIT_ZERO: u8 = 0;
