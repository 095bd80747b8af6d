//! Fixed-point pieces of the control law.
//!
//! Drop rates are kept in Q0.32 (32 fractional bits, no integer part). The
//! controller stores the reciprocal square root of its drop count as a 16 bit
//! mantissa to keep its state small; it is widened back to Q0.32 on use.
//!
//! Reference:
//! https://github.com/torvalds/linux/blob/v6.6/include/net/codel_impl.h

use crate::time::Timestamp;

/// Width of the stored `rec_inv_sqrt` mantissa.
pub const REC_INV_SQRT_BITS: u32 = u16::BITS;
/// Shift that turns the stored mantissa into a Q0.32 number.
pub const REC_INV_SQRT_SHIFT: u32 = 32 - REC_INV_SQRT_BITS;
/// Largest representable `rec_inv_sqrt`, i.e. ~1.0.
pub const REC_INV_SQRT_MAX: u16 = (u32::MAX >> REC_INV_SQRT_SHIFT) as u16;

/// One Newton-Raphson iteration towards `1/sqrt(count)`:
///
/// `new_invsqrt = (invsqrt / 2) * (3 - count * invsqrt^2)`
///
/// Quadratic convergence means a stale estimate is corrected within a few
/// drops, so callers run this once per drop instead of dividing.
#[inline]
pub fn newton_step(rec_inv_sqrt: u16, count: u32) -> u16 {
    let invsqrt = (rec_inv_sqrt as u32) << REC_INV_SQRT_SHIFT;
    let invsqrt2 = ((invsqrt as u64 * invsqrt as u64) >> 32) as u32;
    let mut val = (3u64 << 32).wrapping_sub(count as u64 * invsqrt2 as u64);
    // avoid overflow in the following multiply
    val >>= 2;
    val = val.wrapping_mul(invsqrt as u64) >> (32 - 2 + 1);
    (val >> REC_INV_SQRT_SHIFT) as u16
}

/// Time of the next drop: `t + interval / sqrt(count)`.
#[inline]
pub fn control_law(t: Timestamp, interval: u64, rec_inv_sqrt: u16) -> Timestamp {
    let invsqrt = ((rec_inv_sqrt as u32) << REC_INV_SQRT_SHIFT) as u128;
    t + ((interval as u128 * invsqrt) >> 32) as u64
}

/// The Q0.32 mantissa as a float, for diagnostics.
pub fn rec_inv_sqrt_to_f64(rec_inv_sqrt: u16) -> f64 {
    rec_inv_sqrt as f64 / (1u64 << REC_INV_SQRT_BITS) as f64
}
