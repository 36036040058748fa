//! 16-bit fixed-point helpers for the per-sample path.
//!
//! Samples are 12-bit, so both the interpolation sum and the weighted
//! distance fit in `u16` as long as the weights stay within the bounds
//! asserted below.

pub use tracer_traits::ADC_MAX;

use crate::scale::ScaleFactors;

/// Weight of the current sample taken before the voltage sample.
pub const INTERP_WEIGHT_PREV: u16 = 5;
/// Weight of the current sample taken after the voltage sample.
pub const INTERP_WEIGHT_NEXT: u16 = 3;
pub const INTERP_SHIFT: u32 = 3;
/// Upper bound on `v_scale + i_scale`.
pub const TOTAL_SCALE_WEIGHT: u16 = 16;

const _: () = assert!(INTERP_WEIGHT_PREV + INTERP_WEIGHT_NEXT == 1 << INTERP_SHIFT);
const _: () = assert!(
    (ADC_MAX as u32) * (1 << INTERP_SHIFT) + (1 << (INTERP_SHIFT - 1)) <= u16::MAX as u32
);
const _: () = assert!(
    (ADC_MAX as u32) * (TOTAL_SCALE_WEIGHT as u32) <= u16::MAX as u32
);

/// Estimate the current at the instant the voltage was sampled, from the
/// current readings taken just before and just after it. Rounds to nearest.
#[inline]
pub fn interpolate_current(before: u16, after: u16) -> u16 {
    debug_assert!(before <= ADC_MAX && after <= ADC_MAX);
    (before * INTERP_WEIGHT_PREV + after * INTERP_WEIGHT_NEXT + (1 << (INTERP_SHIFT - 1)))
        >> INTERP_SHIFT
}

/// Weighted Manhattan distance between two points given per-axis deltas.
#[inline]
pub fn manhattan_distance(dv: u16, di: u16, scale: ScaleFactors) -> u16 {
    debug_assert!(dv <= ADC_MAX && di <= ADC_MAX);
    debug_assert!(scale.v_scale + scale.i_scale <= TOTAL_SCALE_WEIGHT);
    dv * scale.v_scale + di * scale.i_scale
}
