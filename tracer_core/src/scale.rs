//! Per-sweep weighting of voltage and current deltas.
//!
//! The weights make a fixed Manhattan distance correspond to roughly the same
//! spacing on a plot of the configured aspect ratio, independent of this
//! module's Isc and Voc. Both weights are small enough that
//! `4095 * (v_scale + i_scale)` fits in 16 bits.

use serde::Serialize;

use crate::fixed_point::TOTAL_SCALE_WEIGHT;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScaleFactors {
    pub v_scale: u16,
    pub i_scale: u16,
}

/// Lowest bit position that triggers normalisation.
const NORMALIZE_FROM_BIT: u32 = 4;

#[inline]
fn highest_bit_at_or_above(x: u32, floor: u32) -> Option<u32> {
    if x >> floor == 0 {
        None
    } else {
        Some(31 - x.leading_zeros())
    }
}

/// Shift right, rounding up when the most significant dropped bit is set.
#[inline]
fn shift_round(x: u32, shift: u32) -> u32 {
    debug_assert!(shift >= 1);
    (x >> shift) + ((x >> (shift - 1)) & 1)
}

/// Derive integer weights from the sweep's Isc/Voc estimates.
///
/// `width_factor = aspect_width * isc` weights voltage and
/// `height_factor = aspect_height * voc` weights current. The larger factor is
/// scaled to four bits, the smaller by the same shift, and the pair is
/// halved once if it still sums past 16. Zero estimates count as 1.
pub fn compute_scale_factors(
    isc: u16,
    voc: u16,
    aspect_width: u8,
    aspect_height: u8,
) -> ScaleFactors {
    let width_factor = u32::from(aspect_width.max(1)) * u32::from(isc.max(1));
    let height_factor = u32::from(aspect_height.max(1)) * u32::from(voc.max(1));

    let width_is_big = width_factor >= height_factor;
    let (mut big, mut small) = if width_is_big {
        (width_factor, height_factor)
    } else {
        (height_factor, width_factor)
    };

    if let Some(pos) = highest_bit_at_or_above(big, NORMALIZE_FROM_BIT) {
        let shift = pos - 3;
        big = shift_round(big, shift);
        small = shift_round(small, shift);
    }

    let total = u32::from(TOTAL_SCALE_WEIGHT);
    if big + small > total {
        big >>= 1;
        small >>= 1;
    }
    if small == 0 {
        small = 1;
        big = big.min(total - 1);
    }

    // Both values are now in 1..=16.
    let (v, i) = if width_is_big {
        (big, small)
    } else {
        (small, big)
    };
    ScaleFactors {
        v_scale: v as u16,
        i_scale: i as u16,
    }
}

/// Smallest distance between kept points: the total scaled Isc-to-Voc span
/// spread over the available point-to-point gaps.
pub fn min_distance(isc: u16, voc: u16, scale: ScaleFactors, max_points: u16) -> u16 {
    let span =
        u32::from(isc) * u32::from(scale.i_scale) + u32::from(voc) * u32::from(scale.v_scale);
    let gaps = u32::from(max_points.saturating_sub(2).max(1));
    (span / gaps).min(u32::from(u16::MAX)) as u16
}
