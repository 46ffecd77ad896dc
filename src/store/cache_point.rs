//! Waveform summary statistics precomputed per fixed run of frames.
//!
//! Cache points let the renderer draw zoomed-out views without re-scanning
//! raw samples: one point summarizes [`SAMPLES_PER_CACHE_POINT`] consecutive
//! frames. The summarizer is a contract, not an implementation detail; test
//! helpers recomputing points must mirror it bit for bit.

use bytemuck::{Pod, Zeroable};

/// Number of consecutive frames summarized by one [`CachePoint`].
pub const SAMPLES_PER_CACHE_POINT: usize = 256;

/// Min/max/average summary of one run of frames.
///
/// `min_value`/`max_value` are seeded at zero rather than the first sample,
/// so an all-positive run reports `min_value == 0.0`. That zero baseline is
/// numerically non-standard but load-bearing for waveform rendering, which
/// always draws from the axis outward.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct CachePoint {
    /// Smallest sample in the run, capped at zero.
    pub min_value: f32,
    /// Largest sample in the run, floored at zero.
    pub max_value: f32,
    /// Mean of the strictly negative samples, zero if there are none.
    pub avg_min_value: f32,
    /// Mean of the strictly positive samples, zero if there are none.
    pub avg_max_value: f32,
}

impl CachePoint {
    /// The all-zero cache point, used as the out-of-bounds sentinel.
    pub const ZERO: CachePoint = CachePoint {
        min_value: 0.0,
        max_value: 0.0,
        avg_min_value: 0.0,
        avg_max_value: 0.0,
    };
}

/// Summarize `samples` into `ceil(len / SAMPLES_PER_CACHE_POINT)` points.
///
/// The final point covers the short tail when the length is not a multiple
/// of the run size. Deterministic: identical input yields bit-identical
/// output.
pub fn summarize(samples: &[f32]) -> Vec<CachePoint> {
    samples
        .chunks(SAMPLES_PER_CACHE_POINT)
        .map(summarize_run)
        .collect()
}

fn summarize_run(run: &[f32]) -> CachePoint {
    let mut min_value = 0.0_f32;
    let mut max_value = 0.0_f32;
    let mut sum_below = 0.0_f32;
    let mut sum_above = 0.0_f32;
    let mut below_count = 0u32;
    let mut above_count = 0u32;

    for &value in run {
        min_value = min_value.min(value);
        max_value = max_value.max(value);
        if value < 0.0 {
            sum_below += value;
            below_count += 1;
        } else if value > 0.0 {
            sum_above += value;
            above_count += 1;
        }
    }

    CachePoint {
        min_value,
        max_value,
        avg_min_value: if below_count == 0 {
            0.0
        } else {
            sum_below / below_count as f32
        },
        avg_max_value: if above_count == 0 {
            0.0
        } else {
            sum_above / above_count as f32
        },
    }
}
