//! Logarithmic FFT bin bounds and fractional-endpoint-weighted rescaling.
//!
//! The frequency tracker reports a fixed number of output bins spaced
//! geometrically (so the display reads like musical octaves, not linear
//! Hz), while the FFT itself produces linearly-spaced bins. This module
//! builds the mapping between the two once at startup and reuses it every
//! block.

/// One output bin's span, expressed as fractional FFT bin indices so the
/// rescale step can weight partial bins by how much of them the output
/// bin's frequency range actually covers.
#[derive(Debug, Clone, Copy)]
pub struct BinBound {
    pub lower: f64,
    pub upper: f64,
}

/// Builds `bin_count` output bins spaced at `octave_divisions` steps per
/// octave around `center_freq`, with `center_index` the output bin index
/// that `center_freq` itself falls in.
pub fn make_bin_bounds(
    center_freq: f64,
    octave_divisions: f64,
    bin_count: usize,
    center_index: usize,
    sample_rate_hz: f64,
    fft_size: usize,
) -> Vec<BinBound> {
    let ratio = 2f64.powf(1.0 / octave_divisions);
    let bound_ratio = 2f64.powf(1.0 / (2.0 * octave_divisions));
    let bandwidth_per_bin = sample_rate_hz / fft_size as f64;
    let nyquist_bin = (fft_size / 2) as f64;

    (0..bin_count)
        .map(|i| {
            let power = i as f64 - center_index as f64;
            let center = center_freq * ratio.powf(power);
            let lower_freq = center / bound_ratio;
            let upper_freq = center * bound_ratio;
            let lower = lower_freq / bandwidth_per_bin;
            let upper = (upper_freq / bandwidth_per_bin).min(nyquist_bin);
            BinBound { lower, upper }
        })
        .collect()
}

/// Rescales a linear FFT magnitude spectrum into the logarithmic bins
/// described by `bounds`. Each output value is the fractional-endpoint
/// weighted average of `spectrum` over the bin's `[lower, upper)` range.
pub fn rescale_fft(bounds: &[BinBound], spectrum: &[f64]) -> Vec<f64> {
    bounds.iter().map(|b| rescale_one_bin(b.lower, b.upper, spectrum)).collect()
}

fn rescale_one_bin(lower: f64, upper: f64, spectrum: &[f64]) -> f64 {
    let n = spectrum.len();
    let upper = upper.min(n as f64);
    if upper <= lower || n == 0 {
        return 0.0;
    }
    let lower_idx = lower.floor().max(0.0) as usize;
    let upper_idx = (upper.floor() as usize).min(n - 1);

    let mut total_weight = 0.0;
    let mut total_value = 0.0;

    if lower_idx >= upper_idx {
        // Both endpoints land in the same FFT bin: a single fractional
        // contribution, never double-counted against a "last partial bin".
        let frac = upper - lower;
        total_weight += frac;
        total_value += spectrum[lower_idx] * frac;
    } else {
        let first_frac = (lower_idx as f64 + 1.0) - lower;
        total_weight += first_frac;
        total_value += spectrum[lower_idx] * first_frac;

        for k in (lower_idx + 1)..upper_idx {
            total_weight += 1.0;
            total_value += spectrum[k];
        }

        let last_frac = upper - upper_idx as f64;
        if last_frac > 0.0 {
            total_weight += last_frac;
            total_value += spectrum[upper_idx] * last_frac;
        }
    }

    if total_weight > 0.0 {
        total_value / total_weight
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn flat_spectrum_rescales_flat() {
        let spectrum = vec![1.0; 64];
        let bounds = make_bin_bounds(1000.0, 3.0, 10, 5, 48000.0, 128);
        let out = rescale_fft(&bounds, &spectrum);
        for v in out {
            assert_relative_eq!(v, 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn single_bin_collapse_does_not_double_count() {
        let spectrum = vec![2.0, 4.0, 6.0];
        // bounds entirely inside bin 1
        let bound = BinBound { lower: 1.2, upper: 1.8 };
        let v = rescale_one_bin(bound.lower, bound.upper, &spectrum);
        assert_relative_eq!(v, 4.0, epsilon = 1e-9);
    }

    #[test]
    fn spans_multiple_bins_weighted() {
        let spectrum = vec![1.0, 2.0, 3.0, 4.0];
        // lower=0.5 (half of bin0), covers all of bin1, upper=2.5 (half of bin2)
        let v = rescale_one_bin(0.5, 2.5, &spectrum);
        // weight: 0.5*1 + 1*2 + 0.5*3 = 0.5+2+1.5=4.0, total weight=2.0 -> 2.0
        assert_relative_eq!(v, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn last_bin_clamped_to_nyquist() {
        let bounds = make_bin_bounds(20000.0, 3.0, 4, 3, 48000.0, 128);
        let nyquist_bin = 64.0;
        for b in &bounds {
            assert!(b.upper <= nyquist_bin + 1e-9);
        }
    }
}
