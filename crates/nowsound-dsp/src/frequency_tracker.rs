//! Windowed FFT accumulation and rebinning into a logarithmic histogram,
//! published without locking for a visualization probe to read.

use crate::bin_bounds::{rescale_fft, BinBound};
use realfft::{RealFftPlanner, RealToComplex};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FrequencyTrackerConfig {
    pub fft_size: usize,
    pub center_freq_hz: f64,
    pub octave_divisions: f64,
    pub output_bin_count: usize,
    pub center_bin_index: usize,
    pub sample_rate_hz: f64,
}

/// Accumulates audio into a fixed-size window, runs a forward real FFT
/// each time the window fills, and republishes a rescaled logarithmic
/// histogram. Single writer (the audio thread via `record`), single
/// reader (`get_latest_histogram`); a reader may observe a spectrum whose
/// bins span two different blocks' worth of publishes, which is an
/// acceptable inconsistency for a visualization probe.
pub struct FrequencyTracker {
    fft: Arc<dyn RealToComplex<f64>>,
    fft_size: usize,
    window: Vec<f64>,
    accumulation: Vec<f64>,
    fill: usize,
    scratch: Vec<f64>,
    spectrum_out: Vec<realfft::num_complex::Complex<f64>>,
    magnitudes: Vec<f64>,
    bounds: Vec<BinBound>,
    published: Vec<f64>,
}

impl FrequencyTracker {
    pub fn new(config: FrequencyTrackerConfig) -> Self {
        let mut planner = RealFftPlanner::new();
        let fft = planner.plan_fft_forward(config.fft_size);
        let output_len = config.fft_size / 2 + 1;

        // Hann window. The original engine left a Blackman-Harris window
        // commented out and accumulated unwindowed samples; this applies
        // a window unconditionally rather than reproducing that gap.
        let window: Vec<f64> = (0..config.fft_size)
            .map(|i| 0.5 * (1.0 - (2.0 * std::f64::consts::PI * i as f64 / (config.fft_size - 1) as f64).cos()))
            .collect();

        let bounds = crate::bin_bounds::make_bin_bounds(
            config.center_freq_hz,
            config.octave_divisions,
            config.output_bin_count,
            config.center_bin_index,
            config.sample_rate_hz,
            config.fft_size,
        );

        Self {
            fft,
            fft_size: config.fft_size,
            window,
            accumulation: vec![0.0; config.fft_size],
            fill: 0,
            scratch: vec![0.0; config.fft_size],
            spectrum_out: vec![realfft::num_complex::Complex::new(0.0, 0.0); output_len],
            magnitudes: vec![0.0; output_len],
            bounds,
            published: vec![0.0; config.output_bin_count],
        }
    }

    pub fn output_bin_count(&self) -> usize {
        self.published.len()
    }

    /// Averages the two input channels sample-by-sample into the
    /// accumulation buffer; runs a transform and republishes whenever the
    /// window fills.
    pub fn record(&mut self, ch0: &[f64], ch1: &[f64]) {
        debug_assert_eq!(ch0.len(), ch1.len());
        for (&a, &b) in ch0.iter().zip(ch1) {
            self.accumulation[self.fill] = (a + b) * 0.5;
            self.fill += 1;
            if self.fill == self.fft_size {
                self.transform_and_publish();
                self.fill = 0;
            }
        }
    }

    fn transform_and_publish(&mut self) {
        for (i, (&sample, &w)) in self.accumulation.iter().zip(&self.window).enumerate() {
            self.scratch[i] = sample * w;
        }
        if self.fft.process(&mut self.scratch, &mut self.spectrum_out).is_err() {
            log::warn!("forward FFT failed, publishing a zeroed spectrum");
            self.magnitudes.fill(0.0);
        } else {
            let scale = 2.0 / self.fft_size as f64;
            for (m, c) in self.magnitudes.iter_mut().zip(&self.spectrum_out) {
                *m = (c.re * c.re + c.im * c.im).sqrt() * scale;
            }
        }
        let rescaled = rescale_fft(&self.bounds, &self.magnitudes);
        self.published.copy_from_slice(&rescaled);
    }

    /// Copies the most recently published histogram into `dst`.
    /// `dst.len()` must equal `output_bin_count()`.
    pub fn get_latest_histogram(&self, dst: &mut [f64]) {
        assert_eq!(dst.len(), self.published.len());
        dst.copy_from_slice(&self.published);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sine_input_produces_nonzero_histogram() {
        let mut tracker = FrequencyTracker::new(FrequencyTrackerConfig {
            fft_size: 1024,
            center_freq_hz: 1000.0,
            octave_divisions: 3.0,
            output_bin_count: 24,
            center_bin_index: 12,
            sample_rate_hz: 48000.0,
        });
        let freq = 1000.0;
        let sr = 48000.0;
        let samples: Vec<f64> = (0..1024).map(|i| (2.0 * std::f64::consts::PI * freq * i as f64 / sr).sin()).collect();
        tracker.record(&samples, &samples);
        let mut out = vec![0.0; 24];
        tracker.get_latest_histogram(&mut out);
        assert!(out.iter().any(|&v| v > 0.01));
    }

    #[test]
    fn silence_produces_near_zero_histogram() {
        let mut tracker = FrequencyTracker::new(FrequencyTrackerConfig {
            fft_size: 256,
            center_freq_hz: 1000.0,
            octave_divisions: 3.0,
            output_bin_count: 8,
            center_bin_index: 4,
            sample_rate_hz: 48000.0,
        });
        let silence = vec![0.0; 256];
        tracker.record(&silence, &silence);
        let mut out = vec![0.0; 8];
        tracker.get_latest_histogram(&mut out);
        for v in out {
            assert!(v.abs() < 1e-9);
        }
    }
}
