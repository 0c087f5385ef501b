//! The musical clock: sample-accurate wall time plus a fixed tempo.
//!
//! Tempo and time signature are fixed for the lifetime of a session once a
//! track exists (an explicit non-goal to support changing either), so this
//! is deliberately far simpler than a tempo-ramp/time-signature-map: a BPM,
//! a beats-per-measure count, and a running sample position.

use crate::constants::{BEATS_PER_MEASURE, CLOCK_EPSILON, INITIAL_BEATS_PER_MINUTE};
use crate::time::{AudioSample, Beat, ContinuousDuration, ContinuousTime, Duration, Time};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Tempo {
    pub beats_per_minute: f64,
    pub beats_per_measure: u32,
}

impl Default for Tempo {
    fn default() -> Self {
        Self {
            beats_per_minute: INITIAL_BEATS_PER_MINUTE,
            beats_per_measure: BEATS_PER_MEASURE,
        }
    }
}

impl Tempo {
    /// Samples per beat at this tempo and sample rate, as a continuous
    /// (generally non-integer) quantity.
    pub fn continuous_samples_per_beat(&self, sample_rate_hz: f64) -> ContinuousDuration<AudioSample> {
        ContinuousDuration::from_non_negative((60.0 / self.beats_per_minute) * sample_rate_hz)
    }

    pub fn samples_to_beats(&self, samples: Time<AudioSample>, sample_rate_hz: f64) -> ContinuousTime<Beat> {
        let spb = self.continuous_samples_per_beat(sample_rate_hz).value();
        ContinuousTime::new(samples.value() as f64 / spb)
    }

    pub fn beats_to_samples(&self, beats: Duration<Beat>, sample_rate_hz: f64) -> Duration<AudioSample> {
        let spb = self.continuous_samples_per_beat(sample_rate_hz).value();
        Duration::new((beats.value() as f64 * spb).round() as i64)
    }

    pub fn continuous_beats_to_samples(
        &self,
        beats: ContinuousDuration<Beat>,
        sample_rate_hz: f64,
    ) -> ContinuousDuration<AudioSample> {
        let spb = self.continuous_samples_per_beat(sample_rate_hz).value();
        ContinuousDuration::from_non_negative(beats.value() * spb)
    }
}

/// Sample-accurate, monotonically advancing position in the audio stream.
/// Only the designated first input processor (§4.7 Input) advances this;
/// every other reader treats it as read-only.
pub struct Clock {
    sample_rate_hz: f64,
    channel_count: u16,
    now: AtomicI64,
    tempo: Tempo,
}

impl Clock {
    pub fn new(sample_rate_hz: f64, channel_count: u16, tempo: Tempo) -> Self {
        Self { sample_rate_hz, channel_count, now: AtomicI64::new(0), tempo }
    }

    pub fn sample_rate_hz(&self) -> f64 {
        self.sample_rate_hz
    }

    pub fn channel_count(&self) -> u16 {
        self.channel_count
    }

    pub fn tempo(&self) -> Tempo {
        self.tempo
    }

    pub fn now(&self) -> Time<AudioSample> {
        Time::new(self.now.load(Ordering::Acquire))
    }

    /// Advances the clock by a block's sample count. Called exactly once
    /// per block, by the audio thread's first input processor.
    pub fn advance(&self, block_samples: Duration<AudioSample>) {
        self.now.fetch_add(block_samples.value(), Ordering::AcqRel);
    }

    pub fn now_beats(&self) -> ContinuousTime<Beat> {
        self.tempo.samples_to_beats(self.now(), self.sample_rate_hz)
    }

    /// Whether `a` and `b` are equal within the clock's float tolerance.
    pub fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < CLOCK_EPSILON
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tempo_beats_to_samples_round_trip() {
        let tempo = Tempo { beats_per_minute: 120.0, beats_per_measure: 4 };
        let spb = tempo.continuous_samples_per_beat(48000.0).value();
        assert!((spb - 24000.0).abs() < 1e-9);
    }

    #[test]
    fn clock_advance_accumulates() {
        let clock = Clock::new(48000.0, 2, Tempo::default());
        clock.advance(Duration::new(512));
        clock.advance(Duration::new(512));
        assert_eq!(clock.now().value(), 1024);
    }
}
