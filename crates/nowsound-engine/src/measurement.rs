//! The measurement processor (§4.7): transparent passthrough that feeds a
//! volume histogram, an optional frequency tracker, and an optional WAV
//! recording sink.

use std::path::PathBuf;

use nowsound_core::StereoSample;
use nowsound_core::Histogram;
use nowsound_dsp::{FrequencyTracker, FrequencyTrackerConfig};
use parking_lot::Mutex;

use crate::error::EngineResult;
use crate::spatial::MidiBuffer;
use crate::wav_writer::WavSink;

pub struct MeasurementProcessor {
    histogram: Histogram,
    tracker: Option<FrequencyTracker>,
    sample_rate_hz: u32,
    // The audio thread's only rendezvous with the control thread: cleared
    // under the mutex by `stop_recording` so the audio callback stops
    // writing immediately, with the writer's own shutdown happening
    // outside that critical section.
    sink: Mutex<Option<WavSink>>,
    scratch_ch0: Vec<f64>,
    scratch_ch1: Vec<f64>,
    scratch_interleaved: Vec<f32>,
}

impl MeasurementProcessor {
    pub fn new(sample_rate_hz: u32, fft_config: Option<FrequencyTrackerConfig>, histogram_capacity: usize) -> Self {
        Self {
            histogram: Histogram::new(histogram_capacity),
            tracker: fft_config.map(FrequencyTracker::new),
            sample_rate_hz,
            sink: Mutex::new(None),
            scratch_ch0: Vec::new(),
            scratch_ch1: Vec::new(),
            scratch_interleaved: Vec::new(),
        }
    }

    pub fn average_volume(&self) -> f64 {
        self.histogram.average()
    }

    pub fn get_latest_frequencies(&self, dst: &mut [f64]) {
        if let Some(tracker) = &self.tracker {
            tracker.get_latest_histogram(dst);
        } else {
            dst.fill(0.0);
        }
    }

    pub fn start_recording(&self, path: PathBuf) -> EngineResult<()> {
        let sink = WavSink::start(path, self.sample_rate_hz)?;
        *self.sink.lock() = Some(sink);
        Ok(())
    }

    /// Clears the rendezvous pointer first (the audio thread stops
    /// writing on its very next block) then shuts the writer down outside
    /// the lock.
    pub fn stop_recording(&self) {
        let sink = self.sink.lock().take();
        if let Some(sink) = sink {
            sink.stop();
        }
    }

    pub fn is_recording(&self) -> bool {
        self.sink.lock().is_some()
    }

    pub fn process_block(&mut self, audio_buffer: &mut [StereoSample], _midi_buffer: &mut MidiBuffer) {
        self.scratch_ch0.clear();
        self.scratch_ch1.clear();
        for sample in audio_buffer.iter() {
            self.scratch_ch0.push(sample.left);
            self.scratch_ch1.push(sample.right);
            self.histogram.add((sample.left.abs() + sample.right.abs()) * 0.5);
        }

        if let Some(tracker) = &mut self.tracker {
            tracker.record(&self.scratch_ch0, &self.scratch_ch1);
        }

        let mut sink_guard = self.sink.lock();
        if let Some(sink) = sink_guard.as_mut() {
            self.scratch_interleaved.clear();
            for sample in audio_buffer.iter() {
                self.scratch_interleaved.push(sample.left as f32);
                self.scratch_interleaved.push(sample.right as f32);
            }
            sink.push_interleaved(&self.scratch_interleaved);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_leaves_buffer_unchanged() {
        let mut probe = MeasurementProcessor::new(48_000, None, 16);
        let mut buf = vec![StereoSample::new(0.25, -0.5); 4];
        let before = buf.clone();
        probe.process_block(&mut buf, &mut MidiBuffer);
        assert_eq!(buf, before);
    }

    #[test]
    fn histogram_tracks_absolute_average() {
        let mut probe = MeasurementProcessor::new(48_000, None, 16);
        let mut buf = vec![StereoSample::new(0.5, -0.5); 4];
        probe.process_block(&mut buf, &mut MidiBuffer);
        assert!((probe.average_volume() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn recording_round_trips_through_the_rendezvous() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("probe.wav");
        let mut probe = MeasurementProcessor::new(48_000, None, 16);
        probe.start_recording(path.clone()).unwrap();
        assert!(probe.is_recording());
        let mut buf = vec![StereoSample::new(0.1, -0.1); 8];
        probe.process_block(&mut buf, &mut MidiBuffer);
        probe.stop_recording();
        assert!(!probe.is_recording());
        assert!(path.exists());
    }
}
