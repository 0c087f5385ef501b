//! The Input processor (§4.7): wraps a spatial processor, specialized with
//! a rolling capture stream and a raw-volume histogram. The graph's
//! primary input also advances the shared clock — the single point where
//! the audio thread and the musical clock meet.

use nowsound_core::{AudioSample, BufferAllocator, BufferedSliceStream, Duration, Histogram, StereoSample, Time};
use nowsound_dsp::FrequencyTrackerConfig;

use crate::ids::AudioInputId;
use crate::measurement::MeasurementProcessor;
use crate::spatial::{MidiBuffer, SpatialProcessor};

pub struct InputProcessor {
    id: AudioInputId,
    is_primary: bool,
    incoming_audio_stream: BufferedSliceStream<AudioSample, f64>,
    raw_input_histogram: Histogram,
    spatial: SpatialProcessor,
    measurement: MeasurementProcessor,
    scratch_mono: Vec<f64>,
}

impl InputProcessor {
    pub fn new(
        id: AudioInputId,
        is_primary: bool,
        start_time: Time<AudioSample>,
        max_buffered_duration: Duration<AudioSample>,
        sample_rate_hz: u32,
        fft_config: Option<FrequencyTrackerConfig>,
        histogram_capacity: usize,
    ) -> Self {
        Self {
            id,
            is_primary,
            incoming_audio_stream: BufferedSliceStream::new(start_time, 1, max_buffered_duration),
            raw_input_histogram: Histogram::new(histogram_capacity),
            spatial: SpatialProcessor::new(),
            measurement: MeasurementProcessor::new(sample_rate_hz, fft_config, histogram_capacity),
            scratch_mono: Vec::new(),
        }
    }

    pub fn id(&self) -> AudioInputId {
        self.id
    }

    pub fn is_primary(&self) -> bool {
        self.is_primary
    }

    pub fn spatial(&self) -> &SpatialProcessor {
        &self.spatial
    }

    pub fn spatial_mut(&mut self) -> &mut SpatialProcessor {
        &mut self.spatial
    }

    pub fn incoming_audio_stream(&self) -> &BufferedSliceStream<AudioSample, f64> {
        &self.incoming_audio_stream
    }

    /// Returns this input's owned buffers to `allocator`'s free list. Must
    /// be called before an input is dropped, or its buffers are stranded
    /// outside the pool for the lifetime of the graph.
    pub fn release(self, allocator: &mut BufferAllocator<f64>) {
        self.incoming_audio_stream.release(allocator);
    }

    pub fn raw_average_volume(&self) -> f64 {
        self.raw_input_histogram.average()
    }

    pub fn measurement(&self) -> &MeasurementProcessor {
        &self.measurement
    }

    /// `audio_buffer` holds this block's mono capture in `.left` on entry,
    /// the panned stereo result on return. The clock must already reflect
    /// the *start* of this block; a caller that also advances the clock
    /// for the primary input does so after this call returns, so every
    /// input's rolling stream stays addressed by the same absolute times a
    /// bound track will later query with.
    pub fn process_block(
        &mut self,
        audio_buffer: &mut [StereoSample],
        allocator: &mut BufferAllocator<f64>,
        midi_buffer: &mut MidiBuffer,
    ) {
        self.scratch_mono.clear();
        self.scratch_mono.extend(audio_buffer.iter().map(|s| s.left));
        self.incoming_audio_stream
            .append_values(allocator, audio_buffer.len(), &self.scratch_mono);
        unsafe {
            self.raw_input_histogram
                .add_all(self.scratch_mono.as_ptr(), self.scratch_mono.len(), true);
        }

        self.spatial.process_block(audio_buffer, midi_buffer);
        self.measurement.process_block(audio_buffer, midi_buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nowsound_core::Interval;

    #[test]
    fn process_block_appends_and_pans() {
        let mut alloc = BufferAllocator::new(256, 2);
        let mut input = InputProcessor::new(
            AudioInputId::new(1).unwrap(),
            true,
            Time::new(0),
            Duration::ZERO,
            48_000,
            None,
            16,
        );
        let mut buf = vec![StereoSample::mono(0.5); 4];
        input.process_block(&mut buf, &mut alloc, &mut MidiBuffer);
        assert_eq!(input.incoming_audio_stream().discrete_duration().value(), 4);
        assert!((input.raw_average_volume() - 0.5).abs() < 1e-9);

        let mut out = vec![0.0f64; 4];
        unsafe {
            input
                .incoming_audio_stream()
                .copy_to(Interval::forwards(Time::new(0), Duration::new(4)), &mut out);
        }
        assert_eq!(out, vec![0.5, 0.5, 0.5, 0.5]);
    }
}
