//! The track state machine (§4.8): Recording -> FinishRecording -> Looping.
//! Driven entirely from the audio callback except `finish_recording`,
//! which the control side calls to request the transition.

use nowsound_core::{
    AudioSample, Beat, BufferAllocator, BufferedSliceStream, Clock, ContinuousDuration, Duration,
    Interval, LoopingKind, StereoSample, Time,
};
use nowsound_dsp::FrequencyTrackerConfig;

use crate::constants::next_quantized_beat_duration;
use crate::ids::AudioInputId;
use crate::measurement::MeasurementProcessor;
use crate::spatial::{MidiBuffer, SpatialProcessor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    Recording,
    FinishRecording,
    Looping,
}

pub struct TrackProcessor {
    input_id: AudioInputId,
    state: TrackState,
    beat_duration: Duration<Beat>,
    own_stream: BufferedSliceStream<AudioSample, f64>,
    spatial: SpatialProcessor,
    measurement: MeasurementProcessor,
    // Plain, non-atomic field: the audio thread owns it exclusively during
    // `process_block`, the control thread only ever polls it through
    // `Graph`'s published per-block snapshot. One block of staleness is
    // harmless and the original engine makes the same tradeoff.
    just_stopped_recording: bool,
    scratch_mono: Vec<f64>,
}

impl TrackProcessor {
    pub fn new(
        input_id: AudioInputId,
        start_time: Time<AudioSample>,
        sample_rate_hz: u32,
        fft_config: Option<FrequencyTrackerConfig>,
        histogram_capacity: usize,
    ) -> Self {
        Self {
            input_id,
            state: TrackState::Recording,
            beat_duration: Duration::new(1),
            own_stream: BufferedSliceStream::new(start_time, 1, Duration::ZERO),
            spatial: SpatialProcessor::new(),
            measurement: MeasurementProcessor::new(sample_rate_hz, fft_config, histogram_capacity),
            just_stopped_recording: false,
            scratch_mono: Vec::new(),
        }
    }

    pub fn input_id(&self) -> AudioInputId {
        self.input_id
    }

    pub fn state(&self) -> TrackState {
        self.state
    }

    pub fn beat_duration(&self) -> Duration<Beat> {
        self.beat_duration
    }

    pub fn is_looping(&self) -> bool {
        self.state == TrackState::Looping
    }

    pub fn spatial(&self) -> &SpatialProcessor {
        &self.spatial
    }

    pub fn spatial_mut(&mut self) -> &mut SpatialProcessor {
        &mut self.spatial
    }

    pub fn own_stream(&self) -> &BufferedSliceStream<AudioSample, f64> {
        &self.own_stream
    }

    /// Returns this track's owned buffers to `allocator`'s free list. Must
    /// be called before a track is dropped, or its buffers are stranded
    /// outside the pool for the lifetime of the graph.
    pub fn release(self, allocator: &mut BufferAllocator<f64>) {
        self.own_stream.release(allocator);
    }

    pub fn measurement(&self) -> &MeasurementProcessor {
        &self.measurement
    }

    pub fn just_stopped_recording(&self) -> bool {
        self.just_stopped_recording
    }

    pub fn clear_just_stopped_recording(&mut self) {
        self.just_stopped_recording = false;
    }

    /// Requested from the control thread. A single non-atomic write; the
    /// audio thread may see it up to one block late.
    pub fn finish_recording(&mut self) {
        if self.state == TrackState::Recording {
            self.state = TrackState::FinishRecording;
        }
    }

    /// Copies a span of the bound input's rolling capture straight onto the
    /// tail of this (still-open) track stream, ahead of any live recording.
    /// Used once at track creation to implement a pre-record window; `self`
    /// must still be empty and `interval` must start at `self`'s own
    /// `initial_time`.
    pub fn prepend_history(
        &mut self,
        allocator: &mut BufferAllocator<f64>,
        source: &BufferedSliceStream<AudioSample, f64>,
        interval: Interval<AudioSample>,
    ) {
        source.append_to(interval, &mut self.own_stream, allocator);
    }

    /// Appends this block's worth of the bound input's capture into the
    /// track's own stream, live from `input_stream` over `source_interval`
    /// (exactly this block's span). Must only be called while `state` is
    /// `Recording` or `FinishRecording`.
    fn record_block(
        &mut self,
        n_frames: usize,
        allocator: &mut BufferAllocator<f64>,
        clock: &Clock,
        input_stream: &BufferedSliceStream<AudioSample, f64>,
        source_interval: Interval<AudioSample>,
    ) {
        let sample_rate_hz = clock.sample_rate_hz();
        let tempo = clock.tempo();
        let spb = tempo.continuous_samples_per_beat(sample_rate_hz);
        let target_continuous = ContinuousDuration::<AudioSample>::from_non_negative(
            self.beat_duration.value() as f64 * spb.value(),
        );
        let target_length = if self.state == TrackState::FinishRecording {
            Some(Duration::<AudioSample>::rounded_up(target_continuous))
        } else {
            None
        };

        let remaining_capacity = target_length.map(|t| t.value() - self.own_stream.discrete_duration().value());
        let to_copy = match remaining_capacity {
            Some(cap) => (n_frames as i64).min(cap.max(0)) as usize,
            None => n_frames,
        };

        if to_copy > 0 {
            self.scratch_mono.resize(to_copy, 0.0);
            let copy_interval = Interval::forwards(source_interval.start(), Duration::new(to_copy as i64));
            unsafe {
                input_stream.copy_to(copy_interval, &mut self.scratch_mono);
            }
            self.own_stream.append_values(allocator, to_copy, &self.scratch_mono);
        }

        match self.state {
            TrackState::Recording => {
                let completed_beats =
                    (self.own_stream.discrete_duration().value() as f64 / spb.value()).floor() as u32;
                if completed_beats >= self.beat_duration.value() as u32 {
                    self.beat_duration = Duration::new(next_quantized_beat_duration(self.beat_duration.value() as u32) as i64);
                    let new_completed = (self.own_stream.discrete_duration().value() as f64 / spb.value()).floor() as i64;
                    assert!(
                        new_completed <= self.beat_duration.value(),
                        "recording overran its just-grown beat duration"
                    );
                }
            }
            TrackState::FinishRecording => {
                if let Some(target) = target_length {
                    if self.own_stream.discrete_duration().value() >= target.value() {
                        self.own_stream.shut(target_continuous, LoopingKind::Exact);
                        self.state = TrackState::Looping;
                        self.just_stopped_recording = true;
                    }
                }
            }
            TrackState::Looping => unreachable!("record_block only called while recording"),
        }
    }

    fn play_looped_block(&mut self, audio_buffer: &mut [StereoSample], clock: &Clock) {
        let n = audio_buffer.len();
        let start = clock.now() - Duration::new(n as i64);
        let mut remaining = Interval::forwards(start, Duration::new(n as i64));
        let mut written = 0usize;
        while !remaining.is_empty() {
            let slice = self.own_stream.get_slice_containing(remaining);
            assert!(!slice.is_empty(), "shut loop stream must answer every query");
            let len = slice.length();
            let data = unsafe { slice.as_slice() };
            for (i, &v) in data.iter().enumerate() {
                audio_buffer[written + i] = StereoSample::mono(v);
            }
            written += len;
            remaining = remaining.suffix(Duration::new(len as i64));
        }
    }

    /// `audio_buffer`'s contents on entry are ignored; this processor
    /// produces its own output from its recorded/looping stream state.
    /// `clock` must already reflect the time *after* this block (i.e. the
    /// primary input has already advanced it), since looped playback reads
    /// backwards from `clock.now()` by the block length.
    pub fn process_block(
        &mut self,
        audio_buffer: &mut [StereoSample],
        allocator: &mut BufferAllocator<f64>,
        clock: &Clock,
        input_stream: &BufferedSliceStream<AudioSample, f64>,
        source_interval: Interval<AudioSample>,
        midi_buffer: &mut MidiBuffer,
    ) {
        match self.state {
            TrackState::Recording | TrackState::FinishRecording => {
                self.record_block(audio_buffer.len(), allocator, clock, input_stream, source_interval);
                audio_buffer.fill(StereoSample::default());
                if self.state == TrackState::Looping {
                    self.play_looped_block(audio_buffer, clock);
                    self.spatial.process_block(audio_buffer, midi_buffer);
                }
            }
            TrackState::Looping => {
                self.play_looped_block(audio_buffer, clock);
                self.spatial.process_block(audio_buffer, midi_buffer);
            }
        }
        self.measurement.process_block(audio_buffer, midi_buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nowsound_core::Tempo;

    fn make_clock() -> Clock {
        Clock::new(48000.0, 2, Tempo { beats_per_minute: 60.0, beats_per_measure: 4 })
    }

    #[test]
    fn recording_grows_beat_duration_on_schedule() {
        let clock = make_clock();
        let mut alloc = BufferAllocator::new(1 << 16, 4);
        let mut input_stream: BufferedSliceStream<AudioSample, f64> =
            BufferedSliceStream::new(Time::new(0), 1, Duration::ZERO);
        let spb = clock.tempo().continuous_samples_per_beat(clock.sample_rate_hz()).value();
        let one_beat = spb.ceil() as usize + 1;
        let data = vec![0.25f64; one_beat];
        input_stream.append_values(&mut alloc, one_beat, &data);

        let mut track = TrackProcessor::new(AudioInputId::new(1).unwrap(), Time::new(0), 48_000, None, 16);
        let mut buf = vec![StereoSample::default(); one_beat];
        let interval = Interval::forwards(Time::new(0), Duration::new(one_beat as i64));
        clock.advance(Duration::new(one_beat as i64));
        track.process_block(&mut buf, &mut alloc, &clock, &input_stream, interval, &mut MidiBuffer);

        assert_eq!(track.beat_duration().value(), 2);
    }

    #[test]
    fn finish_recording_shuts_stream_and_flags_stop() {
        let clock = make_clock();
        let mut alloc = BufferAllocator::new(1 << 16, 4);
        let spb = clock.tempo().continuous_samples_per_beat(clock.sample_rate_hz()).value();
        let one_beat_len = spb.ceil() as usize;
        let mut input_stream: BufferedSliceStream<AudioSample, f64> =
            BufferedSliceStream::new(Time::new(0), 1, Duration::ZERO);
        let data = vec![0.5f64; one_beat_len * 2];
        input_stream.append_values(&mut alloc, one_beat_len * 2, &data);

        let mut track = TrackProcessor::new(AudioInputId::new(1).unwrap(), Time::new(0), 48_000, None, 16);
        track.beat_duration = Duration::new(1);
        track.finish_recording();
        assert_eq!(track.state(), TrackState::FinishRecording);

        let mut buf = vec![StereoSample::default(); one_beat_len * 2];
        let interval = Interval::forwards(Time::new(0), Duration::new((one_beat_len * 2) as i64));
        clock.advance(Duration::new((one_beat_len * 2) as i64));
        track.process_block(&mut buf, &mut alloc, &clock, &input_stream, interval, &mut MidiBuffer);

        assert_eq!(track.state(), TrackState::Looping);
        assert!(track.just_stopped_recording());
        assert!(track.own_stream().is_shut());
    }
}
