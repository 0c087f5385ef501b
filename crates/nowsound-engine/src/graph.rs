//! Graph orchestrator (§4.9). Replaces the teacher's generic
//! `HashMap<NodeId, Box<dyn AudioNode>>` arena and per-block topological
//! sort: once the effect chain moved inside each probe (§4.7.1) there are
//! no inter-node connections left to sort, so processing order collapses
//! to a fixed two-pass sweep — every input, then every track — enforced
//! directly by `process_block` rather than recomputed from a connection
//! list.

use std::collections::HashMap;
use std::path::PathBuf;

use log::{debug, error, info};
use nowsound_core::{AudioSample, Clock, Duration, Interval, StereoSample, Tempo, Time};
use nowsound_dsp::{make_bin_bounds, BinBound, FrequencyTrackerConfig};
use serde::{Deserialize, Serialize};

use crate::constants as engine_constants;
use crate::error::EngineResult;
use crate::ids::{AudioInputId, PluginId, PluginInstanceIndex, ProgramId, TrackId};
use crate::input::InputProcessor;
use crate::plugin::{PassthroughRegistry, PluginRegistry};
use crate::spatial::MidiBuffer;
use crate::track::{TrackProcessor, TrackState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphState {
    Uninitialized,
    Initialized,
    Running,
    InError,
    Shut,
}

/// Which probe a plugin/signal-info/frequency operation targets (§6: "probe
/// = input or track").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeId {
    Input(AudioInputId),
    Track(TrackId),
}

/// FFT window and logarithmic bin layout, seeded from the magic-constants
/// table and overridable per the teacher's `low_latency`/`high_quality`
/// config pattern.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FftParams {
    pub fft_size: usize,
    pub center_freq_hz: f64,
    pub octave_divisions: f64,
    pub output_bin_count: usize,
    pub center_bin_index: usize,
}

impl Default for FftParams {
    fn default() -> Self {
        Self {
            fft_size: 2048,
            center_freq_hz: 440.0,
            octave_divisions: 6.0,
            output_bin_count: 64,
            center_bin_index: 32,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    pub sample_rate_hz: u32,
    pub block_size_frames: usize,
    pub input_channel_count: u16,
    pub initial_buffer_count: usize,
    pub fft: FftParams,
    pub pre_record_seconds: f64,
    pub histogram_capacity: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 48_000,
            block_size_frames: 256,
            input_channel_count: 1,
            initial_buffer_count: nowsound_core::INITIAL_AUDIO_BUFFER_COUNT,
            fft: FftParams::default(),
            pre_record_seconds: nowsound_core::PRE_RECORDING_DURATION_SECONDS,
            histogram_capacity: nowsound_core::AUDIO_QUANTUM_HISTOGRAM_CAPACITY,
        }
    }
}

impl GraphConfig {
    /// Smaller FFT, shorter pre-record window: favors responsiveness over
    /// visualization/prepend fidelity.
    pub fn low_latency() -> Self {
        Self {
            block_size_frames: 64,
            fft: FftParams { fft_size: 512, output_bin_count: 32, ..FftParams::default() },
            pre_record_seconds: 1.0,
            ..Self::default()
        }
    }

    /// Larger FFT and pre-record window, at the cost of per-block work and
    /// buffered memory.
    pub fn high_quality() -> Self {
        Self {
            block_size_frames: 512,
            fft: FftParams { fft_size: 4096, output_bin_count: 128, ..FftParams::default() },
            pre_record_seconds: 5.0,
            ..Self::default()
        }
    }

    fn frequency_tracker_config(&self) -> FrequencyTrackerConfig {
        FrequencyTrackerConfig {
            fft_size: self.fft.fft_size,
            center_freq_hz: self.fft.center_freq_hz,
            octave_divisions: self.fft.octave_divisions,
            output_bin_count: self.fft.output_bin_count,
            center_bin_index: self.fft.center_bin_index,
            sample_rate_hz: self.sample_rate_hz as f64,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SignalInfo {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct GraphInfo {
    pub sample_rate_hz: u32,
    pub channel_count: u16,
    pub bits_per_sample: u16,
    pub latency_samples: usize,
    pub samples_per_quantum: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct TimeInfo {
    pub time_samples: i64,
    pub exact_beat: f64,
    pub bpm: f64,
    pub beats_per_measure: u32,
    pub beat_in_measure: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct NowSoundTrackInfo {
    pub is_looping: bool,
    pub beat_duration: u32,
    pub exact_duration_samples: i64,
    pub current_local_time_samples: i64,
    pub current_local_beat: f64,
    pub pan: f64,
    pub volume: f64,
    pub bpm: f64,
    pub beats_per_measure: u32,
}

/// The processor graph. Owned entirely by the audio callback closure; a
/// caller wanting cross-thread access (e.g. an FFI boundary, out of scope
/// here per §6) is responsible for its own synchronization, same as the
/// teacher leaves device/stream lifetime management to its own caller.
pub struct Graph {
    state: GraphState,
    changing_state: bool,
    config: GraphConfig,
    clock: Clock,
    allocator: nowsound_core::BufferAllocator<f64>,
    plugin_registry: Box<dyn PluginRegistry>,
    bin_bounds: Vec<BinBound>,
    inputs: HashMap<AudioInputId, InputProcessor>,
    input_order: Vec<AudioInputId>,
    tracks: HashMap<TrackId, TrackProcessor>,
    track_order: Vec<TrackId>,
    next_track_id: u32,
    output_measurement_min: f64,
    output_measurement_max: f64,
    output_histogram: nowsound_core::Histogram,
    scratch_output: Vec<StereoSample>,
    scratch_track: Vec<StereoSample>,
    scratch_channel: Vec<f64>,
}

impl Graph {
    /// Step 1-4 of §4.9's init sequence belong to the caller (bringing up
    /// the audio backend and negotiating `config`); this constructor
    /// performs step 3 (buffer pool) and 4 (FFT bin bounds) and leaves the
    /// graph `Uninitialized` until `wire_inputs` completes step 5.
    pub fn new(config: GraphConfig) -> Self {
        let tempo = Tempo { beats_per_minute: nowsound_core::INITIAL_BEATS_PER_MINUTE, beats_per_measure: nowsound_core::BEATS_PER_MEASURE };
        let clock = Clock::new(config.sample_rate_hz as f64, 2, tempo);
        let buffer_length = (config.sample_rate_hz as f64 * nowsound_core::AUDIO_BUFFER_SIZE_SECONDS) as usize;
        let allocator = nowsound_core::BufferAllocator::new(buffer_length.max(1), config.initial_buffer_count);
        let bin_bounds = make_bin_bounds(
            config.fft.center_freq_hz,
            config.fft.octave_divisions,
            config.fft.output_bin_count,
            config.fft.center_bin_index,
            config.sample_rate_hz as f64,
            config.fft.fft_size,
        );

        Self {
            state: GraphState::Uninitialized,
            changing_state: false,
            config,
            clock,
            allocator,
            plugin_registry: Box::new(PassthroughRegistry),
            bin_bounds,
            inputs: HashMap::new(),
            input_order: Vec::new(),
            tracks: HashMap::new(),
            track_order: Vec::new(),
            next_track_id: 1,
            output_measurement_min: 0.0,
            output_measurement_max: 0.0,
            output_histogram: nowsound_core::Histogram::new(nowsound_core::AUDIO_QUANTUM_HISTOGRAM_CAPACITY),
            scratch_output: Vec::new(),
            scratch_track: Vec::new(),
            scratch_channel: Vec::new(),
        }
    }

    pub fn state(&self) -> GraphState {
        self.state
    }

    fn begin_state_change(&mut self) {
        assert!(!self.changing_state, "re-entrant graph state transition");
        self.changing_state = true;
    }

    fn end_state_change(&mut self, new_state: GraphState) {
        self.state = new_state;
        self.changing_state = false;
    }

    /// Step 5: one input processor per negotiated input channel, the first
    /// marked primary (the one that advances the clock). Step 6 (starting
    /// the backend) is the caller's responsibility once this returns.
    pub fn wire_inputs(&mut self) {
        assert_eq!(self.state, GraphState::Uninitialized, "wire_inputs requires an uninitialized graph");
        self.begin_state_change();

        let max_buffered = Duration::<AudioSample>::rounded_up(
            nowsound_core::ContinuousDuration::from_non_negative(self.config.pre_record_seconds * 2.0 * self.config.sample_rate_hz as f64),
        );
        for channel in 0..self.config.input_channel_count.max(1) {
            let id = AudioInputId::new((channel as u32) + 1).expect("input channel index overflowed id space");
            let input = InputProcessor::new(
                id,
                channel == 0,
                Time::new(0),
                max_buffered,
                self.config.sample_rate_hz,
                Some(self.config.frequency_tracker_config()),
                self.config.histogram_capacity,
            );
            self.inputs.insert(id, input);
            self.input_order.push(id);
        }

        info!("wired {} input(s) at {} Hz", self.input_order.len(), self.config.sample_rate_hz);
        self.end_state_change(GraphState::Initialized);
    }

    pub fn start(&mut self) {
        assert_eq!(self.state, GraphState::Initialized, "start requires an initialized graph");
        self.begin_state_change();
        info!("graph running");
        self.end_state_change(GraphState::Running);
    }

    pub fn shutdown(&mut self) {
        self.begin_state_change();
        let track_count = self.tracks.len();
        self.track_order.clear();
        for (_, track) in self.tracks.drain() {
            track.measurement().stop_recording();
            track.release(&mut self.allocator);
        }
        for (_, input) in self.inputs.drain() {
            input.measurement().stop_recording();
            input.release(&mut self.allocator);
        }
        info!("graph shut down, {track_count} track(s) released");
        self.end_state_change(GraphState::Shut);
    }

    pub fn mark_error(&mut self) {
        error!("graph entered InError state");
        self.state = GraphState::InError;
        self.changing_state = false;
    }

    pub fn graph_info(&self) -> GraphInfo {
        assert!(self.state != GraphState::Uninitialized, "graph_info requires an initialized graph");
        GraphInfo {
            sample_rate_hz: self.config.sample_rate_hz,
            channel_count: 2,
            bits_per_sample: engine_constants::WAV_SINK_BITS_PER_SAMPLE,
            latency_samples: self.config.block_size_frames,
            samples_per_quantum: self.config.block_size_frames,
        }
    }

    pub fn time_info(&self) -> TimeInfo {
        assert_eq!(self.state, GraphState::Running, "time_info requires a running graph");
        let tempo = self.clock.tempo();
        let exact_beat = self.clock.now_beats().value();
        let beats_per_measure = tempo.beats_per_measure as f64;
        TimeInfo {
            time_samples: self.clock.now().value(),
            exact_beat,
            bpm: tempo.beats_per_minute,
            beats_per_measure: tempo.beats_per_measure,
            beat_in_measure: exact_beat.rem_euclid(beats_per_measure),
        }
    }

    /// §4.9: "Tracks created at time T begin their stream at T (optionally
    /// offset backward by a pre-record window copied from the input's
    /// rolling buffer)". `prepend_seconds` is clamped to what the input has
    /// actually buffered so far.
    pub fn create_recording_track(&mut self, input_id: AudioInputId, prepend_seconds: f64) -> TrackId {
        assert_eq!(self.state, GraphState::Running, "create_recording_track requires a running graph");
        let input = self.inputs.get(&input_id).unwrap_or_else(|| {
            error!("create_recording_track: unknown input id {input_id:?}");
            panic!("unknown input id {input_id:?}")
        });

        let now = self.clock.now();
        let requested = Duration::<AudioSample>::rounded_down(nowsound_core::ContinuousDuration::from_non_negative(
            prepend_seconds.max(0.0) * self.config.sample_rate_hz as f64,
        ));
        let available = input.incoming_audio_stream().discrete_duration();
        let prepend = Duration::<AudioSample>::new(requested.value().min(available.value()));
        let start_time = now - prepend;

        let id = TrackId::new(self.next_track_id).expect("track id space exhausted");
        self.next_track_id += 1;

        let mut track = TrackProcessor::new(
            input_id,
            start_time,
            self.config.sample_rate_hz,
            Some(self.config.frequency_tracker_config()),
            self.config.histogram_capacity,
        );
        if !prepend.is_zero() {
            let interval = Interval::forwards(start_time, prepend);
            track.prepend_history(&mut self.allocator, input.incoming_audio_stream(), interval);
        }

        self.tracks.insert(id, track);
        self.track_order.push(id);
        debug!("created track {id:?} on input {input_id:?}, prepend {} samples", prepend.value());
        id
    }

    pub fn delete_track(&mut self, track_id: TrackId) {
        assert_eq!(self.state, GraphState::Running, "delete_track requires a running graph");
        self.track_order.retain(|&id| id != track_id);
        let track = self.tracks.remove(&track_id).unwrap_or_else(|| {
            error!("delete_track: unknown track id {track_id:?}");
            panic!("unknown track id {track_id:?}")
        });
        track.measurement().stop_recording();
        track.release(&mut self.allocator);
        debug!("deleted track {track_id:?}");
    }

    pub fn finish_recording(&mut self, track_id: TrackId) {
        let track = self.tracks.get_mut(&track_id).unwrap_or_else(|| {
            error!("finish_recording: unknown track id {track_id:?}");
            panic!("unknown track id {track_id:?}")
        });
        assert_eq!(track.state(), TrackState::Recording, "finish_recording requires a recording track");
        track.finish_recording();
        debug!("track {track_id:?} transitioning to FinishRecording");
    }

    pub fn track_info(&self, track_id: TrackId) -> NowSoundTrackInfo {
        let track = self.tracks.get(&track_id).unwrap_or_else(|| panic!("unknown track id {track_id:?}"));
        let tempo = self.clock.tempo();
        let spb = tempo.continuous_samples_per_beat(self.clock.sample_rate_hz()).value();
        let local_time = if track.is_looping() { self.clock.now().value() % track.own_stream().discrete_duration().value().max(1) } else { 0 };
        NowSoundTrackInfo {
            is_looping: track.is_looping(),
            beat_duration: track.beat_duration().value() as u32,
            exact_duration_samples: track.own_stream().discrete_duration().value(),
            current_local_time_samples: local_time,
            current_local_beat: local_time as f64 / spb,
            pan: track.spatial().pan(),
            volume: track.spatial().volume(),
            bpm: tempo.beats_per_minute,
            beats_per_measure: tempo.beats_per_measure,
        }
    }

    /// Polls every track's `just_stopped_recording` flag, clearing it as it
    /// goes, and returns the tracks that transitioned this tick so the
    /// caller can drop their input-side wiring (§4.9 periodic message
    /// tick). There is no separate input-side edge to remove in this
    /// topology; the flag alone is the signal a caller needs.
    pub fn message_tick(&mut self) -> Vec<TrackId> {
        let mut stopped = Vec::new();
        for (&id, track) in self.tracks.iter_mut() {
            if track.just_stopped_recording() {
                track.clear_just_stopped_recording();
                stopped.push(id);
            }
        }
        stopped
    }

    fn probe_spatial_mut(&mut self, probe: ProbeId) -> &mut crate::spatial::SpatialProcessor {
        match probe {
            ProbeId::Input(id) => self.inputs.get_mut(&id).unwrap_or_else(|| panic!("unknown input id {id:?}")).spatial_mut(),
            ProbeId::Track(id) => self.tracks.get_mut(&id).unwrap_or_else(|| panic!("unknown track id {id:?}")).spatial_mut(),
        }
    }

    pub fn set_mute(&mut self, probe: ProbeId, muted: bool) {
        self.probe_spatial_mut(probe).set_mute(muted);
    }

    pub fn set_pan(&mut self, probe: ProbeId, pan: f64) {
        self.probe_spatial_mut(probe).set_pan(pan);
    }

    pub fn set_volume(&mut self, probe: ProbeId, volume: f64) {
        self.probe_spatial_mut(probe).set_volume(volume);
    }

    pub fn add_plugin_instance(
        &mut self,
        probe: ProbeId,
        plugin_id: PluginId,
        program_id: ProgramId,
        drywet_0_100: f64,
    ) -> PluginInstanceIndex {
        let block_size = self.config.block_size_frames;
        let registry = self.plugin_registry.as_ref();
        // Matched directly against `self.inputs`/`self.tracks` (rather than
        // through `probe_spatial_mut`, which takes `&mut self`) so this
        // borrow stays disjoint from the `self.plugin_registry` borrow above.
        let spatial = match probe {
            ProbeId::Input(id) => self.inputs.get_mut(&id).unwrap_or_else(|| panic!("unknown input id {id:?}")).spatial_mut(),
            ProbeId::Track(id) => self.tracks.get_mut(&id).unwrap_or_else(|| panic!("unknown track id {id:?}")).spatial_mut(),
        };
        spatial.chain_mut().add(registry, plugin_id, program_id, drywet_0_100, block_size)
    }

    pub fn set_plugin_instance_drywet(&mut self, probe: ProbeId, index: PluginInstanceIndex, level_0_100: f64) {
        self.probe_spatial_mut(probe).chain_mut().set_drywet(index, level_0_100);
    }

    pub fn delete_plugin_instance(&mut self, probe: ProbeId, index: PluginInstanceIndex) {
        self.probe_spatial_mut(probe).chain_mut().delete(index);
    }

    pub fn raw_input_signal_info(&self, input_id: AudioInputId) -> SignalInfo {
        let input = self.inputs.get(&input_id).unwrap_or_else(|| panic!("unknown input id {input_id:?}"));
        SignalInfo { min: 0.0, max: 0.0, avg: input.raw_average_volume() }
    }

    pub fn input_signal_info(&self, input_id: AudioInputId) -> SignalInfo {
        let input = self.inputs.get(&input_id).unwrap_or_else(|| panic!("unknown input id {input_id:?}"));
        SignalInfo { min: 0.0, max: 0.0, avg: input.measurement().average_volume() }
    }

    pub fn output_signal_info(&self) -> SignalInfo {
        SignalInfo { min: self.output_measurement_min, max: self.output_measurement_max, avg: self.output_histogram.average() }
    }

    pub fn get_input_frequencies(&self, input_id: AudioInputId, dst: &mut [f64]) {
        assert_eq!(dst.len(), self.bin_bounds.len(), "frequency buffer length must equal the output bin count");
        let input = self.inputs.get(&input_id).unwrap_or_else(|| panic!("unknown input id {input_id:?}"));
        input.measurement().get_latest_frequencies(dst);
    }

    pub fn get_track_frequencies(&self, track_id: TrackId, dst: &mut [f64]) {
        assert_eq!(dst.len(), self.bin_bounds.len(), "frequency buffer length must equal the output bin count");
        let track = self.tracks.get(&track_id).unwrap_or_else(|| panic!("unknown track id {track_id:?}"));
        track.measurement().get_latest_frequencies(dst);
    }

    pub fn start_recording(&self, probe: ProbeId, path: PathBuf) -> EngineResult<()> {
        match probe {
            ProbeId::Input(id) => self.inputs.get(&id).unwrap_or_else(|| panic!("unknown input id {id:?}")).measurement().start_recording(path),
            ProbeId::Track(id) => self.tracks.get(&id).unwrap_or_else(|| panic!("unknown track id {id:?}")).measurement().start_recording(path),
        }
    }

    pub fn stop_recording(&self, probe: ProbeId) {
        match probe {
            ProbeId::Input(id) => self.inputs.get(&id).unwrap_or_else(|| panic!("unknown input id {id:?}")).measurement().stop_recording(),
            ProbeId::Track(id) => self.tracks.get(&id).unwrap_or_else(|| panic!("unknown track id {id:?}")).measurement().stop_recording(),
        }
    }

    /// The audio callback's entry point: interleaved stereo `f32` in,
    /// interleaved stereo `f32` out, matching `nowsound_audio::AudioCallback`
    /// exactly so a caller can hand this straight to `AudioStream::new`.
    ///
    /// Ordering (§5): every input is processed — and the clock advanced,
    /// via the primary input — before any track reads from the clock or
    /// from an input's rolling stream for this block.
    pub fn process_block(&mut self, input_block: &[f32], output_block: &mut [f32]) {
        assert_eq!(self.state, GraphState::Running, "process_block requires a running graph");
        let n = output_block.len() / 2;
        assert_eq!(output_block.len(), n * 2, "output block must hold whole stereo frames");

        let block_start = self.clock.now();
        let mut midi = MidiBuffer;

        self.scratch_output.clear();
        self.scratch_output.resize(n, StereoSample::default());

        let input_channels = self.input_order.len();
        for (channel_index, &input_id) in self.input_order.iter().enumerate() {
            self.scratch_channel.clear();
            self.scratch_channel.resize(n, 0.0);
            for frame in 0..n {
                let sample_index = frame * input_channels + channel_index;
                self.scratch_channel[frame] = input_block.get(sample_index).copied().unwrap_or(0.0) as f64;
            }

            let input = self.inputs.get_mut(&input_id).expect("input_order must only list live inputs");
            let mut buf: Vec<StereoSample> = self.scratch_channel.iter().map(|&v| StereoSample::mono(v)).collect();
            input.process_block(&mut buf, &mut self.allocator, &mut midi);
            if input.is_primary() {
                self.clock.advance(Duration::new(n as i64));
            }
            for (mixed, sample) in self.scratch_output.iter_mut().zip(buf.iter()) {
                *mixed = *mixed + *sample;
            }
        }

        let source_interval = Interval::forwards(block_start, Duration::new(n as i64));
        self.scratch_track.clear();
        self.scratch_track.resize(n, StereoSample::default());
        for &track_id in &self.track_order {
            let track = self.tracks.get_mut(&track_id).expect("track_order must only list live tracks");
            let input_stream = self
                .inputs
                .get(&track.input_id())
                .unwrap_or_else(|| panic!("track {track_id:?} bound to unknown input {:?}", track.input_id()))
                .incoming_audio_stream();

            self.scratch_track.fill(StereoSample::default());
            track.process_block(&mut self.scratch_track, &mut self.allocator, &self.clock, input_stream, source_interval, &mut midi);
            for (mixed, sample) in self.scratch_output.iter_mut().zip(self.scratch_track.iter()) {
                *mixed = *mixed + *sample;
            }
        }

        for sample in self.scratch_output.iter_mut() {
            *sample = sample.clip(1.0);
            self.output_histogram.add((sample.left.abs() + sample.right.abs()) * 0.5);
        }
        self.output_measurement_min = self.output_histogram.min();
        self.output_measurement_max = self.output_histogram.max();

        for (frame, sample) in self.scratch_output.iter().enumerate() {
            output_block[frame * 2] = sample.left as f32;
            output_block[frame * 2 + 1] = sample.right as f32;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_graph() -> Graph {
        let mut graph = Graph::new(GraphConfig { block_size_frames: 16, sample_rate_hz: 48_000, ..GraphConfig::default() });
        graph.wire_inputs();
        graph.start();
        graph
    }

    #[test]
    fn uninitialized_graph_has_no_inputs_until_wired() {
        let graph = Graph::new(GraphConfig::default());
        assert_eq!(graph.state(), GraphState::Uninitialized);
    }

    #[test]
    fn process_block_advances_clock_by_one_block_per_call() {
        let mut graph = make_graph();
        let input = vec![0.1f32; 16];
        let mut output = vec![0.0f32; 32];
        graph.process_block(&input, &mut output);
        assert_eq!(graph.time_info().time_samples, 16);
        graph.process_block(&input, &mut output);
        assert_eq!(graph.time_info().time_samples, 32);
    }

    #[test]
    fn primary_input_signal_passes_through_to_output() {
        let mut graph = make_graph();
        let input = vec![0.5f32; 16];
        let mut output = vec![0.0f32; 32];
        graph.process_block(&input, &mut output);
        assert!(output.iter().any(|&s| s.abs() > 0.0));
    }

    #[test]
    fn create_and_delete_track_round_trips() {
        let mut graph = make_graph();
        let input_id = AudioInputId::new(1).unwrap();
        let track_id = graph.create_recording_track(input_id, 0.0);
        assert!(graph.tracks.contains_key(&track_id));
        graph.delete_track(track_id);
        assert!(!graph.tracks.contains_key(&track_id));
    }

    #[test]
    fn finish_recording_reaches_looping_and_is_reported_by_message_tick() {
        let mut graph = make_graph();
        let input_id = AudioInputId::new(1).unwrap();
        let track_id = graph.create_recording_track(input_id, 0.0);
        graph.finish_recording(track_id);

        let one_beat_samples = graph.clock.tempo().continuous_samples_per_beat(graph.clock.sample_rate_hz()).value().ceil() as usize;
        let input = vec![0.2f32; graph.config.block_size_frames];
        let mut output = vec![0.0f32; graph.config.block_size_frames * 2];
        let mut total = 0usize;
        while total < one_beat_samples + graph.config.block_size_frames {
            graph.process_block(&input, &mut output);
            total += graph.config.block_size_frames;
        }

        assert!(graph.tracks[&track_id].is_looping());
        assert_eq!(graph.message_tick(), vec![track_id]);
    }
}
