//! nowsound-engine: real-time live-looping audio graph.
//!
//! Wires the input and track processors from `nowsound-core`/`nowsound-dsp`
//! into the `Graph` orchestrator that drives one audio callback per block,
//! plus the control-surface types (`ProbeId`, numeric handles, per-probe
//! signal/frequency/recording operations) a caller builds a looper on top
//! of.

mod constants;
mod drywet;
mod error;
mod graph;
mod ids;
mod input;
mod measurement;
mod plugin;
mod spatial;
mod track;
mod wav_writer;

pub use constants::{
    next_quantized_beat_duration, OUTPUT_CLIP_LIMIT, WAV_SINK_BITS_PER_SAMPLE,
    WAV_SINK_FIFO_FRAMES, WAV_SINK_FLUSH_INTERVAL_SECONDS,
};
pub use drywet::DryWetMix;
pub use error::{EngineError, EngineResult};
pub use graph::{
    FftParams, Graph, GraphConfig, GraphInfo, GraphState, NowSoundTrackInfo, ProbeId, SignalInfo,
    TimeInfo,
};
pub use ids::{AudioInputId, PluginId, PluginInstanceIndex, ProgramId, TrackId};
pub use input::InputProcessor;
pub use measurement::MeasurementProcessor;
pub use plugin::{EffectChain, PassthroughPlugin, PassthroughRegistry, PluginInstance, PluginRegistry};
pub use spatial::{MidiBuffer, SpatialProcessor};
pub use track::{TrackProcessor, TrackState};
pub use wav_writer::WavSink;
