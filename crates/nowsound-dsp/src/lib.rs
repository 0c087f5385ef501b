//! nowsound-dsp: constant-power panning and the FFT-based frequency
//! tracker used by the Measurement processor.
//!
//! - `spatial` - constant-power stereo panner
//! - `bin_bounds` - logarithmic FFT bin layout and rescaling
//! - `frequency_tracker` - windowed FFT accumulation + rebinning pipeline

pub mod bin_bounds;
pub mod frequency_tracker;
pub mod spatial;

pub use bin_bounds::{make_bin_bounds, rescale_fft, BinBound};
pub use frequency_tracker::{FrequencyTracker, FrequencyTrackerConfig};
pub use spatial::ConstantPowerPanner;
