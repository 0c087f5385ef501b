//! nowsound-audio: the thin `cpal` boundary between the processor graph
//! and whatever audio backend the host OS provides.
//!
//! Device enumeration and stream construction are deliberately kept
//! outside the core's compile-time dependencies (see nowsound-engine,
//! which depends on this crate only through [`AudioCallback`] and
//! [`AudioStream`]). Nothing here understands tracks, clocks, or
//! intervals; it moves interleaved `f32` blocks in and out.

mod device;
mod error;
mod stream;

pub use device::*;
pub use error::*;
pub use stream::*;

/// Negotiated stream configuration. The engine requests stereo in and
/// out; the achieved sample rate and buffer size (not necessarily the
/// requested ones) are what the graph's init sequence records.
#[derive(Debug, Clone)]
pub struct AudioConfig {
    pub sample_rate_hz: u32,
    pub buffer_size_frames: usize,
    pub input_channels: u16,
    pub output_channels: u16,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 48_000,
            buffer_size_frames: 256,
            input_channels: 2,
            output_channels: 2,
        }
    }
}
