//! nowsound-core: shared types for the NowSound live-looping engine.
//!
//! Phantom-tagged time (`time`), the buffer allocator and its slice views
//! (`buf`, `slice`), the interval mappers that drive looped playback
//! (`interval_mapper`), the append-then-loop stream built from them
//! (`buffered_stream`), the musical clock (`clock`), the running-average
//! histogram used for volume envelopes (`histogram`), and the engine's
//! named tuning constants (`constants`).

mod buf;
mod buffered_stream;
mod clock;
mod constants;
mod error;
mod histogram;
mod interval_mapper;
mod sample;
mod slice;
mod time;

pub use buf::{Buf, BufferAllocator, OwningBuf};
pub use buffered_stream::{BufferedSliceStream, LoopingKind};
pub use clock::{Clock, Tempo};
pub use constants::*;
pub use error::{NowSoundError, NowSoundResult};
pub use histogram::Histogram;
pub use interval_mapper::IntervalMapper;
pub use sample::{Sample, StereoSample};
pub use slice::{Slice, TimedSlice};
pub use time::{AudioSample, Beat, ContinuousDuration, ContinuousTime, Direction, Duration, Frame, Interval, Second, Time};
