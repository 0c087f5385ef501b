//! Named tuning constants, following the original engine's `MagicConstants`
//! table rather than inlining these literals at each use site.

/// Tempo assumed before any track exists; never changes once a track is
/// recording (tempo changes after that point are an explicit non-goal).
pub const INITIAL_BEATS_PER_MINUTE: f64 = 60.0;

/// Time signature numerator; never changes within a session.
pub const BEATS_PER_MEASURE: u32 = 4;

/// Number of stereo sample buffers the allocator pre-warms on startup.
pub const INITIAL_AUDIO_BUFFER_COUNT: usize = 32;

/// Duration, in seconds, of a single allocator buffer.
pub const AUDIO_BUFFER_SIZE_SECONDS: f64 = 1.0;

/// Rolling input window retained for latency-compensated pre-record.
pub const PRE_RECORDING_DURATION_SECONDS: f64 = 2.5;

/// Window over which the recent-volume histogram reports its average.
pub const RECENT_VOLUME_DURATION_SECONDS: f64 = 2.0;

/// Capacity of the debug ring log (entries), not built by this crate but
/// reserved here since it is part of the original constant table.
pub const DEBUG_LOG_CAPACITY: usize = 1000;

/// Capacity, in quanta, of the per-block timing histogram used to watch
/// for audio-thread overruns.
pub const AUDIO_QUANTUM_HISTOGRAM_CAPACITY: usize = 100;

/// Clock drift tolerance used when comparing continuous durations for
/// equality (e.g. `ceil(continuous_duration) == discrete_duration`).
pub const CLOCK_EPSILON: f64 = 0.0001;
