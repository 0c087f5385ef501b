//! Audio backend error types.
//!
//! Maps to the engine's category-2 (backend init failure, terminal
//! `InError`) and category-3 (transient runtime error, `Result`)
//! taxonomy at the call site; this enum itself just names what `cpal`
//! can fail with.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("no audio device found")]
    NoDevice,

    #[error("device not found: {0}")]
    DeviceNotFound(String),

    #[error("failed to get device config: {0}")]
    ConfigError(String),

    #[error("failed to build stream: {0}")]
    StreamBuildError(String),

    #[error("stream error: {0}")]
    StreamError(String),

    #[error("unsupported sample rate: {0}")]
    UnsupportedSampleRate(u32),

    #[error("backend error: {0}")]
    BackendError(String),
}

pub type AudioResult<T> = Result<T, AudioError>;
