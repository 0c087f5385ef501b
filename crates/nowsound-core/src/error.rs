//! Error types.
//!
//! Only category-3 failures from the error taxonomy (runtime transients:
//! WAV writer flush failures, plugin load failures) are represented as
//! `Result`. Contract violations, backend init failures, and control-thread
//! resource exhaustion are asserts/panics by design and never reach here.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NowSoundError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV encode error: {0}")]
    Wav(String),

    #[error("plugin load failed: {0}")]
    PluginLoad(String),

    #[error("backend initialization failed: {0}")]
    BackendInit(String),
}

pub type NowSoundResult<T> = Result<T, NowSoundError>;
