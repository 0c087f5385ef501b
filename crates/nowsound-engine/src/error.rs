//! Engine-level error type. Only category-3 failures (§7: runtime
//! transients) are modeled as `Result`; contract violations and
//! backend-init failures are asserts/panics/`GraphState::InError` and never
//! reach here.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("plugin load failed: {0}")]
    PluginLoad(String),

    #[error("recording writer error: {0}")]
    WriterError(String),

    #[error(transparent)]
    Core(#[from] nowsound_core::NowSoundError),

    #[error("audio backend error: {0}")]
    Audio(#[from] nowsound_audio::AudioError),
}

pub type EngineResult<T> = Result<T, EngineError>;
