use std::path::PathBuf;

use thiserror::Error;

use crate::audio::AudioError;

/// Errors surfaced by the bridge.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("failed to load model {path}: {reason}")]
    ModelLoad { path: PathBuf, reason: String },

    #[error("engine session is not initialized")]
    NotInitialized,

    #[error("invalid time range [{start}, {end}]")]
    InvalidRange { start: f32, end: f32 },

    #[error("thread count must be at least 1, got {0}")]
    InvalidThreadCount(i64),

    #[error("invalid language hint {0:?}")]
    InvalidLanguage(String),

    #[error("engine failure: {0}")]
    Engine(String),

    #[error("audio decode failed: {0}")]
    Decode(#[from] AudioError),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
