pub mod audio;
pub mod bridge;
pub mod config;
pub mod engines;
pub mod error;
pub mod handler;
pub mod models;
pub mod params;
pub mod protocol;
pub mod session;

use std::path::Path;

pub use bridge::Bridge;
pub use error::{BridgeError, Result};
pub use handler::{FileTranscript, RangeTranscriber};
pub use params::DecodeParams;
pub use session::{EngineSession, InitOutcome};

/// A wall-clock window into a recording, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeRange {
    pub start: f32,
    pub end: f32,
}

impl TimeRange {
    /// Build a range, rejecting negative, non-finite or inverted bounds.
    pub fn new(start: f32, end: f32) -> Result<Self> {
        if !start.is_finite() || !end.is_finite() || start < 0.0 || end < start {
            return Err(BridgeError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn duration(&self) -> f32 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// One range transcription call as issued by the host.
#[derive(Debug, Clone)]
pub struct TranscriptionRequest<'a> {
    pub audio_path: &'a Path,
    pub start: f32,
    pub end: f32,
    /// `None` lets the engine detect the spoken language.
    pub language: Option<&'a str>,
}

impl<'a> TranscriptionRequest<'a> {
    pub fn new(audio_path: &'a Path, start: f32, end: f32) -> Self {
        Self {
            audio_path,
            start,
            end,
            language: None,
        }
    }

    pub fn with_language(mut self, language: Option<&'a str>) -> Self {
        self.language = language;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptionResult {
    pub text: String,
    pub segments: Vec<TranscriptionSegment>,
}

/// Segment timestamps are seconds from the start of the decoded buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptionSegment {
    pub start: f32,
    pub end: f32,
    pub text: String,
}

/// Capability interface for the opaque speech engine.
///
/// The session owns exactly one implementor and serializes every call into
/// it, so implementations do not need their own locking.
pub trait TranscriptionEngine: Send {
    fn load_model(
        &mut self,
        model_path: &Path,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn unload_model(&mut self);
    fn is_loaded(&self) -> bool;

    /// Run inference over `samples` (16 kHz mono) restricted to the window in
    /// `params`, returning segments in emission order.
    fn transcribe_samples(
        &mut self,
        samples: &[f32],
        params: &DecodeParams,
    ) -> std::result::Result<Vec<TranscriptionSegment>, Box<dyn std::error::Error + Send + Sync>>;
}
