//! The host-facing call surface: initialize, release, transcribe a range.
//!
//! These calls never panic and never return a Rust error type. Failures are
//! logged and collapse to `false` or an empty string; hosts that need to
//! tell "no speech" from "failed" use [`Bridge::try_transcribe_range`].

use std::path::Path;
use std::sync::Arc;

use log::{error, warn};

use crate::audio::{AudioDecoder, SymphoniaDecoder};
use crate::handler::{FileTranscript, RangeTranscriber};
use crate::{BridgeError, EngineSession, Result, TranscriptionEngine, TranscriptionRequest};

pub struct Bridge<E: TranscriptionEngine, D: AudioDecoder = SymphoniaDecoder> {
    transcriber: RangeTranscriber<E, D>,
}

impl<E: TranscriptionEngine> Bridge<E, SymphoniaDecoder> {
    pub fn new(engine: E) -> Self {
        Self::with_decoder(engine, SymphoniaDecoder)
    }
}

impl<E: TranscriptionEngine, D: AudioDecoder> Bridge<E, D> {
    pub fn with_decoder(engine: E, decoder: D) -> Self {
        let session = Arc::new(EngineSession::new(engine));
        Self {
            transcriber: RangeTranscriber::with_decoder(session, decoder),
        }
    }

    pub fn session(&self) -> &Arc<EngineSession<E>> {
        self.transcriber.session()
    }

    pub fn transcriber(&self) -> &RangeTranscriber<E, D> {
        &self.transcriber
    }

    /// Load the model. `true` if a model is loaded when this returns,
    /// including when one already was.
    pub fn initialize(&self, model_path: &str, thread_count: i32) -> bool {
        let threads = match usize::try_from(thread_count) {
            Ok(threads) if threads > 0 => threads,
            _ => {
                error!("{}", BridgeError::InvalidThreadCount(i64::from(thread_count)));
                return false;
            }
        };
        match self.session().initialize(Path::new(model_path), threads) {
            Ok(_) => true,
            Err(err) => {
                error!("initialize failed: {}", err);
                false
            }
        }
    }

    pub fn release(&self) {
        self.session().release();
    }

    /// Recognized text for `[start, end]` of `audio_path`, one line per
    /// segment. Empty on silence and on any failure.
    pub fn transcribe_range(
        &self,
        audio_path: &str,
        start: f32,
        end: f32,
        language: Option<&str>,
    ) -> String {
        match self.try_transcribe_range(audio_path, start, end, language) {
            Ok(text) => text,
            Err(BridgeError::NotInitialized) => {
                warn!("transcribe_range called before initialize");
                String::new()
            }
            Err(err) => {
                error!("transcribe_range failed for {:?}: {}", audio_path, err);
                String::new()
            }
        }
    }

    pub fn try_transcribe_range(
        &self,
        audio_path: &str,
        start: f32,
        end: f32,
        language: Option<&str>,
    ) -> Result<String> {
        let request =
            TranscriptionRequest::new(Path::new(audio_path), start, end).with_language(language);
        self.transcriber.handle(&request).map(|result| result.text)
    }

    pub fn transcribe_file(
        &self,
        audio_path: &str,
        language: Option<&str>,
        chunk_seconds: f32,
        on_progress: impl FnMut(&str),
    ) -> Result<FileTranscript> {
        self.transcriber
            .transcribe_file(Path::new(audio_path), language, chunk_seconds, on_progress)
    }
}

#[cfg(feature = "whisper")]
mod global {
    use once_cell::sync::Lazy;

    use super::Bridge;
    use crate::engines::whisper::WhisperEngine;

    static BRIDGE: Lazy<Bridge<WhisperEngine>> = Lazy::new(|| Bridge::new(WhisperEngine::new()));

    /// The process-wide bridge. Its model lives until [`release`] is called.
    pub fn global() -> &'static Bridge<WhisperEngine> {
        &BRIDGE
    }

    pub fn initialize(model_path: &str, thread_count: i32) -> bool {
        BRIDGE.initialize(model_path, thread_count)
    }

    pub fn release() {
        BRIDGE.release()
    }

    pub fn transcribe_range(
        audio_path: &str,
        start: f32,
        end: f32,
        language: Option<&str>,
    ) -> String {
        BRIDGE.transcribe_range(audio_path, start, end, language)
    }
}

#[cfg(feature = "whisper")]
pub use global::{global, initialize, release, transcribe_range};
