//! Request handling: decode, transcribe a window, aggregate segment text.

use std::borrow::Cow;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use log::{debug, info};
use serde::Serialize;

use crate::audio::{self, AudioDecoder, PcmAudio, SymphoniaDecoder, TARGET_SAMPLE_RATE};
use crate::models::model_id;
use crate::params::normalize_language;
use crate::{
    BridgeError, EngineSession, Result, TimeRange, TranscriptionEngine, TranscriptionRequest,
    TranscriptionResult, TranscriptionSegment,
};

/// Window length used when walking a whole recording.
pub const DEFAULT_CHUNK_SECONDS: f32 = 30.0;

/// Shortest accepted window length (one millisecond, the engine's resolution).
pub const MIN_CHUNK_SECONDS: f32 = 0.001;

/// Outcome of transcribing an entire recording window by window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileTranscript {
    pub text: String,
    pub model_id: String,
    pub language: Option<String>,
    pub duration_seconds: f32,
    pub processing_ms: u64,
}

/// Serves range requests against a shared [`EngineSession`].
pub struct RangeTranscriber<E: TranscriptionEngine, D: AudioDecoder = SymphoniaDecoder> {
    session: Arc<EngineSession<E>>,
    decoder: D,
}

impl<E: TranscriptionEngine> RangeTranscriber<E, SymphoniaDecoder> {
    pub fn new(session: Arc<EngineSession<E>>) -> Self {
        Self::with_decoder(session, SymphoniaDecoder)
    }
}

impl<E: TranscriptionEngine, D: AudioDecoder> RangeTranscriber<E, D> {
    pub fn with_decoder(session: Arc<EngineSession<E>>, decoder: D) -> Self {
        Self { session, decoder }
    }

    pub fn session(&self) -> &Arc<EngineSession<E>> {
        &self.session
    }

    /// Transcribe `request.start..request.end` of the referenced recording.
    ///
    /// Bad ranges, bad language hints and an unloaded session are rejected
    /// before any audio is decoded. No speech in the window is an empty,
    /// successful result.
    pub fn handle(&self, request: &TranscriptionRequest<'_>) -> Result<TranscriptionResult> {
        let range = TimeRange::new(request.start, request.end)?;
        normalize_language(request.language)?;
        if !self.session.is_initialized() {
            return Err(BridgeError::NotInitialized);
        }

        let pcm = self.decoder.decode(request.audio_path)?;
        self.transcribe_pcm(&pcm, range, request.language)
    }

    /// Transcribe a window of audio that has already been decoded.
    ///
    /// The window is clipped to the end of the buffer; a window starting past
    /// the end is empty.
    pub fn transcribe_pcm(
        &self,
        pcm: &PcmAudio,
        range: TimeRange,
        language: Option<&str>,
    ) -> Result<TranscriptionResult> {
        let range = TimeRange::new(range.start, range.end)?;
        let samples = engine_samples(pcm)?;
        self.transcribe_window(&samples, range, language)
    }

    /// Transcribe a whole recording in consecutive windows of
    /// `chunk_seconds`, reporting the accumulated text after every window
    /// that produced speech.
    pub fn transcribe_file(
        &self,
        audio_path: &Path,
        language: Option<&str>,
        chunk_seconds: f32,
        mut on_progress: impl FnMut(&str),
    ) -> Result<FileTranscript> {
        check_chunk_seconds(chunk_seconds)?;
        normalize_language(language)?;
        if !self.session.is_initialized() {
            return Err(BridgeError::NotInitialized);
        }

        let started = Instant::now();
        let pcm = self.decoder.decode(audio_path)?;
        let samples = engine_samples(&pcm)?;
        let duration = samples.len() as f64 / f64::from(TARGET_SAMPLE_RATE);
        let chunk = f64::from(chunk_seconds);

        // Window bounds come from the window index so that they always advance.
        let windows = (duration / chunk).ceil() as u64;
        let mut text = String::new();
        for index in 0..windows {
            let start = index as f64 * chunk;
            if start >= duration {
                break;
            }
            let end = ((index + 1) as f64 * chunk).min(duration);
            let range = TimeRange {
                start: start as f32,
                end: end as f32,
            };

            let part = self.transcribe_window(&samples, range, language)?;
            let part = part.text.trim();
            if !part.is_empty() {
                text.push_str(part);
                text.push('\n');
                on_progress(&text);
            }
        }

        let processing_ms = started.elapsed().as_millis() as u64;
        info!(
            "Transcribed {:?} ({:.2}s of audio, {} windows) in {} ms",
            audio_path, duration, windows, processing_ms
        );

        Ok(FileTranscript {
            text: text.trim().to_string(),
            model_id: self
                .session
                .model_path()
                .map(|path| model_id(&path))
                .unwrap_or_default(),
            language: language.map(str::to_string),
            duration_seconds: duration as f32,
            processing_ms,
        })
    }

    fn transcribe_window(
        &self,
        samples: &[f32],
        range: TimeRange,
        language: Option<&str>,
    ) -> Result<TranscriptionResult> {
        let available = samples.len() as f32 / TARGET_SAMPLE_RATE as f32;
        let window = clip_range(range, available);
        if window != range {
            debug!(
                "Clipped range [{}, {}] to [{}, {}] ({:.2}s of audio)",
                range.start, range.end, window.start, window.end, available
            );
        }

        let segments = self.session.transcribe_range(samples, window, language)?;
        Ok(TranscriptionResult {
            text: join_segments(&segments),
            segments,
        })
    }
}

/// Reject window lengths that are not finite or shorter than
/// [`MIN_CHUNK_SECONDS`].
pub fn check_chunk_seconds(chunk_seconds: f32) -> Result<()> {
    if !chunk_seconds.is_finite() || chunk_seconds < MIN_CHUNK_SECONDS {
        return Err(BridgeError::InvalidRange {
            start: 0.0,
            end: chunk_seconds,
        });
    }
    Ok(())
}

/// Concatenate segment texts in emission order, each followed by `\n`.
/// Whitespace inside segments is left untouched.
pub fn join_segments(segments: &[TranscriptionSegment]) -> String {
    segments.iter().fold(String::new(), |mut out, segment| {
        out.push_str(&segment.text);
        out.push('\n');
        out
    })
}

fn clip_range(range: TimeRange, available: f32) -> TimeRange {
    let end = range.end.min(available);
    let start = range.start.min(end);
    TimeRange { start, end }
}

fn engine_samples(pcm: &PcmAudio) -> Result<Cow<'_, [f32]>> {
    if pcm.sample_rate == TARGET_SAMPLE_RATE && pcm.channels == 1 {
        return Ok(Cow::Borrowed(&pcm.samples));
    }
    let mono = audio::downmix(&pcm.samples, usize::from(pcm.channels));
    let resampled = audio::resample(&mono, pcm.sample_rate, TARGET_SAMPLE_RATE)?;
    Ok(Cow::Owned(resampled))
}
