//! Speech recognition engines behind the [`TranscriptionEngine`] capability.
//!
//! ## Whisper Engine
//!
//! whisper.cpp through `whisper-rs`:
//! - **Model Format**: Single GGML format file (`.bin`)
//! - **Models**: tiny, base, small, medium, large variants
//! - **Window**: honours the offset/duration carried in [`DecodeParams`]
//!
//! ```rust,no_run
//! # #[cfg(feature = "whisper")]
//! # {
//! use std::path::Path;
//! use whisper_bridge::{EngineSession, TimeRange, engines::whisper::WhisperEngine};
//! use whisper_bridge::audio::{AudioDecoder, SymphoniaDecoder};
//!
//! let session = EngineSession::new(WhisperEngine::new());
//! session.initialize(Path::new("models/ggml-base.bin"), 4)?;
//! let pcm = SymphoniaDecoder.decode(Path::new("audio.m4a"))?;
//! let segments = session.transcribe_range(&pcm.samples, TimeRange::new(1.0, 3.0)?, None)?;
//! # let _ = segments;
//! # }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! [`TranscriptionEngine`]: crate::TranscriptionEngine
//! [`DecodeParams`]: crate::DecodeParams

#[cfg(feature = "whisper")]
pub mod whisper;
