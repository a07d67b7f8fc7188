use std::path::PathBuf;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::audio::AudioDecoder;
use crate::config::BridgeConfig;
use crate::handler::FileTranscript;
use crate::models::{preset, PRESETS};
use crate::{Bridge, TranscriptionEngine};

/// Message format accepted by the bridge CLI, one JSON object per line.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    /// Load a model. Falls back to the configured model path and thread count.
    Initialize {
        model_path: Option<PathBuf>,
        threads: Option<i32>,
    },
    /// Transcribe one window of a recording.
    TranscribeRange {
        audio_path: String,
        start: f32,
        end: f32,
        language: Option<String>,
    },
    /// Transcribe a whole recording window by window, with progress updates.
    TranscribeFile {
        audio_path: String,
        language: Option<String>,
        chunk_seconds: Option<f32>,
    },
    /// Free the loaded model.
    Release,
    /// Report which model presets are present in a directory.
    ListModels { models_dir: PathBuf },
    /// Check a downloaded preset against its published SHA-256.
    VerifyModel { models_dir: PathBuf, id: String },
}

/// Download state of one preset, as reported to the host.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ModelStatus {
    pub id: String,
    pub display_name: String,
    pub size_mb: u32,
    pub url: String,
    pub downloaded: bool,
}

/// Outbound message format produced by the protocol session.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    Ready {
        engine: String,
    },
    Initialized {
        success: bool,
        threads: Option<usize>,
    },
    Transcript {
        text: String,
    },
    Progress {
        text: String,
    },
    FileTranscript(FileTranscript),
    Models {
        models: Vec<ModelStatus>,
    },
    ModelVerified {
        id: String,
        valid: bool,
    },
    Status {
        message: String,
    },
    Error {
        message: String,
    },
}

/// Maps inbound messages onto a [`Bridge`] and produces the replies.
pub struct ProtocolSession<'a, E: TranscriptionEngine, D: AudioDecoder> {
    bridge: &'a Bridge<E, D>,
    config: BridgeConfig,
}

impl<'a, E: TranscriptionEngine, D: AudioDecoder> ProtocolSession<'a, E, D> {
    pub fn new(bridge: &'a Bridge<E, D>, config: BridgeConfig) -> Self {
        Self { bridge, config }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Handle an inbound message and return the resulting outbound messages
    /// in the order they should be written.
    pub fn handle_inbound(&mut self, message: InboundMessage) -> Vec<OutboundMessage> {
        let mut messages = Vec::new();
        self.handle_inbound_with(message, |outbound| messages.push(outbound));
        messages
    }

    /// Handle an inbound message, passing each outbound message to `emit` as
    /// soon as it exists. Progress for a file transcription reaches `emit`
    /// while later windows are still being transcribed.
    pub fn handle_inbound_with(
        &mut self,
        message: InboundMessage,
        mut emit: impl FnMut(OutboundMessage),
    ) {
        match message {
            InboundMessage::Initialize {
                model_path,
                threads,
            } => {
                let Some(model_path) = model_path.or_else(|| self.config.model_path.clone()) else {
                    emit(OutboundMessage::Error {
                        message: "no model path given or configured".to_string(),
                    });
                    return;
                };
                let threads = threads
                    .unwrap_or_else(|| i32::try_from(self.config.threads).unwrap_or(i32::MAX));
                let success = self
                    .bridge
                    .initialize(&model_path.to_string_lossy(), threads);
                emit(OutboundMessage::Initialized {
                    success,
                    threads: self.bridge.session().thread_count(),
                });
            }
            InboundMessage::TranscribeRange {
                audio_path,
                start,
                end,
                language,
            } => {
                let language = language.or_else(|| self.config.language.clone());
                emit(
                    match self.bridge.try_transcribe_range(
                        &audio_path,
                        start,
                        end,
                        language.as_deref(),
                    ) {
                        Ok(text) => OutboundMessage::Transcript { text },
                        Err(err) => OutboundMessage::Error {
                            message: format!("transcription failed: {err}"),
                        },
                    },
                );
            }
            InboundMessage::TranscribeFile {
                audio_path,
                language,
                chunk_seconds,
            } => {
                let language = language.or_else(|| self.config.language.clone());
                let chunk_seconds = chunk_seconds.unwrap_or(self.config.chunk_seconds);
                let result = self.bridge.transcribe_file(
                    &audio_path,
                    language.as_deref(),
                    chunk_seconds,
                    |text| {
                        emit(OutboundMessage::Progress {
                            text: text.to_string(),
                        })
                    },
                );
                emit(match result {
                    Ok(transcript) => OutboundMessage::FileTranscript(transcript),
                    Err(err) => OutboundMessage::Error {
                        message: format!("transcription failed: {err}"),
                    },
                });
            }
            InboundMessage::Release => {
                self.bridge.release();
                emit(OutboundMessage::Status {
                    message: "released".to_string(),
                });
            }
            InboundMessage::ListModels { models_dir } => {
                let models = PRESETS
                    .iter()
                    .map(|preset| ModelStatus {
                        id: preset.id.to_string(),
                        display_name: preset.display_name.to_string(),
                        size_mb: preset.size_mb,
                        url: preset.url.to_string(),
                        downloaded: preset.is_downloaded(&models_dir),
                    })
                    .collect();
                emit(OutboundMessage::Models { models });
            }
            InboundMessage::VerifyModel { models_dir, id } => {
                let Some(preset) = preset(&id) else {
                    emit(OutboundMessage::Error {
                        message: format!("unknown model preset: {id}"),
                    });
                    return;
                };
                let path = preset.file_in(&models_dir);
                emit(match preset.verify(&path) {
                    Ok(valid) => {
                        if !valid {
                            warn!("Checksum mismatch for {:?}", path);
                        }
                        OutboundMessage::ModelVerified { id, valid }
                    }
                    Err(err) => OutboundMessage::Error {
                        message: format!("cannot read {}: {err}", path.display()),
                    },
                });
            }
        }
    }
}
