//! Lifecycle of the single loaded model.
//!
//! An [`EngineSession`] owns one engine and at most one loaded model. All
//! operations take the same lock, so a transcription in flight finishes
//! before a concurrent `release` can free the model, and two transcriptions
//! never enter the engine at once. Audio decoding happens outside the lock.

use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};
use parking_lot::Mutex;

use crate::{
    BridgeError, DecodeParams, Result, TimeRange, TranscriptionEngine, TranscriptionSegment,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    /// The model was loaded by this call.
    Loaded,
    /// A model was already loaded; nothing was changed.
    AlreadyLoaded,
}

struct SessionState<E> {
    engine: E,
    loaded: Option<LoadedModel>,
}

struct LoadedModel {
    path: PathBuf,
    thread_count: usize,
}

pub struct EngineSession<E: TranscriptionEngine> {
    state: Mutex<SessionState<E>>,
}

impl<E: TranscriptionEngine> EngineSession<E> {
    pub fn new(engine: E) -> Self {
        Self {
            state: Mutex::new(SessionState {
                engine,
                loaded: None,
            }),
        }
    }

    /// Load the model at `model_path`.
    ///
    /// Once a model is loaded this returns [`InitOutcome::AlreadyLoaded`]
    /// without reloading and keeps the original thread count, even if the
    /// caller asks for a different one. Use [`EngineSession::reinitialize`]
    /// to change either.
    pub fn initialize(&self, model_path: &Path, thread_count: usize) -> Result<InitOutcome> {
        let mut state = self.state.lock();
        if let Some(loaded) = &state.loaded {
            if loaded.thread_count != thread_count || loaded.path != model_path {
                warn!(
                    "Model {:?} already loaded with {} threads; ignoring request for {:?} with {} threads",
                    loaded.path, loaded.thread_count, model_path, thread_count
                );
            }
            return Ok(InitOutcome::AlreadyLoaded);
        }
        Self::load_locked(&mut state, model_path, thread_count)?;
        Ok(InitOutcome::Loaded)
    }

    /// Release any loaded model and load `model_path` with `thread_count`.
    pub fn reinitialize(&self, model_path: &Path, thread_count: usize) -> Result<()> {
        let mut state = self.state.lock();
        Self::release_locked(&mut state);
        Self::load_locked(&mut state, model_path, thread_count)
    }

    /// Free the loaded model. Safe to call at any time, any number of times.
    pub fn release(&self) {
        let mut state = self.state.lock();
        Self::release_locked(&mut state);
    }

    pub fn is_initialized(&self) -> bool {
        let state = self.state.lock();
        state.loaded.is_some() && state.engine.is_loaded()
    }

    pub fn thread_count(&self) -> Option<usize> {
        self.state.lock().loaded.as_ref().map(|m| m.thread_count)
    }

    pub fn model_path(&self) -> Option<PathBuf> {
        self.state.lock().loaded.as_ref().map(|m| m.path.clone())
    }

    /// Transcribe the `range` window of `samples`.
    ///
    /// An empty range yields no segments without touching the engine: a
    /// zero duration would otherwise tell whisper to run to the end of the
    /// buffer.
    ///
    /// `range` is checked again here since its fields are public and may not
    /// have come through [`TimeRange::new`].
    pub fn transcribe_range(
        &self,
        samples: &[f32],
        range: TimeRange,
        language: Option<&str>,
    ) -> Result<Vec<TranscriptionSegment>> {
        let range = TimeRange::new(range.start, range.end)?;
        let mut state = self.state.lock();
        let thread_count = state
            .loaded
            .as_ref()
            .map(|m| m.thread_count)
            .ok_or(BridgeError::NotInitialized)?;

        let params = DecodeParams::for_range(range, thread_count, language)?;
        if params.duration_ms == 0 {
            debug!("Skipping empty range at {} ms", params.offset_ms);
            return Ok(Vec::new());
        }

        debug!(
            "Transcribing {} ms at offset {} ms (language: {}, threads: {})",
            params.duration_ms, params.offset_ms, params.language, params.n_threads
        );

        state
            .engine
            .transcribe_samples(samples, &params)
            .map_err(|err| {
                error!("Engine failed on range {:?}: {}", range, err);
                BridgeError::Engine(err.to_string())
            })
    }

    fn load_locked(
        state: &mut SessionState<E>,
        model_path: &Path,
        thread_count: usize,
    ) -> Result<()> {
        if thread_count == 0 {
            return Err(BridgeError::InvalidThreadCount(0));
        }
        if !model_path.is_file() {
            return Err(BridgeError::ModelLoad {
                path: model_path.to_path_buf(),
                reason: "model file not found".to_string(),
            });
        }

        if let Err(err) = state.engine.load_model(model_path) {
            // Leave nothing half-loaded behind.
            state.engine.unload_model();
            error!("Failed to load model {:?}: {}", model_path, err);
            return Err(BridgeError::ModelLoad {
                path: model_path.to_path_buf(),
                reason: err.to_string(),
            });
        }

        info!("Model {:?} loaded with {} threads", model_path, thread_count);
        state.loaded = Some(LoadedModel {
            path: model_path.to_path_buf(),
            thread_count,
        });
        Ok(())
    }

    fn release_locked(state: &mut SessionState<E>) {
        if let Some(loaded) = state.loaded.take() {
            state.engine.unload_model();
            info!("Model {:?} released", loaded.path);
        }
    }
}
