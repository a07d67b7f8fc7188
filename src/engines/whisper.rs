use std::path::{Path, PathBuf};

use log::debug;
use whisper_rs::{
    FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters, WhisperState,
};

use crate::{DecodeParams, TranscriptionEngine, TranscriptionSegment};

type EngineResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// whisper.cpp adapter. One context plus one decoding state per loaded model.
pub struct WhisperEngine {
    loaded_model_path: Option<PathBuf>,
    state: Option<WhisperState>,
    context: Option<WhisperContext>,
}

impl WhisperEngine {
    pub fn new() -> Self {
        Self {
            loaded_model_path: None,
            state: None,
            context: None,
        }
    }

    pub fn loaded_model_path(&self) -> Option<&Path> {
        self.loaded_model_path.as_deref()
    }
}

impl Default for WhisperEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TranscriptionEngine for WhisperEngine {
    fn load_model(&mut self, model_path: &Path) -> EngineResult<()> {
        let path = model_path
            .to_str()
            .ok_or_else(|| format!("model path {:?} is not valid UTF-8", model_path))?;

        let context = WhisperContext::new_with_params(path, WhisperContextParameters::default())?;
        let state = context.create_state()?;

        self.context = Some(context);
        self.state = Some(state);
        self.loaded_model_path = Some(model_path.to_path_buf());
        Ok(())
    }

    fn unload_model(&mut self) {
        // State first: it refers to the context's model.
        self.state = None;
        self.context = None;
        self.loaded_model_path = None;
    }

    fn is_loaded(&self) -> bool {
        self.state.is_some()
    }

    fn transcribe_samples(
        &mut self,
        samples: &[f32],
        params: &DecodeParams,
    ) -> EngineResult<Vec<TranscriptionSegment>> {
        let state = self
            .state
            .as_mut()
            .ok_or("Model not loaded. Call load_model() first.")?;

        let mut full_params = FullParams::new(SamplingStrategy::Greedy {
            best_of: params.best_of,
        });
        full_params.set_n_threads(params.n_threads);
        full_params.set_offset_ms(params.offset_ms);
        full_params.set_duration_ms(params.duration_ms);
        full_params.set_translate(params.translate);
        full_params.set_no_context(params.no_context);
        full_params.set_single_segment(params.single_segment);
        full_params.set_language(Some(params.language.as_str()));
        full_params.set_print_special(false);
        full_params.set_print_progress(false);
        full_params.set_print_realtime(false);
        full_params.set_print_timestamps(false);

        state.full(full_params, samples)?;

        let num_segments = state.full_n_segments()?;
        debug!("whisper produced {} segments", num_segments);

        let mut segments = Vec::with_capacity(num_segments.max(0) as usize);
        for i in 0..num_segments {
            let text = state.full_get_segment_text(i)?;
            // Timestamps come back in centiseconds.
            let start = state.full_get_segment_t0(i)? as f32 / 100.0;
            let end = state.full_get_segment_t1(i)? as f32 / 100.0;

            segments.push(TranscriptionSegment { start, end, text });
        }

        Ok(segments)
    }
}
