#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use tempfile::NamedTempFile;
use whisper_bridge::audio::{AudioDecoder, AudioError, PcmAudio};
use whisper_bridge::{DecodeParams, TranscriptionEngine, TranscriptionSegment};

type EngineResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Everything the fake engine saw, shared with the test body.
#[derive(Debug, Default)]
pub struct EngineLog {
    pub loads: usize,
    pub unloads: usize,
    pub calls: Vec<(usize, DecodeParams)>,
    pub active: usize,
    pub max_active: usize,
    /// Set if the model was unloaded while a transcription was running.
    pub unloaded_mid_call: bool,
}

/// Engine that replays scripted segment lists in call order. Once the script
/// runs out every call returns no segments.
pub struct ScriptedEngine {
    script: VecDeque<Result<Vec<TranscriptionSegment>, String>>,
    log: Arc<Mutex<EngineLog>>,
    fail_load: bool,
    delay: Duration,
    loaded: bool,
}

impl ScriptedEngine {
    pub fn new() -> (Self, Arc<Mutex<EngineLog>>) {
        let log = Arc::new(Mutex::new(EngineLog::default()));
        (
            Self {
                script: VecDeque::new(),
                log: Arc::clone(&log),
                fail_load: false,
                delay: Duration::ZERO,
                loaded: false,
            },
            log,
        )
    }

    pub fn with_script(
        script: Vec<Result<Vec<TranscriptionSegment>, String>>,
    ) -> (Self, Arc<Mutex<EngineLog>>) {
        let (mut engine, log) = Self::new();
        engine.script = script.into();
        (engine, log)
    }

    pub fn failing_load() -> (Self, Arc<Mutex<EngineLog>>) {
        let (mut engine, log) = Self::new();
        engine.fail_load = true;
        (engine, log)
    }

    pub fn slow(delay: Duration) -> (Self, Arc<Mutex<EngineLog>>) {
        let (mut engine, log) = Self::new();
        engine.delay = delay;
        (engine, log)
    }

    pub fn slow_with_script(
        delay: Duration,
        script: Vec<Result<Vec<TranscriptionSegment>, String>>,
    ) -> (Self, Arc<Mutex<EngineLog>>) {
        let (mut engine, log) = Self::with_script(script);
        engine.delay = delay;
        (engine, log)
    }
}

impl TranscriptionEngine for ScriptedEngine {
    fn load_model(&mut self, _model_path: &Path) -> EngineResult<()> {
        self.log.lock().loads += 1;
        if self.fail_load {
            return Err("corrupt model".into());
        }
        self.loaded = true;
        Ok(())
    }

    fn unload_model(&mut self) {
        let mut log = self.log.lock();
        log.unloads += 1;
        if log.active > 0 {
            log.unloaded_mid_call = true;
        }
        self.loaded = false;
    }

    fn is_loaded(&self) -> bool {
        self.loaded
    }

    fn transcribe_samples(
        &mut self,
        samples: &[f32],
        params: &DecodeParams,
    ) -> EngineResult<Vec<TranscriptionSegment>> {
        {
            let mut log = self.log.lock();
            log.calls.push((samples.len(), params.clone()));
            log.active += 1;
            log.max_active = log.max_active.max(log.active);
        }
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        self.log.lock().active -= 1;

        match self.script.pop_front() {
            Some(Ok(segments)) => Ok(segments),
            Some(Err(message)) => Err(message.into()),
            None => Ok(Vec::new()),
        }
    }
}

/// Decoder that hands out the same buffer for every path, or fails.
pub struct StaticDecoder {
    pcm: Option<PcmAudio>,
    decodes: Arc<Mutex<usize>>,
}

impl StaticDecoder {
    pub fn seconds(seconds: f32) -> (Self, Arc<Mutex<usize>>) {
        let samples = vec![0.0; (seconds * 16_000.0).round() as usize];
        Self::with_pcm(PcmAudio::mono_16k(samples))
    }

    pub fn with_pcm(pcm: PcmAudio) -> (Self, Arc<Mutex<usize>>) {
        let decodes = Arc::new(Mutex::new(0));
        (
            Self {
                pcm: Some(pcm),
                decodes: Arc::clone(&decodes),
            },
            decodes,
        )
    }

    pub fn failing() -> (Self, Arc<Mutex<usize>>) {
        let decodes = Arc::new(Mutex::new(0));
        (
            Self {
                pcm: None,
                decodes: Arc::clone(&decodes),
            },
            decodes,
        )
    }
}

impl AudioDecoder for StaticDecoder {
    fn decode(&self, _path: &Path) -> Result<PcmAudio, AudioError> {
        *self.decodes.lock() += 1;
        self.pcm.clone().ok_or(AudioError::NoAudioTrack)
    }
}

pub fn segments(texts: &[&str]) -> Vec<TranscriptionSegment> {
    texts
        .iter()
        .enumerate()
        .map(|(i, text)| TranscriptionSegment {
            start: i as f32,
            end: i as f32 + 1.0,
            text: text.to_string(),
        })
        .collect()
}

/// A file that exists, for sessions backed by the scripted engine.
pub fn model_file() -> NamedTempFile {
    tempfile::Builder::new()
        .prefix("ggml-test")
        .suffix(".bin")
        .tempfile()
        .expect("temp model file")
}
