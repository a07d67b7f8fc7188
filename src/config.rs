use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::handler::{check_chunk_seconds, DEFAULT_CHUNK_SECONDS};
use crate::params::normalize_language;
use crate::BridgeError;

/// Settings for a bridge process, read from JSON and overridable from the
/// command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub model_path: Option<PathBuf>,
    pub threads: usize,
    pub language: Option<String>,
    pub chunk_seconds: f32,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            threads: default_threads(),
            language: None,
            chunk_seconds: DEFAULT_CHUNK_SECONDS,
        }
    }
}

impl BridgeConfig {
    pub fn from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.threads == 0 {
            return Err(BridgeError::InvalidThreadCount(0));
        }
        check_chunk_seconds(self.chunk_seconds)?;
        normalize_language(self.language.as_deref())?;
        Ok(())
    }
}

/// One thread per available core, never fewer than one.
pub fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
