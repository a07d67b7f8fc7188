//! Catalog of the ggml whisper models a host can offer for download.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelPreset {
    pub id: &'static str,
    pub display_name: &'static str,
    pub size_mb: u32,
    pub url: &'static str,
    /// Lowercase hex SHA-256 of the published file.
    pub sha256: &'static str,
}

pub const PRESETS: &[ModelPreset] = &[
    ModelPreset {
        id: "tiny",
        display_name: "tiny (256MB)",
        size_mb: 256,
        url: "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/ggml-tiny.bin",
        sha256: "3b85a86d93e8d4bc8b3bfc34a9f6f3f0c7c7aef9d4d86a5f5b76d3b0a1d0f5c7",
    },
    ModelPreset {
        id: "base",
        display_name: "base (512MB)",
        size_mb: 512,
        url: "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/ggml-base.bin",
        sha256: "66b45a28b68e4d3d3d9b66df7c2a5c1f1b5d37b3c2b2a4ad44525fbb5c1c2a89",
    },
    ModelPreset {
        id: "small",
        display_name: "small (1.3GB)",
        size_mb: 1300,
        url: "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/ggml-small.bin",
        sha256: "6f25e3fb376d4caa9d38c8925c403e0b3a8c4027b151cfdb0a8d2f23d0b4aaee",
    },
    ModelPreset {
        id: "medium",
        display_name: "medium (2.6GB)",
        size_mb: 2600,
        url: "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/ggml-medium.bin",
        sha256: "b9fca6cd3a9c90c1d4a8f1b9a6c3e1d04e73067f0a8d2d5a116fcde78f2e6d5c",
    },
    ModelPreset {
        id: "large-v3",
        display_name: "large-v3 (3.8GB)",
        size_mb: 3800,
        url: "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/ggml-large-v3.bin",
        sha256: "0b5660d5b3c9d3f2a2d0f48a89ed7cb4d7b0d60a329fbbf2a7b0a111a8c2e3b2",
    },
];

pub fn preset(id: &str) -> Option<&'static ModelPreset> {
    PRESETS.iter().find(|p| p.id == id)
}

impl ModelPreset {
    /// Where this preset lives inside `models_dir`.
    pub fn file_in(&self, models_dir: &Path) -> PathBuf {
        models_dir.join(format!("{}.bin", self.id))
    }

    pub fn is_downloaded(&self, models_dir: &Path) -> bool {
        self.file_in(models_dir).is_file()
    }

    /// Whether the file at `path` hashes to this preset's published digest.
    pub fn verify(&self, path: &Path) -> io::Result<bool> {
        let digest = sha256_file(path)?;
        Ok(digest.eq_ignore_ascii_case(self.sha256))
    }
}

/// Lowercase hex SHA-256 of a file, read in 64 KiB blocks.
pub fn sha256_file(path: &Path) -> io::Result<String> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let read = reader.read(&mut buf)?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(hasher
        .finalize()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect())
}

/// Short identifier for a model file: its name without extension.
pub fn model_id(model_path: &Path) -> String {
    model_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}
