use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;
use log::info;
use whisper_bridge::{
    audio::AudioDecoder,
    bridge,
    config::BridgeConfig,
    protocol::{InboundMessage, OutboundMessage, ProtocolSession},
    TranscriptionEngine,
};

#[derive(Parser, Debug)]
#[command(
    about = "JSON-lines host bridge for range transcription with a shared whisper model",
    version
)]
struct Args {
    /// JSON config file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to the GGML model file, loaded before the first message is read
    #[arg(long)]
    model_path: Option<PathBuf>,

    /// Worker threads for every transcription call
    #[arg(long)]
    threads: Option<usize>,

    /// Default language code (e.g. "en"); omit to auto-detect
    #[arg(long)]
    language: Option<String>,

    /// Window length in seconds for whole-file transcription
    #[arg(long)]
    chunk_seconds: Option<f32>,
}

impl Args {
    fn into_config(self) -> Result<BridgeConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => BridgeConfig::from_file(path)?,
            None => BridgeConfig::default(),
        };
        if let Some(model_path) = self.model_path {
            config.model_path = Some(model_path);
        }
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        if let Some(language) = self.language {
            config.language = Some(language);
        }
        if let Some(chunk_seconds) = self.chunk_seconds {
            config.chunk_seconds = chunk_seconds;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = Args::parse().into_config()?;
    let preload = config.model_path.is_some();
    let mut session = ProtocolSession::new(bridge::global(), config);

    send_message(&OutboundMessage::Ready {
        engine: "whisper".to_string(),
    })?;

    if preload {
        dispatch(
            &mut session,
            InboundMessage::Initialize {
                model_path: None,
                threads: None,
            },
        )?;
    }

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<InboundMessage>(&line) {
            Ok(message) => dispatch(&mut session, message)?,
            Err(err) => {
                send_message(&OutboundMessage::Error {
                    message: format!("failed to parse message: {err}"),
                })?;
            }
        }
    }

    info!("stdin closed, releasing model");
    bridge::release();
    Ok(())
}

/// Handle one message, writing each reply as soon as it is produced.
/// Stops writing after the first failed write and returns that error.
fn dispatch<E: TranscriptionEngine, D: AudioDecoder>(
    session: &mut ProtocolSession<'_, E, D>,
    message: InboundMessage,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut write_error = None;
    session.handle_inbound_with(message, |outbound| {
        if write_error.is_none() {
            write_error = send_message(&outbound).err();
        }
    });
    match write_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn send_message(message: &OutboundMessage) -> Result<(), Box<dyn std::error::Error>> {
    let mut stdout = io::stdout();
    serde_json::to_writer(&mut stdout, message)?;
    stdout.write_all(b"\n")?;
    stdout.flush()?;
    Ok(())
}
