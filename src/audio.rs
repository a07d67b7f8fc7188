//! Audio decoding for transcription.
//!
//! The engine only understands 16 kHz mono `f32` samples in `[-1.0, 1.0]`.
//! Everything in this module exists to turn a recording on disk into exactly
//! that: container probing and codec decoding, downmixing, and resampling.

use std::fs::File;
use std::path::Path;

use log::{debug, warn};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use thiserror::Error;

/// Sample rate the engine expects.
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

const RESAMPLE_CHUNK: usize = 1024;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("unsupported WAV format: {0}")]
    UnsupportedWav(String),

    #[error("unrecognized container: {0}")]
    Format(String),

    #[error("codec error: {0}")]
    Codec(String),

    #[error("packet read failed: {0}")]
    Packet(String),

    #[error("no audio track found")]
    NoAudioTrack,

    #[error("unknown sample rate")]
    UnknownSampleRate,

    #[error("no audio samples decoded")]
    Empty,

    #[error("resample failed: {0}")]
    Resample(String),
}

/// Decoded, engine-ready audio.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl PcmAudio {
    /// Wrap samples that are already 16 kHz mono.
    pub fn mono_16k(samples: Vec<f32>) -> Self {
        Self {
            samples,
            sample_rate: TARGET_SAMPLE_RATE,
            channels: 1,
        }
    }

    pub fn duration_seconds(&self) -> f32 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / (self.sample_rate as f32 * f32::from(self.channels))
    }
}

/// Turns a stored recording into engine-ready PCM.
pub trait AudioDecoder: Send + Sync {
    fn decode(&self, path: &Path) -> Result<PcmAudio, AudioError>;
}

/// Decoder for any container and codec symphonia was built with
/// (WAV, MP3, AAC/M4A here).
#[derive(Debug, Clone, Copy, Default)]
pub struct SymphoniaDecoder;

impl AudioDecoder for SymphoniaDecoder {
    fn decode(&self, path: &Path) -> Result<PcmAudio, AudioError> {
        let file = File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| AudioError::Format(e.to_string()))?;
        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(AudioError::NoAudioTrack)?;
        let track_id = track.id;
        let codec_params = track.codec_params.clone();
        let source_rate = codec_params
            .sample_rate
            .ok_or(AudioError::UnknownSampleRate)?;

        let mut decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| AudioError::Codec(e.to_string()))?;

        let mut mono: Vec<f32> = Vec::new();
        loop {
            let packet = match format.next_packet() {
                Ok(p) => p,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(AudioError::Packet(e.to_string())),
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(d) => d,
                Err(SymphoniaError::DecodeError(e)) => {
                    warn!("Skipping corrupt audio frame in {:?}: {}", path, e);
                    continue;
                }
                Err(e) => return Err(AudioError::Codec(e.to_string())),
            };

            let spec = *decoded.spec();
            let frames = decoded.frames();
            if frames == 0 {
                continue;
            }

            let mut buffer = SampleBuffer::<f32>::new(frames as u64, spec);
            buffer.copy_interleaved_ref(decoded);
            mono.extend(downmix(buffer.samples(), spec.channels.count()));
        }

        if mono.is_empty() {
            return Err(AudioError::Empty);
        }

        let samples = resample(&mono, source_rate, TARGET_SAMPLE_RATE)?;
        debug!(
            "Decoded {:?}: {} Hz source, {} samples ({:.2}s) at 16 kHz",
            path,
            source_rate,
            samples.len(),
            samples.len() as f32 / TARGET_SAMPLE_RATE as f32
        );
        Ok(PcmAudio::mono_16k(samples))
    }
}

/// WAV-only decoder built on hound.
///
/// Accepts integer PCM of 8 to 32 bits and 32-bit float, any channel count
/// and any sample rate.
///
/// # Examples
///
/// ```rust,no_run
/// use whisper_bridge::audio::{AudioDecoder, WavDecoder};
/// use std::path::Path;
///
/// let pcm = WavDecoder.decode(Path::new("audio.wav"))?;
/// println!("Loaded {:.2}s of audio", pcm.duration_seconds());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct WavDecoder;

impl AudioDecoder for WavDecoder {
    fn decode(&self, path: &Path) -> Result<PcmAudio, AudioError> {
        let mut reader = hound::WavReader::open(path)?;
        let spec = reader.spec();

        let interleaved: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
            (hound::SampleFormat::Float, 32) => {
                reader.samples::<f32>().collect::<Result<_, _>>()?
            }
            (hound::SampleFormat::Int, bits @ 8..=32) => {
                let full_scale = ((1i64 << (bits - 1)) - 1) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|s| (s as f32 / full_scale).max(-1.0)))
                    .collect::<Result<_, _>>()?
            }
            (format, bits) => {
                return Err(AudioError::UnsupportedWav(format!(
                    "{:?} with {} bits per sample",
                    format, bits
                )))
            }
        };

        let mono = downmix(&interleaved, usize::from(spec.channels));
        let samples = resample(&mono, spec.sample_rate, TARGET_SAMPLE_RATE)?;
        Ok(PcmAudio::mono_16k(samples))
    }
}

/// Average interleaved frames down to a single channel.
pub fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Resample mono audio from `from_rate` to `to_rate`.
///
/// The output length is `len * to_rate / from_rate`, with the resampler's
/// filter delay removed so that timestamps line up with the source.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>, AudioError> {
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }
    if from_rate == 0 || to_rate == 0 {
        return Err(AudioError::UnknownSampleRate);
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = f64::from(to_rate) / f64::from(from_rate);
    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, RESAMPLE_CHUNK, 1)
        .map_err(|e| AudioError::Resample(format!("init: {e}")))?;

    let expected_len = (samples.len() as f64 * ratio).round() as usize;
    let delay = resampler.output_delay();
    let mut output = Vec::with_capacity(expected_len + delay + RESAMPLE_CHUNK);

    // One trailing chunk of silence flushes the filter delay out.
    let flush = vec![0.0f32; RESAMPLE_CHUNK];
    let chunks = samples
        .chunks(RESAMPLE_CHUNK)
        .chain(std::iter::once(flush.as_slice()));

    for chunk in chunks {
        let mut input = chunk.to_vec();
        input.resize(RESAMPLE_CHUNK, 0.0);

        let resampled = resampler
            .process(&[input], None)
            .map_err(|e| AudioError::Resample(format!("process: {e}")))?;
        if let Some(channel) = resampled.first() {
            output.extend_from_slice(channel);
        }
        if output.len() >= expected_len + delay {
            break;
        }
    }

    let mut output = output.split_off(delay.min(output.len()));
    output.resize(expected_len, 0.0);
    Ok(output)
}

/// Write mono samples as a 16-bit PCM WAV file.
pub fn write_wav_samples(path: &Path, samples: &[f32], sample_rate: u32) -> Result<(), AudioError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in samples {
        let scaled = (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16;
        writer.write_sample(scaled)?;
    }
    writer.finalize()?;
    Ok(())
}
