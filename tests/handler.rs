mod common;

use std::path::Path;
use std::sync::Arc;

use common::{model_file, segments, ScriptedEngine, StaticDecoder};
use tempfile::NamedTempFile;
use whisper_bridge::audio::PcmAudio;
use whisper_bridge::models::model_id;
use whisper_bridge::{BridgeError, EngineSession, RangeTranscriber, TimeRange, TranscriptionRequest};

fn initialized_session(
    engine: ScriptedEngine,
    threads: usize,
) -> (Arc<EngineSession<ScriptedEngine>>, NamedTempFile) {
    let model = model_file();
    let session = Arc::new(EngineSession::new(engine));
    session.initialize(model.path(), threads).unwrap();
    (session, model)
}

#[test]
fn segments_are_joined_in_emission_order() {
    let (engine, _) = ScriptedEngine::with_script(vec![Ok(segments(&["hello", "world"]))]);
    let (session, _model) = initialized_session(engine, 4);
    let (decoder, _) = StaticDecoder::seconds(5.0);
    let handler = RangeTranscriber::with_decoder(session, decoder);

    let result = handler
        .handle(&TranscriptionRequest::new(Path::new("clip.wav"), 0.0, 2.0))
        .unwrap();

    assert_eq!(result.text, "hello\nworld\n");
    assert_eq!(result.segments.len(), 2);
}

#[test]
fn five_second_clip_window_uses_greedy_context_free_decoding() {
    let (engine, log) = ScriptedEngine::with_script(vec![Ok(segments(&[" so it begins"]))]);
    let (session, _model) = initialized_session(engine, 4);
    let (decoder, decodes) = StaticDecoder::seconds(5.0);
    let handler = RangeTranscriber::with_decoder(session, decoder);

    let result = handler
        .handle(&TranscriptionRequest::new(Path::new("clip.m4a"), 1.0, 3.0))
        .unwrap();

    assert_eq!(result.text, " so it begins\n");
    assert_eq!(*decodes.lock(), 1);

    let log = log.lock();
    assert_eq!(log.calls.len(), 1);
    let (len, params) = &log.calls[0];
    assert_eq!(*len, 80_000);
    assert_eq!((params.offset_ms, params.duration_ms), (1000, 2000));
    assert_eq!(params.n_threads, 4);
    assert_eq!(params.best_of, 1);
    assert!(params.no_context);
    assert!(params.is_auto_language());
}

#[test]
fn malformed_ranges_never_reach_decoder_or_engine() {
    let (engine, log) = ScriptedEngine::new();
    let (session, _model) = initialized_session(engine, 4);
    let (decoder, decodes) = StaticDecoder::seconds(5.0);
    let handler = RangeTranscriber::with_decoder(session, decoder);

    for (start, end) in [(3.0, 1.0), (-1.0, 2.0), (f32::NAN, 1.0), (0.0, f32::INFINITY)] {
        let result = handler.handle(&TranscriptionRequest::new(Path::new("a.wav"), start, end));
        assert!(
            matches!(result, Err(BridgeError::InvalidRange { .. })),
            "[{start}, {end}] should be rejected"
        );
    }

    assert_eq!(*decodes.lock(), 0);
    assert!(log.lock().calls.is_empty());
}

#[test]
fn uninitialized_session_fails_before_decoding() {
    let (engine, _) = ScriptedEngine::new();
    let session = Arc::new(EngineSession::new(engine));
    let (decoder, decodes) = StaticDecoder::seconds(5.0);
    let handler = RangeTranscriber::with_decoder(session, decoder);

    let result = handler.handle(&TranscriptionRequest::new(Path::new("a.wav"), 0.0, 1.0));

    assert!(matches!(result, Err(BridgeError::NotInitialized)));
    assert_eq!(*decodes.lock(), 0);
}

#[test]
fn bad_language_hint_fails_before_decoding() {
    let (engine, _) = ScriptedEngine::new();
    let (session, _model) = initialized_session(engine, 4);
    let (decoder, decodes) = StaticDecoder::seconds(5.0);
    let handler = RangeTranscriber::with_decoder(session, decoder);

    let request =
        TranscriptionRequest::new(Path::new("a.wav"), 0.0, 1.0).with_language(Some("en_US!"));
    let result = handler.handle(&request);

    assert!(matches!(result, Err(BridgeError::InvalidLanguage(_))));
    assert_eq!(*decodes.lock(), 0);
}

#[test]
fn decode_failure_is_propagated() {
    let (engine, log) = ScriptedEngine::new();
    let (session, _model) = initialized_session(engine, 4);
    let (decoder, _) = StaticDecoder::failing();
    let handler = RangeTranscriber::with_decoder(session, decoder);

    let result = handler.handle(&TranscriptionRequest::new(Path::new("broken.mp3"), 0.0, 1.0));

    assert!(matches!(result, Err(BridgeError::Decode(_))));
    assert!(log.lock().calls.is_empty());
}

#[test]
fn zero_length_range_is_empty_success() {
    let (engine, log) = ScriptedEngine::new();
    let (session, _model) = initialized_session(engine, 4);
    let (decoder, _) = StaticDecoder::seconds(5.0);
    let handler = RangeTranscriber::with_decoder(session, decoder);

    let result = handler
        .handle(&TranscriptionRequest::new(Path::new("a.wav"), 2.0, 2.0))
        .unwrap();

    assert_eq!(result.text, "");
    assert!(result.segments.is_empty());
    assert!(log.lock().calls.is_empty());
}

#[test]
fn ranges_are_clipped_to_the_decoded_audio() {
    let (engine, log) = ScriptedEngine::new();
    let (session, _model) = initialized_session(engine, 4);
    let (decoder, _) = StaticDecoder::seconds(5.0);
    let handler = RangeTranscriber::with_decoder(session, decoder);

    handler
        .handle(&TranscriptionRequest::new(Path::new("a.wav"), 4.0, 9.0))
        .unwrap();
    let past_end = handler
        .handle(&TranscriptionRequest::new(Path::new("a.wav"), 7.0, 9.0))
        .unwrap();

    assert_eq!(past_end.text, "");
    let log = log.lock();
    assert_eq!(log.calls.len(), 1);
    assert_eq!((log.calls[0].1.offset_ms, log.calls[0].1.duration_ms), (4000, 1000));
}

#[test]
fn non_engine_format_pcm_is_converted_first() {
    let (engine, log) = ScriptedEngine::new();
    let (session, _model) = initialized_session(engine, 4);
    let (decoder, _) = StaticDecoder::seconds(0.0);
    let handler = RangeTranscriber::with_decoder(session, decoder);

    // Two seconds of 8 kHz stereo.
    let pcm = PcmAudio {
        samples: vec![0.25; 8_000 * 2 * 2],
        sample_rate: 8_000,
        channels: 2,
    };
    handler
        .transcribe_pcm(&pcm, TimeRange::new(0.0, 2.0).unwrap(), None)
        .unwrap();

    assert_eq!(log.lock().calls[0].0, 32_000);
}

#[test]
fn whole_file_is_walked_in_chunks() {
    let (engine, log) = ScriptedEngine::with_script(vec![
        Ok(segments(&["  first part "])),
        Ok(vec![]),
        Ok(segments(&["last", "bit"])),
    ]);
    let (session, model) = initialized_session(engine, 4);
    let (decoder, decodes) = StaticDecoder::seconds(65.0);
    let handler = RangeTranscriber::with_decoder(session, decoder);

    let mut progress = Vec::new();
    let transcript = handler
        .transcribe_file(Path::new("talk.ogg"), Some("en"), 30.0, |text| {
            progress.push(text.to_string())
        })
        .unwrap();

    assert_eq!(transcript.text, "first part\nlast\nbit");
    assert_eq!(progress, vec!["first part\n", "first part\nlast\nbit\n"]);
    assert_eq!(transcript.model_id, model_id(model.path()));
    assert_eq!(transcript.language.as_deref(), Some("en"));
    assert!((transcript.duration_seconds - 65.0).abs() < 1e-3);
    assert_eq!(*decodes.lock(), 1, "audio is decoded once for all chunks");

    let windows: Vec<(i32, i32)> = log
        .lock()
        .calls
        .iter()
        .map(|(_, p)| (p.offset_ms, p.duration_ms))
        .collect();
    assert_eq!(windows, vec![(0, 30_000), (30_000, 30_000), (60_000, 5_000)]);
}

#[test]
fn whole_file_rejects_non_positive_chunks() {
    let (engine, _) = ScriptedEngine::new();
    let (session, _model) = initialized_session(engine, 4);
    let (decoder, _) = StaticDecoder::seconds(5.0);
    let handler = RangeTranscriber::with_decoder(session, decoder);

    let result = handler.transcribe_file(Path::new("a.wav"), None, 0.0, |_| {});
    assert!(matches!(result, Err(BridgeError::InvalidRange { .. })));
}

#[test]
fn whole_file_rejects_sub_millisecond_chunks() {
    let (engine, log) = ScriptedEngine::new();
    let (session, _model) = initialized_session(engine, 4);
    let (decoder, decodes) = StaticDecoder::seconds(5.0);
    let handler = RangeTranscriber::with_decoder(session, decoder);

    let result = handler.transcribe_file(Path::new("a.wav"), None, 1e-7, |_| {});
    assert!(matches!(result, Err(BridgeError::InvalidRange { .. })));
    assert_eq!(*decodes.lock(), 0);
    assert!(log.lock().calls.is_empty());
}

#[test]
fn millisecond_chunks_cover_the_file_and_finish() {
    let (engine, log) = ScriptedEngine::new();
    let (session, _model) = initialized_session(engine, 4);
    let (decoder, _) = StaticDecoder::seconds(0.01);
    let handler = RangeTranscriber::with_decoder(session, decoder);

    handler
        .transcribe_file(Path::new("a.wav"), None, 0.001, |_| {})
        .unwrap();

    let log = log.lock();
    let offsets: Vec<i32> = log.calls.iter().map(|(_, p)| p.offset_ms).collect();
    assert_eq!(offsets, (0..10).collect::<Vec<_>>());
    assert!(log.calls.iter().all(|(_, p)| p.duration_ms == 1));
}

#[test]
fn whole_file_converts_decoded_audio_before_windowing() {
    let (engine, log) = ScriptedEngine::new();
    let (session, _model) = initialized_session(engine, 4);
    // Three seconds of 8 kHz stereo.
    let (decoder, _) = StaticDecoder::with_pcm(PcmAudio {
        samples: vec![0.25; 8_000 * 2 * 3],
        sample_rate: 8_000,
        channels: 2,
    });
    let handler = RangeTranscriber::with_decoder(session, decoder);

    let transcript = handler
        .transcribe_file(Path::new("a.wav"), None, 1.0, |_| {})
        .unwrap();

    assert!((transcript.duration_seconds - 3.0).abs() < 1e-3);
    let log = log.lock();
    let windows: Vec<(usize, i32, i32)> = log
        .calls
        .iter()
        .map(|(len, p)| (*len, p.offset_ms, p.duration_ms))
        .collect();
    assert_eq!(
        windows,
        vec![(48_000, 0, 1_000), (48_000, 1_000, 1_000), (48_000, 2_000, 1_000)]
    );
}

#[test]
fn inverted_range_built_by_hand_is_rejected() {
    let (engine, log) = ScriptedEngine::new();
    let (session, _model) = initialized_session(engine, 4);
    let (decoder, _) = StaticDecoder::seconds(0.0);
    let handler = RangeTranscriber::with_decoder(session, decoder);

    let pcm = PcmAudio::mono_16k(vec![0.0; 5 * 16_000]);
    let inverted = TimeRange { start: 3.0, end: 1.0 };
    let result = handler.transcribe_pcm(&pcm, inverted, None);

    assert!(matches!(result, Err(BridgeError::InvalidRange { .. })));
    assert!(log.lock().calls.is_empty());
}
