//! Mapping from a requested time range onto engine-native decode parameters.
//!
//! Every range call decodes greedily, without translation, and without any
//! prompt context carried over from a previous call, so ranges can be
//! requested in any order against the same recording.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{BridgeError, Result, TimeRange};

/// Language value that asks the engine to detect the spoken language.
pub const AUTO_LANGUAGE: &str = "auto";

static LANGUAGE_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z]{2,3}$").expect("language pattern is valid"));

/// Full language names whisper understands, with the code each maps to.
const LANGUAGE_NAMES: &[(&str, &str)] = &[
    ("english", "en"),
    ("chinese", "zh"),
    ("german", "de"),
    ("spanish", "es"),
    ("russian", "ru"),
    ("korean", "ko"),
    ("french", "fr"),
    ("japanese", "ja"),
    ("portuguese", "pt"),
    ("turkish", "tr"),
    ("polish", "pl"),
    ("catalan", "ca"),
    ("dutch", "nl"),
    ("arabic", "ar"),
    ("swedish", "sv"),
    ("italian", "it"),
    ("indonesian", "id"),
    ("hindi", "hi"),
    ("finnish", "fi"),
    ("vietnamese", "vi"),
    ("hebrew", "he"),
    ("ukrainian", "uk"),
    ("greek", "el"),
    ("malay", "ms"),
    ("czech", "cs"),
    ("romanian", "ro"),
    ("danish", "da"),
    ("hungarian", "hu"),
    ("tamil", "ta"),
    ("norwegian", "no"),
    ("thai", "th"),
    ("urdu", "ur"),
    ("croatian", "hr"),
    ("bulgarian", "bg"),
    ("lithuanian", "lt"),
    ("latin", "la"),
    ("maori", "mi"),
    ("malayalam", "ml"),
    ("welsh", "cy"),
    ("slovak", "sk"),
    ("telugu", "te"),
    ("persian", "fa"),
    ("latvian", "lv"),
    ("bengali", "bn"),
    ("serbian", "sr"),
    ("azerbaijani", "az"),
    ("slovenian", "sl"),
    ("kannada", "kn"),
    ("estonian", "et"),
    ("macedonian", "mk"),
    ("breton", "br"),
    ("basque", "eu"),
    ("icelandic", "is"),
    ("armenian", "hy"),
    ("nepali", "ne"),
    ("mongolian", "mn"),
    ("bosnian", "bs"),
    ("kazakh", "kk"),
    ("albanian", "sq"),
    ("swahili", "sw"),
    ("galician", "gl"),
    ("marathi", "mr"),
    ("punjabi", "pa"),
    ("sinhala", "si"),
    ("khmer", "km"),
    ("shona", "sn"),
    ("yoruba", "yo"),
    ("somali", "so"),
    ("afrikaans", "af"),
    ("occitan", "oc"),
    ("georgian", "ka"),
    ("belarusian", "be"),
    ("tajik", "tg"),
    ("sindhi", "sd"),
    ("gujarati", "gu"),
    ("amharic", "am"),
    ("yiddish", "yi"),
    ("lao", "lo"),
    ("uzbek", "uz"),
    ("faroese", "fo"),
    ("haitian creole", "ht"),
    ("pashto", "ps"),
    ("turkmen", "tk"),
    ("nynorsk", "nn"),
    ("maltese", "mt"),
    ("sanskrit", "sa"),
    ("luxembourgish", "lb"),
    ("myanmar", "my"),
    ("tibetan", "bo"),
    ("tagalog", "tl"),
    ("malagasy", "mg"),
    ("assamese", "as"),
    ("tatar", "tt"),
    ("hawaiian", "haw"),
    ("lingala", "ln"),
    ("hausa", "ha"),
    ("bashkir", "ba"),
    ("javanese", "jw"),
    ("sundanese", "su"),
    ("cantonese", "yue"),
];

#[derive(Debug, Clone, PartialEq)]
pub struct DecodeParams {
    pub offset_ms: i32,
    pub duration_ms: i32,
    pub n_threads: i32,
    pub language: String,
    /// Candidates considered per step by the greedy sampler.
    pub best_of: i32,
    pub translate: bool,
    pub no_context: bool,
    pub single_segment: bool,
}

impl DecodeParams {
    pub fn for_range(range: TimeRange, n_threads: usize, language: Option<&str>) -> Result<Self> {
        Ok(Self {
            offset_ms: seconds_to_ms(range.start),
            duration_ms: seconds_to_ms(range.duration()),
            n_threads: i32::try_from(n_threads).unwrap_or(i32::MAX),
            language: normalize_language(language)?,
            best_of: 1,
            translate: false,
            no_context: true,
            single_segment: false,
        })
    }

    pub fn is_auto_language(&self) -> bool {
        self.language == AUTO_LANGUAGE
    }
}

/// Nearest whole millisecond, computed in f64 so that e.g. 1.001 s maps to
/// 1001 ms rather than drifting by single-precision error.
pub fn seconds_to_ms(seconds: f32) -> i32 {
    let ms = (f64::from(seconds) * 1000.0).round();
    ms.clamp(0.0, f64::from(i32::MAX)) as i32
}

/// Lowercases and checks a language hint. Empty or missing hints, and the
/// literal `auto`, all select auto-detection.
///
/// Hints are 2-3 letter codes (`en`, `yue`) or one of whisper's full
/// language names (`english`, `haitian creole`), which are mapped to their
/// code.
pub fn normalize_language(language: Option<&str>) -> Result<String> {
    let hint = match language.map(str::trim) {
        None | Some("") => return Ok(AUTO_LANGUAGE.to_string()),
        Some(hint) => hint.to_ascii_lowercase(),
    };
    if hint == AUTO_LANGUAGE || LANGUAGE_CODE.is_match(&hint) {
        return Ok(hint);
    }
    LANGUAGE_NAMES
        .iter()
        .find(|(name, _)| *name == hint)
        .map(|(_, code)| code.to_string())
        .ok_or(BridgeError::InvalidLanguage(hint))
}
