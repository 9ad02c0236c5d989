use lingua::{Language, LanguageDetector, LanguageDetectorBuilder};
use std::sync::LazyLock;

/// Language codes understood by the XTTS v2 synthesis server
pub const SYNTHESIS_LANGUAGES: &[&str] = &[
    "en", "ar", "es", "fr", "de", "it", "pt", "ja", "zh", "ko", "ru", "pl", "nl", "tr", "sv",
    "fi", "no",
];

/// Fallback when a code is not understood by the synthesis server
pub const DEFAULT_SYNTHESIS_LANGUAGE: &str = "en";

const DETECTABLE_LANGUAGES: &[Language] = &[
    Language::English,
    Language::Arabic,
    Language::Spanish,
    Language::French,
    Language::German,
    Language::Italian,
    Language::Portuguese,
    Language::Turkish,
    Language::Russian,
    Language::Dutch,
    Language::Polish,
    Language::Japanese,
    Language::Chinese,
    Language::Korean,
];

static DETECTOR: LazyLock<LanguageDetector> =
    LazyLock::new(|| LanguageDetectorBuilder::from_languages(DETECTABLE_LANGUAGES).build());

/// Normalize a locale to its base language subtag ("en-US" -> "en", "pt_BR" -> "pt")
pub fn base_language(code: &str) -> String {
    code.trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

/// Compare two locales on their base subtag
pub fn is_same_language(a: &str, b: &str) -> bool {
    base_language(a) == base_language(b)
}

/// Map a locale to a synthesis language, falling back to English
pub fn synthesis_language(code: &str) -> &'static str {
    let base = base_language(code);
    SYNTHESIS_LANGUAGES
        .iter()
        .copied()
        .find(|lang| *lang == base)
        .unwrap_or(DEFAULT_SYNTHESIS_LANGUAGE)
}

/// Detect the language of a message that arrived without a language code
pub fn detect_language(text: &str) -> Option<String> {
    let language = DETECTOR.detect_language_of(text)?;
    let code = match language {
        Language::English => "en",
        Language::Arabic => "ar",
        Language::Spanish => "es",
        Language::French => "fr",
        Language::German => "de",
        Language::Italian => "it",
        Language::Portuguese => "pt",
        Language::Turkish => "tr",
        Language::Russian => "ru",
        Language::Dutch => "nl",
        Language::Polish => "pl",
        Language::Japanese => "ja",
        Language::Chinese => "zh",
        Language::Korean => "ko",
        #[allow(unreachable_patterns)]
        _ => return None,
    };
    Some(code.to_string())
}
