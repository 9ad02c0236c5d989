pub mod language;
pub mod service;
pub mod wav;

pub use language::{base_language, detect_language, is_same_language, synthesis_language};
pub use service::{
    SpeechResult, SpeechService, SpeechServiceApi, SynthesisStatus, TranslationService,
};
