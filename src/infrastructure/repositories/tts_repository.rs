use async_trait::async_trait;
use std::path::Path;

/// Repository for TTS synthesis operations.
/// Abstracts the underlying TTS provider (XTTS v2, a placeholder generator, ...)
///
/// Implementations are responsible for:
/// - Mapping the target language to a provider voice/language
/// - Voice cloning from the reference recording when one is supplied
/// - Returning a complete WAV byte stream
#[async_trait]
pub trait TtsRepository: Send + Sync {
    /// Provider name used in logs and readiness reports
    fn name(&self) -> &'static str;

    /// Synthesize text to speech for a given language
    ///
    /// # Arguments
    /// * `text` - The text to speak (already translated)
    /// * `language` - Provider language code, see `domain::speech::synthesis_language`
    /// * `speaker_wav` - Optional reference recording for voice cloning
    ///
    /// # Errors
    /// Returns error if synthesis fails or provider is unavailable
    async fn synthesize(
        &self,
        text: &str,
        language: &str,
        speaker_wav: Option<&Path>,
    ) -> Result<Vec<u8>, String>;

    /// Check that the provider is reachable
    async fn health_check(&self) -> Result<(), String>;
}
