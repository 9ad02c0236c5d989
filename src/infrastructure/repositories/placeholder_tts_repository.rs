use super::tts_repository::TtsRepository;
use crate::domain::speech::wav::{silent_wav, PLACEHOLDER_DURATION_SECS, PLACEHOLDER_SAMPLE_RATE};
use async_trait::async_trait;
use std::path::Path;

/// Development stand-in for a synthesis server: every chunk becomes a short silent WAV
pub struct PlaceholderTtsRepository;

#[async_trait]
impl TtsRepository for PlaceholderTtsRepository {
    fn name(&self) -> &'static str {
        "placeholder"
    }

    async fn synthesize(
        &self,
        text: &str,
        language: &str,
        _speaker_wav: Option<&Path>,
    ) -> Result<Vec<u8>, String> {
        tracing::debug!(
            language = language,
            text_length = text.len(),
            "Generating placeholder audio"
        );

        silent_wav(PLACEHOLDER_DURATION_SECS, PLACEHOLDER_SAMPLE_RATE)
            .map_err(|e| format!("Failed to encode placeholder audio: {}", e))
    }

    async fn health_check(&self) -> Result<(), String> {
        Ok(())
    }
}
