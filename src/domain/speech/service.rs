use super::language::{base_language, synthesis_language};
use super::wav::is_valid_wav;
use crate::domain::limits::ConcurrencyLimit;
use crate::infrastructure::repositories::{TranslationRepository, TtsRepository};
use async_trait::async_trait;
use moka::future::Cache;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Outcome of translating and speaking one chunk.
/// `audio_buffer` is empty when synthesis failed; the translation is kept either way.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechResult {
    pub translated_text: String,
    pub audio_buffer: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SynthesisStatus {
    pub provider: Option<String>,
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

type TranslationKey = (String, String, String);

pub struct TranslationService {
    translation_repo: Arc<dyn TranslationRepository>,
    limit: ConcurrencyLimit,
    cache: Option<Cache<TranslationKey, String>>,
}

impl TranslationService {
    pub fn new(
        translation_repo: Arc<dyn TranslationRepository>,
        limit: ConcurrencyLimit,
        cache_enabled: bool,
    ) -> Self {
        let cache = if cache_enabled {
            Some(
                Cache::builder()
                    .max_capacity(10_000)
                    .time_to_idle(Duration::from_secs(30 * 60))
                    .build(),
            )
        } else {
            None
        };

        Self {
            translation_repo,
            limit,
            cache,
        }
    }

    /// Translate one chunk. Never fails: any provider error yields the source text.
    pub async fn translate(&self, text: &str, source_language: &str, target_language: &str) -> String {
        let source = base_language(source_language);
        let target = base_language(target_language);

        if source == target {
            return text.to_string();
        }

        let key = (source.clone(), target.clone(), text.to_string());
        if let Some(cache) = &self.cache {
            if let Some(cached) = cache.get(&key).await {
                tracing::debug!(target_language = %target, "Translation cache hit");
                return cached;
            }
        }

        let result = {
            let _permit = self.limit.acquire().await;
            self.translation_repo.translate(text, &source, &target).await
        };

        match result {
            Ok(translated) => {
                if let Some(cache) = &self.cache {
                    cache.insert(key, translated.clone()).await;
                }
                translated
            }
            Err(e) => {
                tracing::warn!(
                    source_language = %source,
                    target_language = %target,
                    error = %e,
                    "Translation failed, falling back to source text"
                );
                text.to_string()
            }
        }
    }
}

#[async_trait]
pub trait SpeechServiceApi: Send + Sync {
    /// Translate a chunk and speak the translation, optionally in the voice of
    /// `reference_audio`.
    ///
    /// Never fails: translation degrades to the source text, synthesis to an
    /// empty buffer.
    async fn translate_and_synthesize(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
        reference_audio: Option<&Path>,
    ) -> SpeechResult;

    async fn synthesis_status(&self) -> SynthesisStatus;
}

pub struct SpeechService {
    translation: Arc<TranslationService>,
    tts_repo: Option<Arc<dyn TtsRepository>>,
    limit: ConcurrencyLimit,
}

impl SpeechService {
    pub fn new(
        translation: Arc<TranslationService>,
        tts_repo: Option<Arc<dyn TtsRepository>>,
        limit: ConcurrencyLimit,
    ) -> Self {
        Self {
            translation,
            tts_repo,
            limit,
        }
    }

    async fn synthesize(
        &self,
        text: &str,
        target_language: &str,
        reference_audio: Option<&Path>,
    ) -> Vec<u8> {
        let Some(tts_repo) = &self.tts_repo else {
            tracing::warn!("No synthesis provider configured, returning empty audio");
            return Vec::new();
        };

        let language = synthesis_language(target_language);
        let start_time = Instant::now();

        let result = {
            let _permit = self.limit.acquire().await;
            tts_repo.synthesize(text, language, reference_audio).await
        };

        match result {
            Ok(audio) if is_valid_wav(&audio) => {
                tracing::debug!(
                    provider = tts_repo.name(),
                    language = language,
                    audio_size = audio.len(),
                    latency_ms = start_time.elapsed().as_millis() as u64,
                    "Speech synthesized"
                );
                audio
            }
            Ok(audio) => {
                tracing::warn!(
                    provider = tts_repo.name(),
                    audio_size = audio.len(),
                    "Synthesis returned an invalid WAV stream, discarding audio"
                );
                Vec::new()
            }
            Err(e) => {
                tracing::warn!(
                    provider = tts_repo.name(),
                    language = language,
                    error = %e,
                    "Synthesis failed, keeping translation without audio"
                );
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl SpeechServiceApi for SpeechService {
    async fn translate_and_synthesize(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
        reference_audio: Option<&Path>,
    ) -> SpeechResult {
        let translated_text = self
            .translation
            .translate(text, source_language, target_language)
            .await;

        let audio_buffer = self
            .synthesize(&translated_text, target_language, reference_audio)
            .await;

        SpeechResult {
            translated_text,
            audio_buffer,
        }
    }

    async fn synthesis_status(&self) -> SynthesisStatus {
        match &self.tts_repo {
            None => SynthesisStatus {
                provider: None,
                healthy: false,
                error: Some("no synthesis provider configured".to_string()),
            },
            Some(repo) => match repo.health_check().await {
                Ok(()) => SynthesisStatus {
                    provider: Some(repo.name().to_string()),
                    healthy: true,
                    error: None,
                },
                Err(e) => SynthesisStatus {
                    provider: Some(repo.name().to_string()),
                    healthy: false,
                    error: Some(e),
                },
            },
        }
    }
}
