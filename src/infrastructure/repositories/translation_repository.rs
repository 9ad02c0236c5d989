use async_trait::async_trait;

/// Repository for machine translation.
/// Abstracts the underlying provider (Google, DeepL, a self-hosted model, ...)
///
/// Implementations receive base language subtags ("en", "ar") and must bound
/// every call with a timeout.
#[async_trait]
pub trait TranslationRepository: Send + Sync {
    /// Translate `text` from `source_language` to `target_language`
    ///
    /// # Errors
    /// Returns a message describing the provider failure (timeout, non-2xx,
    /// malformed body). Callers decide the fallback.
    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String, String>;
}
