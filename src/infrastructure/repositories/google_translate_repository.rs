use super::translation_repository::TranslationRepository;
use async_trait::async_trait;
use serde_json::Value;
use std::time::{Duration, Instant};

/// Google Translate implementation backed by the public `translate_a/single` endpoint
pub struct GoogleTranslateRepository {
    client: reqwest::Client,
    base_url: String,
}

impl GoogleTranslateRepository {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Join the translated segments found at `data[0][i][0]`
    fn parse_response(body: &Value) -> Result<String, String> {
        let segments = body
            .get(0)
            .and_then(Value::as_array)
            .ok_or_else(|| "Malformed translation response: missing segments".to_string())?;

        let translated: String = segments
            .iter()
            .filter_map(|segment| segment.get(0).and_then(Value::as_str))
            .collect();

        if translated.trim().is_empty() {
            return Err("Malformed translation response: empty translation".to_string());
        }

        Ok(translated)
    }
}

#[async_trait]
impl TranslationRepository for GoogleTranslateRepository {
    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String, String> {
        let url = format!(
            "{}/translate_a/single?client=gtx&sl={}&tl={}&dt=t&q={}",
            self.base_url,
            urlencoding::encode(source_language),
            urlencoding::encode(target_language),
            urlencoding::encode(text)
        );

        let start_time = Instant::now();

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| format!("Translation request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("Translation provider returned {}", status));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| format!("Malformed translation response: {}", e))?;

        let translated = Self::parse_response(&body)?;

        tracing::debug!(
            source_language = source_language,
            target_language = target_language,
            text_length = text.len(),
            translated_length = translated.len(),
            latency_ms = start_time.elapsed().as_millis() as u64,
            "Translation completed"
        );

        Ok(translated)
    }
}
