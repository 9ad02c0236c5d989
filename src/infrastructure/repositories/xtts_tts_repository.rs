use super::tts_repository::TtsRepository;
use crate::domain::speech::wav::is_valid_wav;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::path::Path;
use std::time::{Duration, Instant};

const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// XTTS v2 server implementation of the TTS repository.
///
/// The server exposes `POST /api/synthesize` (multipart `text`, `language`,
/// optional `speaker_wav`) answering with `audio/wav`, and `GET /health`.
pub struct XttsTtsRepository {
    client: reqwest::Client,
    base_url: String,
}

impl XttsTtsRepository {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Load the reference recording, degrading to no cloning when it cannot be read
    async fn speaker_part(&self, speaker_wav: &Path) -> Option<Part> {
        let bytes = match tokio::fs::read(speaker_wav).await {
            Ok(bytes) if !bytes.is_empty() => bytes,
            Ok(_) => {
                tracing::warn!(path = %speaker_wav.display(), "Reference audio is empty, synthesizing without cloning");
                return None;
            }
            Err(e) => {
                tracing::warn!(
                    path = %speaker_wav.display(),
                    error = %e,
                    "Reference audio is not readable, synthesizing without cloning"
                );
                return None;
            }
        };

        Part::bytes(bytes)
            .file_name("speaker.wav")
            .mime_str("audio/wav")
            .ok()
    }
}

#[async_trait]
impl TtsRepository for XttsTtsRepository {
    fn name(&self) -> &'static str {
        "xtts"
    }

    async fn synthesize(
        &self,
        text: &str,
        language: &str,
        speaker_wav: Option<&Path>,
    ) -> Result<Vec<u8>, String> {
        let mut form = Form::new()
            .text("text", text.to_string())
            .text("language", language.to_string());

        let cloning = match speaker_wav {
            Some(path) => match self.speaker_part(path).await {
                Some(part) => {
                    form = form.part("speaker_wav", part);
                    true
                }
                None => false,
            },
            None => false,
        };

        tracing::info!(
            language = language,
            text_length = text.len(),
            voice_cloning = cloning,
            "Calling XTTS synthesis"
        );

        let start_time = Instant::now();

        let response = self
            .client
            .post(format!("{}/api/synthesize", self.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| format!("XTTS request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("XTTS server returned {}", status));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| format!("Failed to read XTTS response: {}", e))?
            .to_vec();

        if !is_valid_wav(&audio) {
            return Err(format!(
                "XTTS server returned a malformed WAV stream ({} bytes)",
                audio.len()
            ));
        }

        tracing::info!(
            language = language,
            audio_size = audio.len(),
            latency_ms = start_time.elapsed().as_millis() as u64,
            "XTTS synthesis completed"
        );

        Ok(audio)
    }

    async fn health_check(&self) -> Result<(), String> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
            .map_err(|e| format!("XTTS server unreachable: {}", e))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(format!("XTTS health check returned {}", response.status()))
        }
    }
}
