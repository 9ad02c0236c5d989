use crate::infrastructure::repositories::AudioStorageRepository;
use std::sync::Arc;
use std::time::Instant;

/// Deterministic object name, unique per language, message and chunk.
///
/// Parts are escaped losslessly: ASCII letters, digits and `-` pass through,
/// every other byte becomes `~XX`, so `_` only ever separates parts.
pub fn chunk_audio_key(language: &str, message_id: &str, chunk_index: usize) -> String {
    format!(
        "{}_{}_chunk{}.wav",
        escape_key_part(language),
        escape_key_part(message_id),
        chunk_index
    )
}

fn escape_key_part(part: &str) -> String {
    let mut escaped = String::with_capacity(part.len());
    for byte in part.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            escaped.push(byte as char);
        } else {
            escaped.push_str(&format!("~{:02X}", byte));
        }
    }
    escaped
}

/// Persists generated chunk audio and hands back its public URL
pub struct ChunkAudioPublisher {
    storage: Arc<dyn AudioStorageRepository>,
}

impl ChunkAudioPublisher {
    pub fn new(storage: Arc<dyn AudioStorageRepository>) -> Self {
        Self { storage }
    }

    /// `None` when there is no audio to publish or storage failed
    pub async fn publish(
        &self,
        audio: &[u8],
        language: &str,
        message_id: &str,
        chunk_index: usize,
    ) -> Option<String> {
        if audio.is_empty() {
            tracing::debug!(
                message_id = message_id,
                language = language,
                chunk_index = chunk_index,
                "No audio for chunk, nothing to publish"
            );
            return None;
        }

        let key = chunk_audio_key(language, message_id, chunk_index);
        let start_time = Instant::now();

        match self.storage.store(&key, audio).await {
            Ok(url) => {
                tracing::info!(
                    message_id = message_id,
                    language = language,
                    chunk_index = chunk_index,
                    audio_size = audio.len(),
                    latency_ms = start_time.elapsed().as_millis() as u64,
                    url = %url,
                    "Chunk audio published"
                );
                Some(url)
            }
            Err(e) => {
                tracing::warn!(
                    message_id = message_id,
                    language = language,
                    chunk_index = chunk_index,
                    error = %e,
                    "Failed to store chunk audio"
                );
                None
            }
        }
    }
}
