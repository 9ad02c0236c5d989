use super::error::MessageServiceError;
use super::model::{ClaimMode, ClaimOutcome, Message, MessageUpdate, ProcessingLease, ProcessingStatus};
use super::publisher::ChunkAudioPublisher;
use crate::domain::chunking::{chunk_metadata, split_text_into_chunks, DEFAULT_MAX_CHARS_PER_CHUNK};
use crate::domain::speech::{detect_language, SpeechServiceApi};
use crate::domain::voice_profile::VoiceProfileResolver;
use crate::error::AppError;
use crate::infrastructure::repositories::{MessageRepository, RecordingRepository, RoomRepository};
use futures::FutureExt;
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tempfile::NamedTempFile;

const FALLBACK_SOURCE_LANGUAGE: &str = "en";

#[derive(Debug, Clone)]
pub struct ProcessorSettings {
    pub max_chars_per_chunk: usize,
    /// Target used when nobody else in the room has a language
    pub default_target_language: String,
}

impl Default for ProcessorSettings {
    fn default() -> Self {
        Self {
            max_chars_per_chunk: DEFAULT_MAX_CHARS_PER_CHUNK,
            default_target_language: "en".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingSummary {
    pub message_id: String,
    pub total_chunks: usize,
    pub languages: Vec<String>,
    /// Chunks that ended up with a published audio URL, across languages
    pub audio_chunks: usize,
    /// Chunks replaced by the source text after an unexpected failure
    pub failed_chunks: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    Processed(ProcessingSummary),
    /// Another run owns the message or it is already done
    Skipped(Option<ProcessingStatus>),
}

/// Cloning reference for one run. A downloaded recording is deleted when this drops.
enum ReferenceAudio {
    Profile(PathBuf),
    Recording(NamedTempFile),
}

impl ReferenceAudio {
    fn path(&self) -> &Path {
        match self {
            ReferenceAudio::Profile(path) => path,
            ReferenceAudio::Recording(file) => file.path(),
        }
    }
}

/// Drives one message from `processing` to `completed` or `failed`:
/// chunking, per-language translation and synthesis, and streamed persistence.
pub struct MessageProcessor {
    message_repo: Arc<dyn MessageRepository>,
    room_repo: Arc<dyn RoomRepository>,
    speech: Arc<dyn SpeechServiceApi>,
    voice_profiles: Arc<VoiceProfileResolver>,
    publisher: Arc<ChunkAudioPublisher>,
    recordings: Option<Arc<dyn RecordingRepository>>,
    settings: ProcessorSettings,
}

impl MessageProcessor {
    pub fn new(
        message_repo: Arc<dyn MessageRepository>,
        room_repo: Arc<dyn RoomRepository>,
        speech: Arc<dyn SpeechServiceApi>,
        voice_profiles: Arc<VoiceProfileResolver>,
        publisher: Arc<ChunkAudioPublisher>,
        recordings: Option<Arc<dyn RecordingRepository>>,
        settings: ProcessorSettings,
    ) -> Self {
        Self {
            message_repo,
            room_repo,
            speech,
            voice_profiles,
            publisher,
            recordings,
            settings,
        }
    }

    /// Take ownership of a message for one processing run
    pub async fn claim(
        &self,
        room_id: &str,
        message_id: &str,
        mode: ClaimMode,
    ) -> Result<ClaimOutcome, MessageServiceError> {
        let outcome = self.message_repo.try_claim(room_id, message_id, mode).await?;

        match &outcome {
            ClaimOutcome::Claimed(lease) => tracing::info!(
                room_id = room_id,
                message_id = message_id,
                run = lease.run,
                mode = ?mode,
                "Claimed message for processing"
            ),
            ClaimOutcome::Declined(status) => tracing::debug!(
                room_id = room_id,
                message_id = message_id,
                status = ?status,
                mode = ?mode,
                "Message not claimable"
            ),
        }

        Ok(outcome)
    }

    /// Claim then run; a declined claim is not an error
    pub async fn process(
        &self,
        room_id: &str,
        message_id: &str,
        mode: ClaimMode,
    ) -> Result<ProcessOutcome, MessageServiceError> {
        match self.claim(room_id, message_id, mode).await? {
            ClaimOutcome::Claimed(lease) => self.run(lease).await.map(ProcessOutcome::Processed),
            ClaimOutcome::Declined(status) => Ok(ProcessOutcome::Skipped(status)),
        }
    }

    /// Run the pipeline under `lease`. Any error other than a superseded lease
    /// marks the message `failed` before it is returned.
    pub async fn run(&self, lease: ProcessingLease) -> Result<ProcessingSummary, MessageServiceError> {
        let start_time = Instant::now();

        match self.execute(&lease).await {
            Ok(summary) => {
                tracing::info!(
                    room_id = %lease.room_id,
                    message_id = %lease.message_id,
                    total_chunks = summary.total_chunks,
                    languages = ?summary.languages,
                    audio_chunks = summary.audio_chunks,
                    failed_chunks = summary.failed_chunks,
                    latency_ms = start_time.elapsed().as_millis() as u64,
                    "Message processing completed"
                );
                Ok(summary)
            }
            Err(MessageServiceError::Superseded(msg)) => {
                tracing::warn!(
                    room_id = %lease.room_id,
                    message_id = %lease.message_id,
                    run = lease.run,
                    "Processing run superseded by a newer claim, stopping"
                );
                Err(MessageServiceError::Superseded(msg))
            }
            Err(e) => {
                tracing::error!(
                    room_id = %lease.room_id,
                    message_id = %lease.message_id,
                    error = %e,
                    "Message processing failed"
                );

                let update = MessageUpdate::Failed {
                    error: e.to_string(),
                };
                if let Err(write_err) = self.message_repo.apply(&lease, update).await {
                    tracing::error!(
                        message_id = %lease.message_id,
                        error = %write_err,
                        "Failed to record processing failure"
                    );
                }

                Err(e)
            }
        }
    }

    async fn execute(&self, lease: &ProcessingLease) -> Result<ProcessingSummary, MessageServiceError> {
        let message = self
            .message_repo
            .find(&lease.room_id, &lease.message_id)
            .await?
            .ok_or_else(|| MessageServiceError::NotFound(lease.message_id.clone()))?;

        let sender_id = message
            .sender_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| MessageServiceError::Invalid("message has no sender".to_string()))?
            .to_string();

        let text = message.original_text.clone().unwrap_or_default();
        let chunks = split_text_into_chunks(&text, self.settings.max_chars_per_chunk)?;

        let metadata = chunk_metadata(&chunks);
        tracing::info!(
            message_id = %lease.message_id,
            total_chunks = metadata.total_chunks,
            total_length = metadata.total_length,
            average_chunk_length = metadata.average_chunk_length,
            "Message split into chunks"
        );

        let source_language = self.source_language(&message, &text);
        let target_languages = self.target_languages(&lease.room_id, &sender_id).await?;
        tracing::info!(
            message_id = %lease.message_id,
            source_language = %source_language,
            target_languages = ?target_languages,
            "Resolved languages"
        );

        let reference = self.reference_audio(&sender_id, &message).await;
        let reference_path = reference.as_ref().map(ReferenceAudio::path);

        self.write_progress(lease, MessageUpdate::TotalChunks(chunks.len() as i32))
            .await?;

        let mut translations: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut audio_urls: BTreeMap<String, Vec<Option<String>>> = BTreeMap::new();
        let mut summary = ProcessingSummary {
            message_id: lease.message_id.clone(),
            total_chunks: chunks.len(),
            languages: target_languages.clone(),
            audio_chunks: 0,
            failed_chunks: 0,
        };

        for language in &target_languages {
            let mut language_translations = Vec::with_capacity(chunks.len());
            let mut language_audio_urls = Vec::with_capacity(chunks.len());

            for (chunk_index, chunk) in chunks.iter().enumerate() {
                let (translated_text, audio_url) = self
                    .process_chunk(
                        lease,
                        chunk,
                        chunk_index,
                        &source_language,
                        language,
                        reference_path,
                    )
                    .await
                    .unwrap_or_else(|| {
                        summary.failed_chunks += 1;
                        (chunk.clone(), None)
                    });

                if audio_url.is_some() {
                    summary.audio_chunks += 1;
                }
                language_translations.push(translated_text);
                language_audio_urls.push(audio_url);

                self.write_progress(
                    lease,
                    MessageUpdate::ChunkProgress {
                        language: language.clone(),
                        translations: language_translations.clone(),
                        audio_urls: language_audio_urls.clone(),
                        processed_chunks: language_translations.len() as i32,
                    },
                )
                .await?;
            }

            tracing::info!(
                message_id = %lease.message_id,
                language = %language,
                chunks = language_translations.len(),
                with_audio = language_audio_urls.iter().filter(|u| u.is_some()).count(),
                "Language completed"
            );

            translations.insert(language.clone(), language_translations);
            audio_urls.insert(language.clone(), language_audio_urls);
        }

        self.message_repo
            .apply(
                lease,
                MessageUpdate::Completed {
                    translations,
                    audio_urls,
                },
            )
            .await?;

        Ok(summary)
    }

    /// Translate, synthesize and publish one chunk.
    /// `None` means the step panicked and the caller substitutes the source text.
    async fn process_chunk(
        &self,
        lease: &ProcessingLease,
        chunk: &str,
        chunk_index: usize,
        source_language: &str,
        target_language: &str,
        reference_audio: Option<&Path>,
    ) -> Option<(String, Option<String>)> {
        let step = async {
            let result = self
                .speech
                .translate_and_synthesize(chunk, source_language, target_language, reference_audio)
                .await;

            let audio_url = self
                .publisher
                .publish(
                    &result.audio_buffer,
                    target_language,
                    &lease.message_id,
                    chunk_index,
                )
                .await;

            (result.translated_text, audio_url)
        };

        match AssertUnwindSafe(step).catch_unwind().await {
            Ok(output) => Some(output),
            Err(panic) => {
                tracing::error!(
                    message_id = %lease.message_id,
                    language = target_language,
                    chunk_index = chunk_index,
                    panic = %panic_message(panic.as_ref()),
                    "Chunk processing panicked, keeping source text"
                );
                None
            }
        }
    }

    fn source_language(&self, message: &Message, text: &str) -> String {
        if let Some(code) = message
            .original_language_code
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
        {
            return code.to_string();
        }

        match detect_language(text) {
            Some(code) => {
                tracing::debug!(message_id = %message.id, detected = %code, "Detected source language");
                code
            }
            None => FALLBACK_SOURCE_LANGUAGE.to_string(),
        }
    }

    async fn target_languages(
        &self,
        room_id: &str,
        sender_id: &str,
    ) -> Result<Vec<String>, MessageServiceError> {
        let languages = match self.room_repo.find(room_id).await? {
            Some(room) => room.target_languages(sender_id),
            None => {
                tracing::warn!(room_id = room_id, "Room not found, using default target language");
                Vec::new()
            }
        };

        if languages.is_empty() {
            tracing::warn!(
                room_id = room_id,
                default_language = %self.settings.default_target_language,
                "No target languages, using default"
            );
            return Ok(vec![self.settings.default_target_language.clone()]);
        }

        Ok(languages)
    }

    /// Voice profile first, then the sender's own recording. Never fails.
    async fn reference_audio(&self, sender_id: &str, message: &Message) -> Option<ReferenceAudio> {
        if let Some(path) = self.voice_profiles.resolve(sender_id, None).await {
            return Some(ReferenceAudio::Profile(path));
        }

        let url = message.original_audio_url.as_deref()?;
        let recordings = self.recordings.as_ref()?;

        let bytes = match recordings.fetch(url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(
                    message_id = %message.id,
                    error = %e,
                    "Could not download sender recording, synthesizing without cloning"
                );
                return None;
            }
        };

        match stage_recording(&bytes).await {
            Ok(file) => {
                tracing::debug!(
                    message_id = %message.id,
                    size = bytes.len(),
                    "Sender recording staged for voice cloning"
                );
                Some(ReferenceAudio::Recording(file))
            }
            Err(e) => {
                tracing::warn!(message_id = %message.id, error = %e, "Failed to stage sender recording");
                None
            }
        }
    }

    /// Progress writes are best effort, except that a superseded lease aborts the run
    async fn write_progress(
        &self,
        lease: &ProcessingLease,
        update: MessageUpdate,
    ) -> Result<(), MessageServiceError> {
        match self.message_repo.apply(lease, update).await {
            Ok(()) => Ok(()),
            Err(AppError::Conflict(msg)) => Err(MessageServiceError::Superseded(msg)),
            Err(e) => {
                tracing::warn!(
                    message_id = %lease.message_id,
                    error = %e,
                    "Failed to persist progress, continuing"
                );
                Ok(())
            }
        }
    }
}

async fn stage_recording(bytes: &[u8]) -> std::io::Result<NamedTempFile> {
    let file = tempfile::Builder::new()
        .prefix("reference_")
        .suffix(".wav")
        .tempfile()?;
    tokio::fs::write(file.path(), bytes).await?;
    Ok(file)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
