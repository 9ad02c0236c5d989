use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::Pending => "pending",
            ProcessingStatus::Processing => "processing",
            ProcessingStatus::Completed => "completed",
            ProcessingStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ProcessingStatus::Completed | ProcessingStatus::Failed)
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ProcessingStatus::Pending),
            "processing" => Ok(ProcessingStatus::Processing),
            "completed" => Ok(ProcessingStatus::Completed),
            "failed" => Ok(ProcessingStatus::Failed),
            other => Err(format!("unknown processing status: {}", other)),
        }
    }
}

/// Chat message record. Identity and content are written by the chat client;
/// the processing fields are owned by the message processor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub room_id: String,
    #[serde(alias = "senderUID")]
    pub sender_id: Option<String>,
    #[serde(alias = "text")]
    pub original_text: Option<String>,
    pub original_language_code: Option<String>,
    /// Sender's own recording, used as the cloning reference when no voice profile exists
    pub original_audio_url: Option<String>,

    pub processing_status: Option<ProcessingStatus>,
    #[serde(default)]
    pub total_chunks: i32,
    #[serde(default)]
    pub processed_chunks: i32,
    #[serde(default)]
    pub translations: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub audio_urls: BTreeMap<String, Vec<Option<String>>>,
    pub processing_error: Option<String>,
    /// Bumped by every claim; writes from an older run are rejected
    #[serde(default)]
    pub processing_run: i64,
    pub processing_started_at: Option<DateTime<Utc>>,
    pub processing_ended_at: Option<DateTime<Utc>>,
    pub last_updated: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// A freshly sent message in `pending` state
    pub fn new(
        id: impl Into<String>,
        room_id: impl Into<String>,
        sender_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            room_id: room_id.into(),
            sender_id: Some(sender_id.into()),
            original_text: Some(text.into()),
            original_language_code: None,
            original_audio_url: None,
            processing_status: Some(ProcessingStatus::Pending),
            total_chunks: 0,
            processed_chunks: 0,
            translations: BTreeMap::new(),
            audio_urls: BTreeMap::new(),
            processing_error: None,
            processing_run: 0,
            processing_started_at: None,
            processing_ended_at: None,
            last_updated: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_language(mut self, code: impl Into<String>) -> Self {
        self.original_language_code = Some(code.into());
        self
    }

    /// Whether the intake watcher should hand this message to the processor.
    /// This is a fast path only; the claim is what guarantees at-most-once.
    pub fn is_eligible_for_processing(&self) -> bool {
        let status_open = !matches!(
            self.processing_status,
            Some(ProcessingStatus::Processing | ProcessingStatus::Completed | ProcessingStatus::Failed)
        );
        status_open && self.original_text.is_some() && self.sender_id.is_some()
    }
}

/// How a processing run may take ownership of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimMode {
    /// New messages only: status absent or `pending`
    Automatic,
    /// Explicit retry. Without `force` a message already `processing` is left alone.
    Reprocess { force: bool },
}

impl ClaimMode {
    pub fn allows(&self, status: Option<ProcessingStatus>) -> bool {
        match self {
            ClaimMode::Automatic => matches!(status, None | Some(ProcessingStatus::Pending)),
            ClaimMode::Reprocess { force: false } => status != Some(ProcessingStatus::Processing),
            ClaimMode::Reprocess { force: true } => true,
        }
    }
}

/// Ownership token of one processing run over one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingLease {
    pub room_id: String,
    pub message_id: String,
    pub run: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    Claimed(ProcessingLease),
    Declined(Option<ProcessingStatus>),
}

/// Writes a processing run makes to its message
#[derive(Debug, Clone, PartialEq)]
pub enum MessageUpdate {
    TotalChunks(i32),
    /// Replace one language's sequences after a chunk finished
    ChunkProgress {
        language: String,
        translations: Vec<String>,
        audio_urls: Vec<Option<String>>,
        processed_chunks: i32,
    },
    Completed {
        translations: BTreeMap<String, Vec<String>>,
        audio_urls: BTreeMap<String, Vec<Option<String>>>,
    },
    Failed {
        error: String,
    },
}

impl MessageUpdate {
    /// Apply the update to an in-memory record
    pub fn apply_to(self, message: &mut Message, now: DateTime<Utc>) {
        match self {
            MessageUpdate::TotalChunks(total) => {
                message.total_chunks = total;
            }
            MessageUpdate::ChunkProgress {
                language,
                translations,
                audio_urls,
                processed_chunks,
            } => {
                message.translations.insert(language.clone(), translations);
                message.audio_urls.insert(language, audio_urls);
                message.processed_chunks = processed_chunks;
            }
            MessageUpdate::Completed {
                translations,
                audio_urls,
            } => {
                message.translations = translations;
                message.audio_urls = audio_urls;
                message.processing_status = Some(ProcessingStatus::Completed);
                message.processing_ended_at = Some(now);
            }
            MessageUpdate::Failed { error } => {
                message.processing_status = Some(ProcessingStatus::Failed);
                message.processing_error = Some(error);
                message.processing_ended_at = Some(now);
            }
        }
        message.last_updated = Some(now);
    }
}

/// Reset performed by a successful claim
pub fn start_processing(message: &mut Message, now: DateTime<Utc>) {
    message.processing_status = Some(ProcessingStatus::Processing);
    message.processing_run += 1;
    message.total_chunks = 0;
    message.processed_chunks = 0;
    message.processing_error = None;
    message.processing_started_at = Some(now);
    message.processing_ended_at = None;
    message.last_updated = Some(now);
}
