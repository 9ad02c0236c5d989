pub mod dispatcher;
pub mod error;
pub mod model;
pub mod processor;
pub mod publisher;
pub mod registry;
pub mod watcher;

pub use dispatcher::MessageDispatcher;
pub use error::MessageServiceError;
pub use model::{
    start_processing, ClaimMode, ClaimOutcome, Message, MessageUpdate, ProcessingLease,
    ProcessingStatus,
};
pub use processor::{MessageProcessor, ProcessOutcome, ProcessingSummary, ProcessorSettings};
pub use publisher::{chunk_audio_key, ChunkAudioPublisher};
pub use registry::RoomRegistry;
pub use watcher::{MessageWatcher, WatcherStatus};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Response for GET /api/messages/status/:roomId/:messageId
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageStatusResponse {
    pub message_id: String,
    pub room_id: String,
    pub processing_status: Option<ProcessingStatus>,
    pub total_chunks: i32,
    pub processed_chunks: i32,
    pub translations: BTreeMap<String, Vec<String>>,
    pub audio_urls: BTreeMap<String, Vec<Option<String>>>,
    pub processing_error: Option<String>,
    pub processing_started_at: Option<DateTime<Utc>>,
    pub processing_ended_at: Option<DateTime<Utc>>,
}

impl From<Message> for MessageStatusResponse {
    fn from(message: Message) -> Self {
        Self {
            message_id: message.id,
            room_id: message.room_id,
            processing_status: message.processing_status,
            total_chunks: message.total_chunks,
            processed_chunks: message.processed_chunks,
            translations: message.translations,
            audio_urls: message.audio_urls,
            processing_error: message.processing_error,
            processing_started_at: message.processing_started_at,
            processing_ended_at: message.processing_ended_at,
        }
    }
}

/// Query for POST /api/messages/reprocess/:roomId/:messageId
#[derive(Debug, Default, Deserialize)]
pub struct ReprocessQuery {
    #[serde(default)]
    pub force: bool,
}

/// Response for POST /api/messages/reprocess/:roomId/:messageId
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReprocessResponse {
    pub message_id: String,
    pub room_id: String,
    pub processing_status: ProcessingStatus,
    pub run: i64,
}

/// Response for GET /api/messages/room/:roomId
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomMessagesResponse {
    pub room_id: String,
    pub messages: Vec<Message>,
}
