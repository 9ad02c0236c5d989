use crate::domain::message::{ClaimMode, ClaimOutcome, Message, MessageUpdate, ProcessingLease};
use crate::error::AppResult;
use async_trait::async_trait;

/// Storage of chat message records.
///
/// Processing writes go through a lease: `try_claim` atomically moves the
/// message to `processing` and bumps its run counter, and `apply` only
/// succeeds while that run is still current.
#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn find(&self, room_id: &str, message_id: &str) -> AppResult<Option<Message>>;

    /// Most recent messages of a room, newest first
    async fn list_recent(&self, room_id: &str, limit: i64) -> AppResult<Vec<Message>>;

    async fn create(&self, message: &Message) -> AppResult<()>;

    /// Compare-and-set on the processing status.
    ///
    /// # Errors
    /// `AppError::NotFound` when the message does not exist
    async fn try_claim(
        &self,
        room_id: &str,
        message_id: &str,
        mode: ClaimMode,
    ) -> AppResult<ClaimOutcome>;

    /// Write on behalf of a processing run.
    ///
    /// # Errors
    /// `AppError::Conflict` when the lease was superseded by a newer claim
    async fn apply(&self, lease: &ProcessingLease, update: MessageUpdate) -> AppResult<()>;
}
