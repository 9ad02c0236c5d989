use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::{
    domain::message::{
        ClaimMode, ClaimOutcome, MessageDispatcher, MessageProcessor, MessageStatusResponse,
        ProcessingStatus, ReprocessQuery, ReprocessResponse, RoomMessagesResponse,
    },
    error::{AppError, AppResult},
    infrastructure::repositories::MessageRepository,
};

const ROOM_MESSAGES_LIMIT: i64 = 50;

pub struct MessageController {
    message_repo: Arc<dyn MessageRepository>,
    processor: Arc<MessageProcessor>,
    dispatcher: Arc<MessageDispatcher>,
}

impl MessageController {
    pub fn new(
        message_repo: Arc<dyn MessageRepository>,
        processor: Arc<MessageProcessor>,
        dispatcher: Arc<MessageDispatcher>,
    ) -> Self {
        Self {
            message_repo,
            processor,
            dispatcher,
        }
    }

    /// GET /api/messages/status/:roomId/:messageId - Processing state of one message
    pub async fn status(
        State(controller): State<Arc<MessageController>>,
        Path((room_id, message_id)): Path<(String, String)>,
    ) -> AppResult<Json<MessageStatusResponse>> {
        let message = controller
            .message_repo
            .find(&room_id, &message_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("message {} in room {}", message_id, room_id)))?;

        Ok(Json(MessageStatusResponse::from(message)))
    }

    /// POST /api/messages/reprocess/:roomId/:messageId - Claim and rerun in the background
    pub async fn reprocess(
        State(controller): State<Arc<MessageController>>,
        Path((room_id, message_id)): Path<(String, String)>,
        Query(query): Query<ReprocessQuery>,
    ) -> AppResult<(StatusCode, Json<ReprocessResponse>)> {
        let mode = ClaimMode::Reprocess { force: query.force };

        match controller.processor.claim(&room_id, &message_id, mode).await? {
            ClaimOutcome::Claimed(lease) => {
                let run = lease.run;
                let processor = controller.processor.clone();
                controller
                    .dispatcher
                    .dispatch(message_id.clone(), async move { processor.run(lease).await });

                Ok((
                    StatusCode::ACCEPTED,
                    Json(ReprocessResponse {
                        message_id,
                        room_id,
                        processing_status: ProcessingStatus::Processing,
                        run,
                    }),
                ))
            }
            ClaimOutcome::Declined(status) => Err(AppError::Conflict(format!(
                "message {} is {}, retry with force=true to take it over",
                message_id,
                status.map(|s| s.as_str()).unwrap_or("unclaimable")
            ))),
        }
    }

    /// GET /api/messages/room/:roomId - Most recent messages with their processing state
    pub async fn room_messages(
        State(controller): State<Arc<MessageController>>,
        Path(room_id): Path<String>,
    ) -> AppResult<Json<RoomMessagesResponse>> {
        let messages = controller
            .message_repo
            .list_recent(&room_id, ROOM_MESSAGES_LIMIT)
            .await?;

        Ok(Json(RoomMessagesResponse { room_id, messages }))
    }
}
