use super::message_repository::MessageRepository;
use crate::domain::message::{ClaimMode, ClaimOutcome, Message, MessageUpdate, ProcessingLease};
use crate::error::{AppError, AppResult};
use crate::infrastructure::db::DbPool;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use std::collections::BTreeMap;
use std::sync::Arc;

const MESSAGE_COLUMNS: &str = "id, room_id, sender_id, original_text, original_language_code, \
    original_audio_url, processing_status, total_chunks, processed_chunks, translations, \
    audio_urls, processing_error, processing_run, processing_started_at, processing_ended_at, \
    last_updated, created_at";

/// Current-run guard appended to every processing write
const LEASE_GUARD: &str = "room_id = $1 AND id = $2 AND processing_run = $3 \
    AND processing_status = 'processing'";

#[derive(sqlx::FromRow)]
struct MessageRow {
    id: String,
    room_id: String,
    sender_id: Option<String>,
    original_text: Option<String>,
    original_language_code: Option<String>,
    original_audio_url: Option<String>,
    processing_status: Option<String>,
    total_chunks: i32,
    processed_chunks: i32,
    translations: Json<BTreeMap<String, Vec<String>>>,
    audio_urls: Json<BTreeMap<String, Vec<Option<String>>>>,
    processing_error: Option<String>,
    processing_run: i64,
    processing_started_at: Option<DateTime<Utc>>,
    processing_ended_at: Option<DateTime<Utc>>,
    last_updated: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<MessageRow> for Message {
    type Error = AppError;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        let processing_status = row
            .processing_status
            .map(|s| s.parse())
            .transpose()
            .map_err(AppError::Internal)?;

        Ok(Message {
            id: row.id,
            room_id: row.room_id,
            sender_id: row.sender_id,
            original_text: row.original_text,
            original_language_code: row.original_language_code,
            original_audio_url: row.original_audio_url,
            processing_status,
            total_chunks: row.total_chunks,
            processed_chunks: row.processed_chunks,
            translations: row.translations.0,
            audio_urls: row.audio_urls.0,
            processing_error: row.processing_error,
            processing_run: row.processing_run,
            processing_started_at: row.processing_started_at,
            processing_ended_at: row.processing_ended_at,
            last_updated: row.last_updated,
            created_at: row.created_at,
        })
    }
}

pub struct PgMessageRepository {
    pool: Arc<DbPool>,
}

impl PgMessageRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }

    fn claim_condition(mode: ClaimMode) -> &'static str {
        match mode {
            ClaimMode::Automatic => "(processing_status IS NULL OR processing_status = 'pending')",
            ClaimMode::Reprocess { force: false } => {
                "(processing_status IS NULL OR processing_status <> 'processing')"
            }
            ClaimMode::Reprocess { force: true } => "TRUE",
        }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn find(&self, room_id: &str, message_id: &str) -> AppResult<Option<Message>> {
        let pool = self.pool.as_ref();
        let sql = format!(
            "SELECT {} FROM messages WHERE room_id = $1 AND id = $2",
            MESSAGE_COLUMNS
        );
        let row = sqlx::query_as::<_, MessageRow>(&sql)
            .bind(room_id)
            .bind(message_id)
            .fetch_optional(pool)
            .await?;

        row.map(Message::try_from).transpose()
    }

    async fn list_recent(&self, room_id: &str, limit: i64) -> AppResult<Vec<Message>> {
        let pool = self.pool.as_ref();
        let sql = format!(
            "SELECT {} FROM messages WHERE room_id = $1 ORDER BY created_at DESC, id DESC LIMIT $2",
            MESSAGE_COLUMNS
        );
        let rows = sqlx::query_as::<_, MessageRow>(&sql)
            .bind(room_id)
            .bind(limit)
            .fetch_all(pool)
            .await?;

        rows.into_iter().map(Message::try_from).collect()
    }

    async fn create(&self, message: &Message) -> AppResult<()> {
        let pool = self.pool.as_ref();
        sqlx::query(
            r#"
            INSERT INTO messages (id, room_id, sender_id, original_text, original_language_code,
                original_audio_url, processing_status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(&message.id)
        .bind(&message.room_id)
        .bind(&message.sender_id)
        .bind(&message.original_text)
        .bind(&message.original_language_code)
        .bind(&message.original_audio_url)
        .bind(message.processing_status.map(|s| s.as_str()))
        .bind(message.created_at)
        .execute(pool)
        .await?;

        Ok(())
    }

    async fn try_claim(
        &self,
        room_id: &str,
        message_id: &str,
        mode: ClaimMode,
    ) -> AppResult<ClaimOutcome> {
        let pool = self.pool.as_ref();
        let sql = format!(
            r#"
            UPDATE messages
            SET processing_status = 'processing',
                processing_run = processing_run + 1,
                total_chunks = 0,
                processed_chunks = 0,
                processing_error = NULL,
                processing_started_at = NOW(),
                processing_ended_at = NULL,
                last_updated = NOW()
            WHERE room_id = $1 AND id = $2 AND {}
            RETURNING processing_run
            "#,
            Self::claim_condition(mode)
        );

        let run: Option<i64> = sqlx::query_scalar(&sql)
            .bind(room_id)
            .bind(message_id)
            .fetch_optional(pool)
            .await?;

        if let Some(run) = run {
            return Ok(ClaimOutcome::Claimed(ProcessingLease {
                room_id: room_id.to_string(),
                message_id: message_id.to_string(),
                run,
            }));
        }

        let status: Option<Option<String>> = sqlx::query_scalar(
            "SELECT processing_status FROM messages WHERE room_id = $1 AND id = $2",
        )
        .bind(room_id)
        .bind(message_id)
        .fetch_optional(pool)
        .await?;

        match status {
            None => Err(AppError::NotFound(format!("message {}/{}", room_id, message_id))),
            Some(status) => Ok(ClaimOutcome::Declined(
                status.and_then(|s| s.parse().ok()),
            )),
        }
    }

    async fn apply(&self, lease: &ProcessingLease, update: MessageUpdate) -> AppResult<()> {
        let pool = self.pool.as_ref();

        let result = match update {
            MessageUpdate::TotalChunks(total) => {
                let sql = format!(
                    "UPDATE messages SET total_chunks = $4, last_updated = NOW() WHERE {}",
                    LEASE_GUARD
                );
                sqlx::query(&sql)
                    .bind(&lease.room_id)
                    .bind(&lease.message_id)
                    .bind(lease.run)
                    .bind(total)
                    .execute(pool)
                    .await?
            }
            MessageUpdate::ChunkProgress {
                language,
                translations,
                audio_urls,
                processed_chunks,
            } => {
                let sql = format!(
                    r#"
                    UPDATE messages
                    SET translations = jsonb_set(translations, ARRAY[$4::text], $5::jsonb),
                        audio_urls = jsonb_set(audio_urls, ARRAY[$4::text], $6::jsonb),
                        processed_chunks = $7,
                        last_updated = NOW()
                    WHERE {}
                    "#,
                    LEASE_GUARD
                );
                sqlx::query(&sql)
                    .bind(&lease.room_id)
                    .bind(&lease.message_id)
                    .bind(lease.run)
                    .bind(language)
                    .bind(Json(translations))
                    .bind(Json(audio_urls))
                    .bind(processed_chunks)
                    .execute(pool)
                    .await?
            }
            MessageUpdate::Completed {
                translations,
                audio_urls,
            } => {
                let sql = format!(
                    r#"
                    UPDATE messages
                    SET translations = $4,
                        audio_urls = $5,
                        processing_status = 'completed',
                        processing_ended_at = NOW(),
                        last_updated = NOW()
                    WHERE {}
                    "#,
                    LEASE_GUARD
                );
                sqlx::query(&sql)
                    .bind(&lease.room_id)
                    .bind(&lease.message_id)
                    .bind(lease.run)
                    .bind(Json(translations))
                    .bind(Json(audio_urls))
                    .execute(pool)
                    .await?
            }
            MessageUpdate::Failed { error } => {
                let sql = format!(
                    r#"
                    UPDATE messages
                    SET processing_status = 'failed',
                        processing_error = $4,
                        processing_ended_at = NOW(),
                        last_updated = NOW()
                    WHERE {}
                    "#,
                    LEASE_GUARD
                );
                sqlx::query(&sql)
                    .bind(&lease.room_id)
                    .bind(&lease.message_id)
                    .bind(lease.run)
                    .bind(error)
                    .execute(pool)
                    .await?
            }
        };

        if result.rows_affected() == 0 {
            return Err(AppError::Conflict(format!(
                "run {} of message {} is no longer current",
                lease.run, lease.message_id
            )));
        }

        Ok(())
    }
}
