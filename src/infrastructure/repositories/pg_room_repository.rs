use super::room_repository::RoomRepository;
use crate::domain::room::Room;
use crate::error::AppResult;
use crate::infrastructure::db::DbPool;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(sqlx::FromRow)]
struct RoomRow {
    id: String,
    participant_languages: Json<BTreeMap<String, String>>,
    created_at: DateTime<Utc>,
}

impl From<RoomRow> for Room {
    fn from(row: RoomRow) -> Self {
        Room {
            id: row.id,
            participant_languages: row.participant_languages.0,
            created_at: row.created_at,
        }
    }
}

pub struct PgRoomRepository {
    pool: Arc<DbPool>,
}

impl PgRoomRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoomRepository for PgRoomRepository {
    async fn find(&self, room_id: &str) -> AppResult<Option<Room>> {
        let pool = self.pool.as_ref();
        let row = sqlx::query_as::<_, RoomRow>(
            "SELECT id, participant_languages, created_at FROM rooms WHERE id = $1",
        )
        .bind(room_id)
        .fetch_optional(pool)
        .await?;

        Ok(row.map(Room::from))
    }

    async fn list_ids(&self) -> AppResult<Vec<String>> {
        let pool = self.pool.as_ref();
        let ids = sqlx::query_scalar::<_, String>("SELECT id FROM rooms ORDER BY created_at, id")
            .fetch_all(pool)
            .await?;

        Ok(ids)
    }

    async fn upsert(&self, room: &Room) -> AppResult<()> {
        let pool = self.pool.as_ref();
        sqlx::query(
            r#"
            INSERT INTO rooms (id, participant_languages, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET participant_languages = EXCLUDED.participant_languages
            "#,
        )
        .bind(&room.id)
        .bind(Json(&room.participant_languages))
        .bind(room.created_at)
        .execute(pool)
        .await?;

        Ok(())
    }
}
