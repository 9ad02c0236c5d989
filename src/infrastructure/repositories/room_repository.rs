use crate::domain::room::Room;
use crate::error::AppResult;
use async_trait::async_trait;

#[async_trait]
pub trait RoomRepository: Send + Sync {
    async fn find(&self, room_id: &str) -> AppResult<Option<Room>>;

    async fn list_ids(&self) -> AppResult<Vec<String>>;

    async fn upsert(&self, room: &Room) -> AppResult<()>;
}
