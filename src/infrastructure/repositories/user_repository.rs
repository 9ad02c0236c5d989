use crate::domain::user::User;
use crate::error::AppResult;
use async_trait::async_trait;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, user_id: &str) -> AppResult<Option<User>>;

    async fn upsert(&self, user: &User) -> AppResult<()>;
}
