use super::user_repository::UserRepository;
use crate::domain::user::User;
use crate::error::AppResult;
use crate::infrastructure::db::DbPool;
use async_trait::async_trait;
use std::sync::Arc;

pub struct PgUserRepository {
    pool: Arc<DbPool>,
}

impl PgUserRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, user_id: &str) -> AppResult<Option<User>> {
        let pool = self.pool.as_ref();
        let user =
            sqlx::query_as::<_, User>("SELECT id, voice_profile_path FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(pool)
                .await?;

        Ok(user)
    }

    async fn upsert(&self, user: &User) -> AppResult<()> {
        let pool = self.pool.as_ref();
        sqlx::query(
            r#"
            INSERT INTO users (id, voice_profile_path)
            VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE SET voice_profile_path = EXCLUDED.voice_profile_path
            "#,
        )
        .bind(&user.id)
        .bind(&user.voice_profile_path)
        .execute(pool)
        .await?;

        Ok(())
    }
}
