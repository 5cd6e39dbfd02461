//! User store
//!
//! Minimal user records: identity plus the email address the notification
//! sink delivers to. Credentials and sessions live outside this system.

use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::User;

#[derive(Debug, Clone)]
pub struct UserStore {
    pool: PgPool,
}

impl UserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, username: &str, email: &str) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, email, created_at)
            VALUES ($1, $2, $3, NOW())
            RETURNING id, username, email, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(email)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn get(&self, user_id: Uuid) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }
}
