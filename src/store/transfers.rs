//! Transfer repository
//!
//! Immutable transfer records. Inserts happen only inside the transfer
//! engine's transaction, next to the two balance adjustments they describe.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::Transfer;

#[derive(Debug, Clone)]
pub struct TransferRepository {
    pool: PgPool,
}

impl TransferRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record a completed transfer inside the caller's transaction.
    pub async fn insert(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        from_account: Uuid,
        to_account: Uuid,
        amount: Decimal,
        description: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Transfer, sqlx::Error> {
        sqlx::query_as::<_, Transfer>(
            r#"
            INSERT INTO transfers (id, from_account, to_account, amount, description, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, from_account, to_account, amount, description, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(from_account)
        .bind(to_account)
        .bind(amount)
        .bind(description)
        .bind(created_at)
        .fetch_one(&mut **tx)
        .await
    }

    pub async fn get(&self, transfer_id: Uuid) -> Result<Option<Transfer>, sqlx::Error> {
        sqlx::query_as::<_, Transfer>(
            r#"
            SELECT id, from_account, to_account, amount, description, created_at
            FROM transfers
            WHERE id = $1
            "#,
        )
        .bind(transfer_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// All transfers touching an account, newest first.
    pub async fn list_by_account(&self, account_id: Uuid) -> Result<Vec<Transfer>, sqlx::Error> {
        sqlx::query_as::<_, Transfer>(
            r#"
            SELECT id, from_account, to_account, amount, description, created_at
            FROM transfers
            WHERE from_account = $1 OR to_account = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await
    }

    /// All transfers touching any of a user's accounts, on either side.
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Transfer>, sqlx::Error> {
        sqlx::query_as::<_, Transfer>(
            r#"
            SELECT id, from_account, to_account, amount, description, created_at
            FROM transfers
            WHERE from_account IN (SELECT id FROM accounts WHERE user_id = $1)
               OR to_account IN (SELECT id FROM accounts WHERE user_id = $1)
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }
}
