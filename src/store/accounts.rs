//! Account store
//!
//! Owns account rows and their balances. Balances are only ever changed
//! through [`AccountStore::adjust_balance`], which requires an open
//! transaction so a one-sided change can never commit on its own. Callers
//! lock the rows they are about to adjust with [`AccountStore::lock`].

use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::Account;

#[derive(Debug, Clone)]
pub struct AccountStore {
    pool: PgPool,
}

impl AccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a new account with a zero balance.
    pub async fn create(&self, user_id: Uuid, currency: &str) -> Result<Account, sqlx::Error> {
        sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (id, user_id, balance, currency, created_at)
            VALUES ($1, $2, 0, $3, NOW())
            RETURNING id, user_id, balance, currency, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(currency)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn get(&self, account_id: Uuid) -> Result<Option<Account>, sqlx::Error> {
        sqlx::query_as::<_, Account>(
            r#"
            SELECT id, user_id, balance, currency, created_at
            FROM accounts
            WHERE id = $1
            "#,
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Account>, sqlx::Error> {
        sqlx::query_as::<_, Account>(
            r#"
            SELECT id, user_id, balance, currency, created_at
            FROM accounts
            WHERE user_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Load an account with a row lock held for the rest of the transaction.
    /// Concurrent read-modify-write cycles on the same account serialize here.
    pub async fn lock(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        account_id: Uuid,
    ) -> Result<Option<Account>, sqlx::Error> {
        sqlx::query_as::<_, Account>(
            r#"
            SELECT id, user_id, balance, currency, created_at
            FROM accounts
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(account_id)
        .fetch_optional(&mut **tx)
        .await
    }

    /// Apply a signed delta to a balance inside the caller's transaction.
    /// Never commits on its own; the compensating adjustment must land in the
    /// same transaction.
    pub async fn adjust_balance(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        account_id: Uuid,
        delta: Decimal,
    ) -> Result<Account, sqlx::Error> {
        sqlx::query_as::<_, Account>(
            r#"
            UPDATE accounts
            SET balance = balance + $2
            WHERE id = $1
            RETURNING id, user_id, balance, currency, created_at
            "#,
        )
        .bind(account_id)
        .bind(delta)
        .fetch_one(&mut **tx)
        .await
    }
}
