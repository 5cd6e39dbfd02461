//! Payment repository
//!
//! Repayment attempt history. A `pending` row is a future obligation, a
//! `completed` row an applied repayment, a `failed` row an obligation the
//! overdue sweep penalized.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::{Payment, PaymentStatus};

#[derive(Debug, Clone)]
pub struct PaymentRepository {
    pool: PgPool,
}

impl PaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record a payment inside the caller's transaction.
    pub async fn insert(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        credit_id: Uuid,
        amount: Decimal,
        payment_date: DateTime<Utc>,
        status: PaymentStatus,
        created_at: DateTime<Utc>,
    ) -> Result<Payment, sqlx::Error> {
        sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (id, credit_id, amount, payment_date, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, credit_id, amount, payment_date, status, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(credit_id)
        .bind(amount)
        .bind(payment_date)
        .bind(status.as_str())
        .bind(created_at)
        .fetch_one(&mut **tx)
        .await
    }

    pub async fn get(&self, payment_id: Uuid) -> Result<Option<Payment>, sqlx::Error> {
        sqlx::query_as::<_, Payment>(
            r#"
            SELECT id, credit_id, amount, payment_date, status, created_at
            FROM payments
            WHERE id = $1
            "#,
        )
        .bind(payment_id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn list_by_credit(&self, credit_id: Uuid) -> Result<Vec<Payment>, sqlx::Error> {
        sqlx::query_as::<_, Payment>(
            r#"
            SELECT id, credit_id, amount, payment_date, status, created_at
            FROM payments
            WHERE credit_id = $1
            ORDER BY payment_date DESC
            "#,
        )
        .bind(credit_id)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn update_status(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        payment_id: Uuid,
        status: PaymentStatus,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE payments
            SET status = $2
            WHERE id = $1
            "#,
        )
        .bind(payment_id)
        .bind(status.as_str())
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Pending payments whose date has passed: the overdue sweep's input.
    pub async fn find_overdue(&self, now: DateTime<Utc>) -> Result<Vec<Payment>, sqlx::Error> {
        sqlx::query_as::<_, Payment>(
            r#"
            SELECT id, credit_id, amount, payment_date, status, created_at
            FROM payments
            WHERE status = 'pending' AND payment_date < $1
            ORDER BY payment_date ASC
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await
    }
}
