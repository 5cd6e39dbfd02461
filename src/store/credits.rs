//! Credit repository
//!
//! Credit rows plus their amortization schedules. Issuance writes the credit
//! and every schedule entry in one transaction owned by the ledger; principal
//! adjustments always run against a previously locked row.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::{Credit, PaymentScheduleEntry};

#[derive(Debug, Clone)]
pub struct CreditRepository {
    pool: PgPool,
}

impl CreditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new credit. Remaining principal starts at the full amount.
    pub async fn insert(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        principal: Decimal,
        interest_rate: Decimal,
        term_months: i32,
        created_at: DateTime<Utc>,
    ) -> Result<Credit, sqlx::Error> {
        sqlx::query_as::<_, Credit>(
            r#"
            INSERT INTO credits
                (id, user_id, principal, interest_rate, term_months, remaining_principal, created_at)
            VALUES ($1, $2, $3, $4, $5, $3, $6)
            RETURNING id, user_id, principal, interest_rate, term_months, remaining_principal, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(principal)
        .bind(interest_rate)
        .bind(term_months)
        .bind(created_at)
        .fetch_one(&mut **tx)
        .await
    }

    /// Insert one amortization schedule line inside the issuance transaction.
    pub async fn insert_schedule_entry(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        credit_id: Uuid,
        due_date: DateTime<Utc>,
        amount: Decimal,
        created_at: DateTime<Utc>,
    ) -> Result<PaymentScheduleEntry, sqlx::Error> {
        sqlx::query_as::<_, PaymentScheduleEntry>(
            r#"
            INSERT INTO payment_schedule_entries
                (id, credit_id, due_date, amount, is_paid, created_at)
            VALUES ($1, $2, $3, $4, FALSE, $5)
            RETURNING id, credit_id, due_date, amount, is_paid, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(credit_id)
        .bind(due_date)
        .bind(amount)
        .bind(created_at)
        .fetch_one(&mut **tx)
        .await
    }

    pub async fn get(&self, credit_id: Uuid) -> Result<Option<Credit>, sqlx::Error> {
        sqlx::query_as::<_, Credit>(
            r#"
            SELECT id, user_id, principal, interest_rate, term_months, remaining_principal, created_at
            FROM credits
            WHERE id = $1
            "#,
        )
        .bind(credit_id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Credit>, sqlx::Error> {
        sqlx::query_as::<_, Credit>(
            r#"
            SELECT id, user_id, principal, interest_rate, term_months, remaining_principal, created_at
            FROM credits
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Load a credit with a row lock held for the rest of the transaction.
    /// Payment application and penalty accrual serialize on this lock.
    pub async fn lock(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        credit_id: Uuid,
    ) -> Result<Option<Credit>, sqlx::Error> {
        sqlx::query_as::<_, Credit>(
            r#"
            SELECT id, user_id, principal, interest_rate, term_months, remaining_principal, created_at
            FROM credits
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(credit_id)
        .fetch_optional(&mut **tx)
        .await
    }

    /// Apply a signed delta to the remaining principal. Negative for payment
    /// application, positive for penalty accrual.
    pub async fn adjust_remaining(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        credit_id: Uuid,
        delta: Decimal,
    ) -> Result<Credit, sqlx::Error> {
        sqlx::query_as::<_, Credit>(
            r#"
            UPDATE credits
            SET remaining_principal = remaining_principal + $2
            WHERE id = $1
            RETURNING id, user_id, principal, interest_rate, term_months, remaining_principal, created_at
            "#,
        )
        .bind(credit_id)
        .bind(delta)
        .fetch_one(&mut **tx)
        .await
    }

    /// Full schedule for a credit, due-date ascending.
    pub async fn schedule(&self, credit_id: Uuid) -> Result<Vec<PaymentScheduleEntry>, sqlx::Error> {
        sqlx::query_as::<_, PaymentScheduleEntry>(
            r#"
            SELECT id, credit_id, due_date, amount, is_paid, created_at
            FROM payment_schedule_entries
            WHERE credit_id = $1
            ORDER BY due_date ASC
            "#,
        )
        .bind(credit_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Lock the earliest unpaid schedule entry of a credit, if any. The lock
    /// keeps two concurrent payments from flipping the same entry.
    pub async fn lock_earliest_unpaid(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        credit_id: Uuid,
    ) -> Result<Option<PaymentScheduleEntry>, sqlx::Error> {
        sqlx::query_as::<_, PaymentScheduleEntry>(
            r#"
            SELECT id, credit_id, due_date, amount, is_paid, created_at
            FROM payment_schedule_entries
            WHERE credit_id = $1 AND is_paid = FALSE
            ORDER BY due_date ASC
            LIMIT 1
            FOR UPDATE
            "#,
        )
        .bind(credit_id)
        .fetch_optional(&mut **tx)
        .await
    }

    /// Flip a schedule entry to paid. `is_paid` is the entry's only mutable
    /// field.
    pub async fn mark_entry_paid(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        entry_id: Uuid,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE payment_schedule_entries
            SET is_paid = TRUE
            WHERE id = $1
            "#,
        )
        .bind(entry_id)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Unpaid schedule entries across all of a user's credits, for
    /// forecasting.
    pub async fn unpaid_entries_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<PaymentScheduleEntry>, sqlx::Error> {
        sqlx::query_as::<_, PaymentScheduleEntry>(
            r#"
            SELECT e.id, e.credit_id, e.due_date, e.amount, e.is_paid, e.created_at
            FROM payment_schedule_entries e
            JOIN credits c ON e.credit_id = c.id
            WHERE c.user_id = $1 AND e.is_paid = FALSE
            ORDER BY e.due_date ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }
}
