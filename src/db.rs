//! Database module
//!
//! Schema bootstrap and verification. The schema is plain SQL applied
//! idempotently at startup; `check_schema` then verifies every relation the
//! engines rely on actually exists.

use sqlx::PgPool;

/// Verify database connectivity.
pub async fn verify_connection(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;

    Ok(())
}

/// Create the relations if they don't exist yet. Safe to run on every start.
pub async fn init_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    let statements = [
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id UUID PRIMARY KEY,
            username VARCHAR(255) UNIQUE NOT NULL,
            email VARCHAR(255) UNIQUE NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS accounts (
            id UUID PRIMARY KEY,
            user_id UUID NOT NULL REFERENCES users(id),
            balance NUMERIC(15, 2) NOT NULL DEFAULT 0,
            currency VARCHAR(3) NOT NULL DEFAULT 'RUB',
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS transfers (
            id UUID PRIMARY KEY,
            from_account UUID NOT NULL REFERENCES accounts(id),
            to_account UUID NOT NULL REFERENCES accounts(id),
            amount NUMERIC(15, 2) NOT NULL CHECK (amount > 0),
            description TEXT NOT NULL DEFAULT '',
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS credits (
            id UUID PRIMARY KEY,
            user_id UUID NOT NULL REFERENCES users(id),
            principal NUMERIC(15, 2) NOT NULL,
            interest_rate NUMERIC(8, 4) NOT NULL,
            term_months INTEGER NOT NULL,
            remaining_principal NUMERIC(15, 2) NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS payment_schedule_entries (
            id UUID PRIMARY KEY,
            credit_id UUID NOT NULL REFERENCES credits(id),
            due_date TIMESTAMPTZ NOT NULL,
            amount NUMERIC(15, 2) NOT NULL,
            is_paid BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS payments (
            id UUID PRIMARY KEY,
            credit_id UUID NOT NULL REFERENCES credits(id),
            amount NUMERIC(15, 2) NOT NULL,
            payment_date TIMESTAMPTZ NOT NULL,
            status TEXT NOT NULL CHECK (status IN ('pending', 'completed', 'failed')),
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
        r#"
        CREATE INDEX IF NOT EXISTS idx_accounts_user ON accounts (user_id)
        "#,
        r#"
        CREATE INDEX IF NOT EXISTS idx_transfers_from ON transfers (from_account)
        "#,
        r#"
        CREATE INDEX IF NOT EXISTS idx_transfers_to ON transfers (to_account)
        "#,
        r#"
        CREATE INDEX IF NOT EXISTS idx_credits_user ON credits (user_id)
        "#,
        r#"
        CREATE INDEX IF NOT EXISTS idx_schedule_credit_due
            ON payment_schedule_entries (credit_id, due_date)
        "#,
        r#"
        CREATE INDEX IF NOT EXISTS idx_payments_pending
            ON payments (payment_date) WHERE status = 'pending'
        "#,
    ];

    for statement in statements {
        sqlx::query(statement).execute(pool).await?;
    }

    Ok(())
}

/// Check if required tables exist
pub async fn check_schema(pool: &PgPool) -> Result<bool, sqlx::Error> {
    let required_tables = vec![
        "users",
        "accounts",
        "transfers",
        "credits",
        "payment_schedule_entries",
        "payments",
    ];

    for table in required_tables {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM information_schema.tables
                WHERE table_schema = 'public' AND table_name = $1
            )
            "#,
        )
        .bind(table)
        .fetch_one(pool)
        .await?;

        if !exists {
            tracing::error!("Required table '{}' does not exist", table);
            return Ok(false);
        }
    }

    Ok(true)
}
