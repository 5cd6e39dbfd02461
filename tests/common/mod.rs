//! Common test utilities
#![allow(dead_code)]

use std::sync::Arc;

use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use bankcore::domain::{Account, User};
use bankcore::engine::{CreditLedger, CreditPolicy};
use bankcore::external::{LogNotificationSink, RateSource};
use bankcore::store::{AccountStore, UserStore};
use bankcore::Clock;

/// Connect to the test database and make sure the schema exists.
///
/// Returns `None` when DATABASE_URL is not set so database-backed tests can
/// skip instead of failing on machines without Postgres.
pub async fn setup_test_db() -> Option<PgPool> {
    dotenvy::dotenv().ok();

    let database_url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("DATABASE_URL not set; skipping database-backed test");
            return None;
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    bankcore::db::init_schema(&pool)
        .await
        .expect("Failed to initialize schema");

    Some(pool)
}

/// Create a user with unique credentials.
pub async fn seed_user(pool: &PgPool) -> User {
    let suffix = Uuid::new_v4().simple().to_string();
    UserStore::new(pool.clone())
        .create(
            &format!("user_{}", &suffix[..12]),
            &format!("user_{}@test.example", &suffix[..12]),
        )
        .await
        .expect("Failed to seed user")
}

/// Open an account for a user.
pub async fn open_account(pool: &PgPool, user_id: Uuid, currency: &str) -> Account {
    AccountStore::new(pool.clone())
        .create(user_id, currency)
        .await
        .expect("Failed to open account")
}

/// Seed an opening balance directly. Test fixture only; production balances
/// move exclusively through the transfer engine.
pub async fn fund_account(pool: &PgPool, account_id: Uuid, amount: Decimal) {
    sqlx::query("UPDATE accounts SET balance = balance + $2 WHERE id = $1")
        .bind(account_id)
        .bind(amount)
        .execute(pool)
        .await
        .expect("Failed to fund account");
}

pub async fn account_balance(pool: &PgPool, account_id: Uuid) -> Decimal {
    sqlx::query_scalar("SELECT balance FROM accounts WHERE id = $1")
        .bind(account_id)
        .fetch_one(pool)
        .await
        .expect("Failed to read balance")
}

/// Ledger wired with a static rate source and the log notification sink.
pub fn test_ledger(
    pool: &PgPool,
    base_rate: Decimal,
    policy: CreditPolicy,
    clock: Arc<dyn Clock>,
) -> CreditLedger {
    use bankcore::external::StaticRateSource;

    CreditLedger::new(
        pool.clone(),
        policy,
        Arc::new(StaticRateSource::new(base_rate)),
        Arc::new(LogNotificationSink),
        clock,
    )
}

/// Ledger wired with an arbitrary rate source, for failure-path tests.
pub fn test_ledger_with_rates(
    pool: &PgPool,
    rates: Arc<dyn RateSource>,
    policy: CreditPolicy,
    clock: Arc<dyn Clock>,
) -> CreditLedger {
    CreditLedger::new(
        pool.clone(),
        policy,
        rates,
        Arc::new(LogNotificationSink),
        clock,
    )
}
