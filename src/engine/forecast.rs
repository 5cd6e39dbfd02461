//! Forecast engine
//!
//! Read-only analytics over accounts, transfer history and credit schedules:
//! projected balance per day, income/expense windows and total credit load.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{Account, Clock, Credit, PaymentScheduleEntry, Transfer};
use crate::error::AppError;
use crate::store::{AccountStore, CreditRepository, TransferRepository};

/// One day of a balance projection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalancePoint {
    pub date: DateTime<Utc>,
    pub balance: Decimal,
}

/// Incoming vs outgoing transfer totals over a window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncomeExpense {
    pub income: Decimal,
    pub expense: Decimal,
}

/// Income/expense totals for one calendar month.
#[derive(Debug, Clone, Serialize)]
pub struct MonthlyStats {
    pub month: u32,
    pub income: Decimal,
    pub expense: Decimal,
}

/// Aggregate debt position across a user's credits.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreditLoad {
    pub total_debt: Decimal,
    /// Average-per-credit heuristic: total debt divided by credit count.
    pub monthly_payment: Decimal,
}

pub struct ForecastEngine {
    accounts: AccountStore,
    transfers: TransferRepository,
    credits: CreditRepository,
    pool: PgPool,
    clock: Arc<dyn Clock>,
}

impl ForecastEngine {
    pub fn new(pool: PgPool, clock: Arc<dyn Clock>) -> Self {
        Self {
            accounts: AccountStore::new(pool.clone()),
            transfers: TransferRepository::new(pool.clone()),
            credits: CreditRepository::new(pool.clone()),
            pool,
            clock,
        }
    }

    /// Project the user's total balance for each of the next `horizon_days`
    /// days. Deterministic for a fixed clock and fixed stored state.
    pub async fn forecast_balance(
        &self,
        user_id: Uuid,
        horizon_days: u32,
    ) -> Result<Vec<BalancePoint>, AppError> {
        let accounts = self.accounts.list_by_user(user_id).await?;
        let transfers = self.transfers.list_for_user(user_id).await?;
        let entries = self.credits.unpaid_entries_for_user(user_id).await?;

        Ok(project(
            self.clock.now(),
            &accounts,
            &transfers,
            &entries,
            horizon_days,
        ))
    }

    /// Sum of incoming vs outgoing transfer amounts within `[start, end]`.
    pub async fn income_expense(
        &self,
        user_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<IncomeExpense, AppError> {
        let income: Decimal = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(amount), 0)
            FROM transfers
            WHERE to_account IN (SELECT id FROM accounts WHERE user_id = $1)
              AND created_at BETWEEN $2 AND $3
            "#,
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        let expense: Decimal = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(amount), 0)
            FROM transfers
            WHERE from_account IN (SELECT id FROM accounts WHERE user_id = $1)
              AND created_at BETWEEN $2 AND $3
            "#,
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        Ok(IncomeExpense { income, expense })
    }

    /// Income/expense totals for each calendar month of `year`.
    pub async fn monthly_stats(
        &self,
        user_id: Uuid,
        year: i32,
    ) -> Result<Vec<MonthlyStats>, AppError> {
        let mut stats = Vec::with_capacity(12);

        for month in 1..=12 {
            let (start, end) = month_window(year, month)
                .ok_or_else(|| AppError::InvalidRequest(format!("invalid year: {}", year)))?;
            let window = self.income_expense(user_id, start, end).await?;
            stats.push(MonthlyStats {
                month,
                income: window.income,
                expense: window.expense,
            });
        }

        Ok(stats)
    }

    /// Total remaining debt and the average-payment heuristic across the
    /// user's credits.
    pub async fn credit_load(&self, user_id: Uuid) -> Result<CreditLoad, AppError> {
        let credits = self.credits.list_by_user(user_id).await?;
        Ok(compute_credit_load(&credits))
    }
}

/// Compute the day-by-day projection.
///
/// Each day starts from the sum of current balances, subtracts every recorded
/// transfer leaving the user's accounts with a timestamp on or before that
/// day (adds those arriving), and subtracts every unpaid schedule entry due
/// by then. The projection assumes all future obligations are paid exactly on
/// time and at exactly their scheduled amount.
pub(crate) fn project(
    now: DateTime<Utc>,
    accounts: &[Account],
    transfers: &[Transfer],
    entries: &[PaymentScheduleEntry],
    horizon_days: u32,
) -> Vec<BalancePoint> {
    let account_ids: HashSet<Uuid> = accounts.iter().map(|a| a.id).collect();
    let current_total: Decimal = accounts.iter().map(|a| a.balance).sum();

    let mut points = Vec::with_capacity(horizon_days as usize);

    for offset in 0..horizon_days {
        let date = now + Duration::days(i64::from(offset));
        let mut balance = current_total;

        for transfer in transfers {
            if transfer.created_at > date {
                continue;
            }
            if account_ids.contains(&transfer.from_account) {
                balance -= transfer.amount;
            } else {
                balance += transfer.amount;
            }
        }

        for entry in entries {
            if entry.due_date > date {
                continue;
            }
            balance -= entry.amount;
        }

        points.push(BalancePoint { date, balance });
    }

    points
}

/// Inclusive `[start, end]` bounds of a calendar month, in UTC.
fn month_window(year: i32, month: u32) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)?
        .and_hms_opt(0, 0, 0)?
        .and_utc();
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    }
    .and_hms_opt(0, 0, 0)?
    .and_utc();

    Some((start, next - Duration::microseconds(1)))
}

/// Aggregate a credit list into the load summary.
fn compute_credit_load(credits: &[Credit]) -> CreditLoad {
    let total_debt: Decimal = credits.iter().map(|c| c.remaining_principal).sum();

    let monthly_payment = if credits.is_empty() {
        Decimal::ZERO
    } else {
        (total_debt / Decimal::from(credits.len() as u64)).round_dp(2)
    };

    CreditLoad {
        total_debt,
        monthly_payment,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;
    use rust_decimal_macros::dec;

    fn ts(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn account(id: Uuid, balance: Decimal) -> Account {
        Account {
            id,
            user_id: Uuid::new_v4(),
            balance,
            currency: "RUB".to_string(),
            created_at: ts("2026-01-01T00:00:00Z"),
        }
    }

    fn transfer(from: Uuid, to: Uuid, amount: Decimal, created_at: &str) -> Transfer {
        Transfer {
            id: Uuid::new_v4(),
            from_account: from,
            to_account: to,
            amount,
            description: String::new(),
            created_at: ts(created_at),
        }
    }

    fn entry(amount: Decimal, due: &str) -> PaymentScheduleEntry {
        PaymentScheduleEntry {
            id: Uuid::new_v4(),
            credit_id: Uuid::new_v4(),
            due_date: ts(due),
            amount,
            is_paid: false,
            created_at: ts("2026-01-01T00:00:00Z"),
        }
    }

    #[test]
    fn test_project_length_and_ascending_dates() {
        let acc = account(Uuid::new_v4(), dec!(1000));
        let now = ts("2026-03-01T00:00:00Z");

        let points = project(now, &[acc], &[], &[], 30);

        assert_eq!(points.len(), 30);
        assert_eq!(points[0].date, now);
        for pair in points.windows(2) {
            assert!(pair[0].date < pair[1].date);
        }
    }

    #[test]
    fn test_project_subtracts_upcoming_obligations() {
        let acc = account(Uuid::new_v4(), dec!(1000));
        let now = ts("2026-03-01T00:00:00Z");
        // Due on day 5 of the horizon.
        let entries = vec![entry(dec!(200), "2026-03-06T00:00:00Z")];

        let points = project(now, &[acc], &[], &entries, 10);

        assert_eq!(points[0].balance, dec!(1000));
        assert_eq!(points[4].balance, dec!(1000));
        assert_eq!(points[5].balance, dec!(800));
        assert_eq!(points[9].balance, dec!(800));
    }

    #[test]
    fn test_project_applies_transfer_direction() {
        let mine = Uuid::new_v4();
        let other = Uuid::new_v4();
        let acc = account(mine, dec!(1000));
        let now = ts("2026-03-01T00:00:00Z");
        let transfers = vec![
            transfer(mine, other, dec!(100), "2026-02-01T00:00:00Z"),
            transfer(other, mine, dec!(40), "2026-02-10T00:00:00Z"),
        ];

        let points = project(now, &[acc], &transfers, &[], 1);

        // Outgoing history subtracts, incoming adds, on top of the current
        // balance that already reflects both.
        assert_eq!(points[0].balance, dec!(940));
    }

    #[test]
    fn test_project_ignores_transfers_beyond_the_day() {
        let mine = Uuid::new_v4();
        let other = Uuid::new_v4();
        let acc = account(mine, dec!(500));
        let now = ts("2026-03-01T00:00:00Z");
        let transfers = vec![transfer(mine, other, dec!(100), "2026-03-10T00:00:00Z")];

        let points = project(now, &[acc], &transfers, &[], 5);

        // The transfer is dated past the whole horizon.
        for point in &points {
            assert_eq!(point.balance, dec!(500));
        }
    }

    #[test]
    fn test_project_is_deterministic() {
        let mine = Uuid::new_v4();
        let other = Uuid::new_v4();
        let accounts = vec![account(mine, dec!(1500))];
        let transfers = vec![transfer(mine, other, dec!(75), "2026-02-20T00:00:00Z")];
        let entries = vec![entry(dec!(88.85), "2026-03-15T00:00:00Z")];
        let now = ts("2026-03-01T00:00:00Z");

        let first = project(now, &accounts, &transfers, &entries, 30);
        let second = project(now, &accounts, &transfers, &entries, 30);

        assert_eq!(first, second);
    }

    #[test]
    fn test_compute_credit_load() {
        let make = |remaining: Decimal| Credit {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            principal: dec!(1000),
            interest_rate: dec!(14.5),
            term_months: 12,
            remaining_principal: remaining,
            created_at: ts("2026-01-01T00:00:00Z"),
        };

        let load = compute_credit_load(&[make(dec!(600)), make(dec!(400))]);
        assert_eq!(load.total_debt, dec!(1000));
        assert_eq!(load.monthly_payment, dec!(500));
    }

    #[test]
    fn test_compute_credit_load_empty() {
        let load = compute_credit_load(&[]);
        assert_eq!(load.total_debt, Decimal::ZERO);
        assert_eq!(load.monthly_payment, Decimal::ZERO);
    }

    #[test]
    fn test_month_window_bounds() {
        let (start, end) = month_window(2026, 2).unwrap();
        assert_eq!(start, ts("2026-02-01T00:00:00Z"));
        assert!(end < ts("2026-03-01T00:00:00Z"));
        assert_eq!(start.month(), 2);
        assert_eq!(end.month(), 2);
    }
}
