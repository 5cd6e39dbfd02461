//! Persistent domain records
//!
//! Row types for the six relations: users, accounts, transfers, credits,
//! payment_schedule_entries and payments. Monetary columns are NUMERIC(15,2)
//! and surface as `rust_decimal::Decimal`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A registered user. Carries no credentials; only what the ledger and the
/// notification collaborator need.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// A user-owned balance holder with a currency.
///
/// The balance is mutated only by the transfer engine, always inside a
/// transaction that also records the compensating side.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub user_id: Uuid,
    pub balance: Decimal,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

/// An atomic, immutable movement of funds between two accounts.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Transfer {
    pub id: Uuid,
    pub from_account: Uuid,
    pub to_account: Uuid,
    pub amount: Decimal,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// An installment loan with a computed interest rate and fixed term.
///
/// `remaining_principal` starts equal to `principal`, decreases with every
/// applied payment and grows only through overdue penalties. All payment
/// validation runs against it.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Credit {
    pub id: Uuid,
    pub user_id: Uuid,
    pub principal: Decimal,
    pub interest_rate: Decimal,
    pub term_months: i32,
    pub remaining_principal: Decimal,
    pub created_at: DateTime<Utc>,
}

/// One line of a credit's amortization schedule. Generated once at issuance;
/// `is_paid` is the only field that ever changes.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PaymentScheduleEntry {
    pub id: Uuid,
    pub credit_id: Uuid,
    pub due_date: DateTime<Utc>,
    pub amount: Decimal,
    pub is_paid: bool,
    pub created_at: DateTime<Utc>,
}

/// An attempted or completed repayment event against a credit, distinct from
/// the schedule (schedule = plan; payment = attempt history).
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub credit_id: Uuid,
    pub amount: Decimal,
    pub payment_date: DateTime<Utc>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Lifecycle states of a [`Payment`], stored as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Payment {
    pub fn is_pending(&self) -> bool {
        self.status == PaymentStatus::Pending.as_str()
    }
}
