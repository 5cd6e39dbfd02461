//! Credit ledger
//!
//! Owns the credit lifecycle: issuance (credit + schedule + pending payment
//! placeholders in one transaction) and repayment application (completed
//! payment + oldest unpaid schedule entry + principal decrement in one
//! transaction).

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{Amount, Clock, Credit, DomainError, Payment, PaymentScheduleEntry, PaymentStatus};
use crate::error::AppError;
use crate::external::{EventKind, NotificationSink, RateSource};
use crate::store::{CreditRepository, PaymentRepository, UserStore};

use super::scheduler;

/// Upper bound on external collaborator calls (rate lookup, notification).
pub const COLLABORATOR_TIMEOUT: Duration = Duration::from_secs(10);

/// Policy knobs for credit pricing and repayment, read once from config.
#[derive(Debug, Clone)]
pub struct CreditPolicy {
    /// Percentage points added on top of the external base rate.
    pub rate_increment: Decimal,
    /// Smallest accepted repayment, in currency units.
    pub minimum_payment: Decimal,
}

impl Default for CreditPolicy {
    fn default() -> Self {
        Self {
            rate_increment: Decimal::new(25, 1),
            minimum_payment: Decimal::from(100),
        }
    }
}

pub struct CreditLedger {
    credits: CreditRepository,
    payments: PaymentRepository,
    users: UserStore,
    pool: PgPool,
    policy: CreditPolicy,
    rates: Arc<dyn RateSource>,
    notifier: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
}

impl CreditLedger {
    pub fn new(
        pool: PgPool,
        policy: CreditPolicy,
        rates: Arc<dyn RateSource>,
        notifier: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            credits: CreditRepository::new(pool.clone()),
            payments: PaymentRepository::new(pool.clone()),
            users: UserStore::new(pool.clone()),
            pool,
            policy,
            rates,
            notifier,
            clock,
        }
    }

    /// Issue a new installment credit.
    ///
    /// The interest rate is the external base rate plus the configured
    /// increment; a failed or timed-out rate lookup blocks issuance. Credit,
    /// amortization schedule and the matching `pending` payment placeholders
    /// are persisted in one transaction, after which the owning user is
    /// notified best-effort.
    pub async fn issue_credit(
        &self,
        user_id: Uuid,
        principal: &Amount,
        term_months: u32,
    ) -> Result<Credit, AppError> {
        if term_months == 0 {
            return Err(DomainError::InvalidAmount(
                "credit term must be at least one month".to_string(),
            )
            .into());
        }

        let user = self
            .users
            .get(user_id)
            .await?
            .ok_or(DomainError::UserNotFound(user_id))?;

        let base_rate = tokio::time::timeout(COLLABORATOR_TIMEOUT, self.rates.current_rate())
            .await
            .map_err(|_| AppError::RateLookup("rate lookup timed out".to_string()))?
            .map_err(|e| AppError::RateLookup(e.to_string()))?;
        let interest_rate = base_rate + self.policy.rate_increment;

        let now = self.clock.now();
        let schedule =
            scheduler::build_schedule(principal.value(), interest_rate, term_months, now);

        let mut tx = self.pool.begin().await?;

        let credit = self
            .credits
            .insert(
                &mut tx,
                user_id,
                principal.value(),
                interest_rate,
                term_months as i32,
                now,
            )
            .await?;

        for line in &schedule {
            self.credits
                .insert_schedule_entry(&mut tx, credit.id, line.due_date, line.amount, now)
                .await?;
            self.payments
                .insert(
                    &mut tx,
                    credit.id,
                    line.amount,
                    line.due_date,
                    PaymentStatus::Pending,
                    now,
                )
                .await?;
        }

        tx.commit().await?;

        tracing::info!(
            credit_id = %credit.id,
            user_id = %user_id,
            principal = %principal,
            rate = %interest_rate,
            term = term_months,
            "Credit issued"
        );

        let payload = serde_json::json!({
            "credit_id": credit.id,
            "principal": principal.to_string(),
            "interest_rate": interest_rate.to_string(),
            "term_months": term_months,
        });
        match tokio::time::timeout(
            COLLABORATOR_TIMEOUT,
            self.notifier
                .notify(&user.email, EventKind::CreditIssued, payload),
        )
        .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(error = %e, credit_id = %credit.id, "Credit notification failed")
            }
            Err(_) => {
                tracing::warn!(credit_id = %credit.id, "Credit notification timed out")
            }
        }

        Ok(credit)
    }

    /// Apply a repayment against a credit.
    ///
    /// Records a `completed` payment, flips the earliest unpaid schedule
    /// entry (exactly one per call, oldest due date first) and decrements the
    /// remaining principal by the literal amount, all in one transaction with
    /// the credit row locked. The applied amount and the flipped entry's
    /// amount are independent of each other.
    pub async fn apply_payment(
        &self,
        credit_id: Uuid,
        amount: &Amount,
    ) -> Result<Payment, AppError> {
        let mut tx = self.pool.begin().await?;

        let credit = self
            .credits
            .lock(&mut tx, credit_id)
            .await?
            .ok_or(DomainError::CreditNotFound(credit_id))?;

        validate_payment(&credit, amount, self.policy.minimum_payment)?;

        let now = self.clock.now();
        let payment = self
            .payments
            .insert(
                &mut tx,
                credit_id,
                amount.value(),
                now,
                PaymentStatus::Completed,
                now,
            )
            .await?;

        if let Some(entry) = self.credits.lock_earliest_unpaid(&mut tx, credit_id).await? {
            self.credits.mark_entry_paid(&mut tx, entry.id).await?;
        }

        self.credits
            .adjust_remaining(&mut tx, credit_id, -amount.value())
            .await?;

        tx.commit().await?;

        tracing::info!(
            credit_id = %credit_id,
            payment_id = %payment.id,
            amount = %amount,
            "Payment applied"
        );

        Ok(payment)
    }

    pub async fn get_credit(&self, credit_id: Uuid) -> Result<Credit, AppError> {
        self.credits
            .get(credit_id)
            .await?
            .ok_or_else(|| DomainError::CreditNotFound(credit_id).into())
    }

    pub async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Credit>, AppError> {
        Ok(self.credits.list_by_user(user_id).await?)
    }

    pub async fn schedule(&self, credit_id: Uuid) -> Result<Vec<PaymentScheduleEntry>, AppError> {
        self.get_credit(credit_id).await?;
        Ok(self.credits.schedule(credit_id).await?)
    }

    pub async fn payments(&self, credit_id: Uuid) -> Result<Vec<Payment>, AppError> {
        self.get_credit(credit_id).await?;
        Ok(self.payments.list_by_credit(credit_id).await?)
    }
}

/// Business-rule checks for a repayment, run against the locked credit row
/// before any mutation.
fn validate_payment(
    credit: &Credit,
    amount: &Amount,
    minimum_payment: Decimal,
) -> Result<(), DomainError> {
    if credit.remaining_principal <= Decimal::ZERO {
        return Err(DomainError::CreditAlreadySettled(credit.id));
    }

    if amount.value() < minimum_payment {
        return Err(DomainError::PaymentTooSmall {
            minimum: minimum_payment,
            amount: amount.value(),
        });
    }

    if amount.value() > credit.remaining_principal {
        return Err(DomainError::PaymentExceedsBalance {
            remaining: credit.remaining_principal,
            amount: amount.value(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn credit(remaining: Decimal) -> Credit {
        Credit {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            principal: dec!(1000),
            interest_rate: dec!(14.5),
            term_months: 12,
            remaining_principal: remaining,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_validate_payment_ok() {
        let credit = credit(dec!(500));
        let amount = Amount::new(dec!(100)).unwrap();

        assert!(validate_payment(&credit, &amount, dec!(100)).is_ok());
    }

    #[test]
    fn test_validate_payment_too_small() {
        let credit = credit(dec!(500));
        let amount = Amount::new(dec!(50)).unwrap();

        let err = validate_payment(&credit, &amount, dec!(100)).unwrap_err();
        assert!(matches!(
            err,
            DomainError::PaymentTooSmall { minimum, .. } if minimum == dec!(100)
        ));
    }

    #[test]
    fn test_validate_payment_exceeds_balance() {
        let credit = credit(dec!(500));
        let amount = Amount::new(dec!(1000)).unwrap();

        let err = validate_payment(&credit, &amount, dec!(100)).unwrap_err();
        assert!(matches!(
            err,
            DomainError::PaymentExceedsBalance { remaining, .. } if remaining == dec!(500)
        ));
    }

    #[test]
    fn test_validate_payment_exact_remaining_ok() {
        // Paying off the full remaining principal is allowed.
        let credit = credit(dec!(500));
        let amount = Amount::new(dec!(500)).unwrap();

        assert!(validate_payment(&credit, &amount, dec!(100)).is_ok());
    }

    #[test]
    fn test_validate_payment_settled_credit() {
        let credit = credit(Decimal::ZERO);
        let amount = Amount::new(dec!(100)).unwrap();

        let err = validate_payment(&credit, &amount, dec!(100)).unwrap_err();
        assert!(matches!(err, DomainError::CreditAlreadySettled(_)));
    }

    #[test]
    fn test_credit_policy_default() {
        let policy = CreditPolicy::default();
        assert_eq!(policy.rate_increment, dec!(2.5));
        assert_eq!(policy.minimum_payment, dec!(100));
    }
}
