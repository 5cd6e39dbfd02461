//! Credit lifecycle integration tests
//!
//! Issuance atomicity, repayment application against schedule and principal,
//! and the overdue sweep. These tests require DATABASE_URL and skip when it
//! is unset.

mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal_macros::dec;

use bankcore::domain::{DomainError, FixedClock, PaymentStatus, SystemClock};
use bankcore::engine::{CreditPolicy, OverdueSweeper, SweepConfig};
use bankcore::error::AppError;
use bankcore::external::{LogNotificationSink, UnavailableRateSource};
use bankcore::store::{CreditRepository, PaymentRepository};
use bankcore::Amount;

use common::{seed_user, setup_test_db, test_ledger, test_ledger_with_rates};

#[tokio::test]
async fn test_issue_credit_persists_credit_schedule_and_placeholders() {
    let Some(pool) = setup_test_db().await else {
        return;
    };

    let user = seed_user(&pool).await;
    let ledger = test_ledger(
        &pool,
        dec!(10),
        CreditPolicy::default(),
        Arc::new(SystemClock),
    );

    let principal = Amount::new(dec!(1000)).unwrap();
    let credit = ledger
        .issue_credit(user.id, &principal, 12)
        .await
        .expect("issuance should succeed");

    // Configured increment on top of the external base rate.
    assert_eq!(credit.interest_rate, dec!(12.5));
    assert_eq!(credit.principal, dec!(1000));
    assert_eq!(credit.remaining_principal, dec!(1000));
    assert_eq!(credit.term_months, 12);

    let schedule = ledger.schedule(credit.id).await.unwrap();
    assert_eq!(schedule.len(), 12);
    assert!(schedule.iter().all(|entry| !entry.is_paid));
    for pair in schedule.windows(2) {
        assert!(pair[0].due_date < pair[1].due_date);
    }
    // Equal annuity amounts across the whole schedule.
    assert!(schedule.iter().all(|e| e.amount == schedule[0].amount));

    let payments = ledger.payments(credit.id).await.unwrap();
    assert_eq!(payments.len(), 12);
    assert!(payments.iter().all(|p| p.status == PaymentStatus::Pending.as_str()));
}

#[tokio::test]
async fn test_issue_credit_zero_rate_splits_principal_evenly() {
    let Some(pool) = setup_test_db().await else {
        return;
    };

    let user = seed_user(&pool).await;
    let policy = CreditPolicy {
        rate_increment: dec!(0),
        minimum_payment: dec!(100),
    };
    let ledger = test_ledger(&pool, dec!(0), policy, Arc::new(SystemClock));

    let principal = Amount::new(dec!(1200)).unwrap();
    let credit = ledger.issue_credit(user.id, &principal, 12).await.unwrap();

    assert_eq!(credit.interest_rate, dec!(0));
    let schedule = ledger.schedule(credit.id).await.unwrap();
    assert_eq!(schedule.len(), 12);
    assert!(schedule.iter().all(|e| e.amount == dec!(100.00)));
}

#[tokio::test]
async fn test_rate_lookup_failure_blocks_issuance() {
    let Some(pool) = setup_test_db().await else {
        return;
    };

    let user = seed_user(&pool).await;
    let ledger = test_ledger_with_rates(
        &pool,
        Arc::new(UnavailableRateSource),
        CreditPolicy::default(),
        Arc::new(SystemClock),
    );

    let principal = Amount::new(dec!(1000)).unwrap();
    let err = ledger.issue_credit(user.id, &principal, 12).await.unwrap_err();

    assert!(matches!(err, AppError::RateLookup(_)));
    // Nothing was persisted.
    assert!(ledger.list_by_user(user.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_apply_payment_decrements_principal_and_marks_oldest_entry() {
    let Some(pool) = setup_test_db().await else {
        return;
    };

    let user = seed_user(&pool).await;
    let ledger = test_ledger(
        &pool,
        dec!(10),
        CreditPolicy::default(),
        Arc::new(SystemClock),
    );

    let principal = Amount::new(dec!(1000)).unwrap();
    let credit = ledger.issue_credit(user.id, &principal, 6).await.unwrap();

    let payment = ledger
        .apply_payment(credit.id, &Amount::new(dec!(200)).unwrap())
        .await
        .expect("payment should apply");
    assert_eq!(payment.status, PaymentStatus::Completed.as_str());
    assert_eq!(payment.amount, dec!(200));

    let after_first = ledger.get_credit(credit.id).await.unwrap();
    assert_eq!(after_first.remaining_principal, dec!(800));

    // Exactly one entry flipped, the earliest-due one, regardless of the
    // amount paid.
    let schedule = ledger.schedule(credit.id).await.unwrap();
    assert!(schedule[0].is_paid);
    assert!(schedule[1..].iter().all(|entry| !entry.is_paid));

    // A second payment flips the next entry in due-date order.
    ledger
        .apply_payment(credit.id, &Amount::new(dec!(150)).unwrap())
        .await
        .unwrap();

    let schedule = ledger.schedule(credit.id).await.unwrap();
    assert!(schedule[0].is_paid);
    assert!(schedule[1].is_paid);
    assert!(schedule[2..].iter().all(|entry| !entry.is_paid));

    let after_second = ledger.get_credit(credit.id).await.unwrap();
    assert_eq!(after_second.remaining_principal, dec!(650));
}

#[tokio::test]
async fn test_payment_bounds_leave_principal_unchanged() {
    let Some(pool) = setup_test_db().await else {
        return;
    };

    let user = seed_user(&pool).await;
    let ledger = test_ledger(
        &pool,
        dec!(10),
        CreditPolicy::default(),
        Arc::new(SystemClock),
    );

    let principal = Amount::new(dec!(1000)).unwrap();
    let credit = ledger.issue_credit(user.id, &principal, 6).await.unwrap();

    let too_small = ledger
        .apply_payment(credit.id, &Amount::new(dec!(50)).unwrap())
        .await
        .unwrap_err();
    assert!(matches!(
        too_small,
        AppError::Domain(DomainError::PaymentTooSmall { .. })
    ));

    let too_large = ledger
        .apply_payment(credit.id, &Amount::new(dec!(2000)).unwrap())
        .await
        .unwrap_err();
    assert!(matches!(
        too_large,
        AppError::Domain(DomainError::PaymentExceedsBalance { .. })
    ));

    let unchanged = ledger.get_credit(credit.id).await.unwrap();
    assert_eq!(unchanged.remaining_principal, dec!(1000));
    let schedule = ledger.schedule(credit.id).await.unwrap();
    assert!(schedule.iter().all(|entry| !entry.is_paid));
}

#[tokio::test]
async fn test_settled_credit_rejects_further_payments() {
    let Some(pool) = setup_test_db().await else {
        return;
    };

    let user = seed_user(&pool).await;
    let ledger = test_ledger(
        &pool,
        dec!(10),
        CreditPolicy::default(),
        Arc::new(SystemClock),
    );

    let principal = Amount::new(dec!(500)).unwrap();
    let credit = ledger.issue_credit(user.id, &principal, 3).await.unwrap();

    // Pay off the whole remaining principal in one go.
    ledger
        .apply_payment(credit.id, &Amount::new(dec!(500)).unwrap())
        .await
        .unwrap();

    let settled = ledger.get_credit(credit.id).await.unwrap();
    assert_eq!(settled.remaining_principal, dec!(0));

    let err = ledger
        .apply_payment(credit.id, &Amount::new(dec!(100)).unwrap())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Domain(DomainError::CreditAlreadySettled(_))
    ));
}

#[tokio::test]
async fn test_overdue_sweep_penalizes_and_fails_payments() {
    let Some(pool) = setup_test_db().await else {
        return;
    };

    let user = seed_user(&pool).await;

    // Issue in the past so the first two schedule months are already due.
    let issued_at = Utc::now() - Duration::days(65);
    let ledger = test_ledger(
        &pool,
        dec!(10),
        CreditPolicy::default(),
        Arc::new(FixedClock(issued_at)),
    );

    let principal = Amount::new(dec!(1000)).unwrap();
    let credit = ledger.issue_credit(user.id, &principal, 12).await.unwrap();

    let monthly = ledger.schedule(credit.id).await.unwrap()[0].amount;

    let sweeper = OverdueSweeper::new(
        pool.clone(),
        SweepConfig::default(),
        Arc::new(LogNotificationSink),
        Arc::new(SystemClock),
    );
    let report = sweeper.run_once().await;
    assert!(report.penalized >= 2);

    // Two overdue placeholders, each penalized at 10% of its amount.
    let after = CreditRepository::new(pool.clone())
        .get(credit.id)
        .await
        .unwrap()
        .unwrap();
    let expected_penalty = (monthly * dec!(0.10)).round_dp(2) * dec!(2);
    assert_eq!(after.remaining_principal, dec!(1000) + expected_penalty);

    let payments = PaymentRepository::new(pool.clone())
        .list_by_credit(credit.id)
        .await
        .unwrap();
    let failed = payments
        .iter()
        .filter(|p| p.status == PaymentStatus::Failed.as_str())
        .count();
    let pending = payments
        .iter()
        .filter(|p| p.status == PaymentStatus::Pending.as_str())
        .count();
    assert_eq!(failed, 2);
    assert_eq!(pending, 10);

    // A second sweep finds nothing new for this credit.
    sweeper.run_once().await;
    let again = CreditRepository::new(pool.clone())
        .get(credit.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(again.remaining_principal, after.remaining_principal);
}
