//! Overdue sweeper
//!
//! Cancellable periodic task that finds due-but-unpaid obligations and
//! penalizes them. Each payment is processed in its own transaction so one
//! failure never aborts the rest of the batch; the cycle itself runs on an
//! independent timer, unaffected by request traffic.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::interval;

use crate::domain::{Clock, Credit, Payment, PaymentStatus};
use crate::external::{EventKind, NotificationSink};
use crate::store::{CreditRepository, PaymentRepository, UserStore};

use super::ledger::COLLABORATOR_TIMEOUT;

/// Sweep cadence and penalty policy, read once from config.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Time between sweep cycles (default: 12 hours).
    pub interval: Duration,
    /// Penalty as a fraction of the overdue payment amount (default: 10%).
    pub penalty_rate: Decimal,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(12 * 60 * 60),
            penalty_rate: Decimal::new(10, 2),
        }
    }
}

/// Penalty for one overdue payment, rounded to cents.
pub fn penalty_for(amount: Decimal, penalty_rate: Decimal) -> Decimal {
    (amount * penalty_rate).round_dp(2)
}

/// Outcome of one sweep cycle.
#[derive(Debug, Clone)]
pub struct SweepReport {
    pub scanned: usize,
    pub penalized: u64,
    pub errors: Vec<String>,
    pub completed_at: DateTime<Utc>,
}

pub struct OverdueSweeper {
    payments: PaymentRepository,
    credits: CreditRepository,
    users: UserStore,
    pool: PgPool,
    notifier: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
    config: SweepConfig,
}

impl OverdueSweeper {
    pub fn new(
        pool: PgPool,
        config: SweepConfig,
        notifier: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            payments: PaymentRepository::new(pool.clone()),
            credits: CreditRepository::new(pool.clone()),
            users: UserStore::new(pool.clone()),
            pool,
            notifier,
            clock,
            config,
        }
    }

    /// Run one sweep cycle: penalize every pending payment whose date has
    /// passed. Per-payment errors are logged and collected; the batch always
    /// runs to the end.
    pub async fn run_once(&self) -> SweepReport {
        let now = self.clock.now();
        let mut report = SweepReport {
            scanned: 0,
            penalized: 0,
            errors: Vec::new(),
            completed_at: now,
        };

        let overdue = match self.payments.find_overdue(now).await {
            Ok(payments) => payments,
            Err(e) => {
                tracing::error!(error = %e, "Failed to query overdue payments");
                report.errors.push(format!("overdue query: {}", e));
                return report;
            }
        };

        report.scanned = overdue.len();

        for payment in &overdue {
            match self.penalize(payment).await {
                Ok(credit) => {
                    report.penalized += 1;
                    self.notify_overdue(payment, &credit).await;
                }
                Err(e) => {
                    tracing::warn!(
                        payment_id = %payment.id,
                        credit_id = %payment.credit_id,
                        error = %e,
                        "Failed to process overdue payment"
                    );
                    report.errors.push(format!("payment {}: {}", payment.id, e));
                }
            }
        }

        report.completed_at = self.clock.now();

        if report.scanned > 0 {
            tracing::info!(
                scanned = report.scanned,
                penalized = report.penalized,
                errors = report.errors.len(),
                "Overdue sweep cycle finished"
            );
        }

        report
    }

    /// Penalty application and status flip for one payment, as one atomic
    /// step.
    async fn penalize(&self, payment: &Payment) -> Result<Credit, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        // Lock the credit row; penalty accrual must not race payment
        // application on the same credit.
        self.credits
            .lock(&mut tx, payment.credit_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;

        let penalty = penalty_for(payment.amount, self.config.penalty_rate);
        let credit = self
            .credits
            .adjust_remaining(&mut tx, payment.credit_id, penalty)
            .await?;
        self.payments
            .update_status(&mut tx, payment.id, PaymentStatus::Failed)
            .await?;

        tx.commit().await?;

        tracing::debug!(
            payment_id = %payment.id,
            credit_id = %credit.id,
            penalty = %penalty,
            "Overdue payment penalized"
        );

        Ok(credit)
    }

    /// Best-effort overdue notice to the credit's owner.
    async fn notify_overdue(&self, payment: &Payment, credit: &Credit) {
        let user = match self.users.get(credit.user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => return,
            Err(e) => {
                tracing::debug!(error = %e, "Skipping overdue notification");
                return;
            }
        };

        let payload = serde_json::json!({
            "credit_id": credit.id,
            "payment_id": payment.id,
            "amount": payment.amount.to_string(),
            "due_date": payment.payment_date,
        });
        match tokio::time::timeout(
            COLLABORATOR_TIMEOUT,
            self.notifier
                .notify(&user.email, EventKind::PaymentOverdue, payload),
        )
        .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(error = %e, payment_id = %payment.id, "Overdue notification failed")
            }
            Err(_) => {
                tracing::warn!(payment_id = %payment.id, "Overdue notification timed out")
            }
        }
    }

    /// Start the sweep loop in the background. The first cycle fires
    /// immediately, then every `config.interval`. Returns a handle whose
    /// `stop` ends the loop.
    pub fn start(self) -> SweeperHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            tracing::info!(interval_secs = self.config.interval.as_secs(), "Overdue sweeper started");

            let mut ticker = interval(self.config.interval);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.run_once().await;
                    }
                    _ = shutdown_rx.changed() => {
                        tracing::info!("Overdue sweeper stopping");
                        break;
                    }
                }
            }
        });

        SweeperHandle {
            handle,
            shutdown: shutdown_tx,
        }
    }
}

/// Handle for a running sweeper task.
pub struct SweeperHandle {
    handle: JoinHandle<()>,
    shutdown: watch::Sender<bool>,
}

impl SweeperHandle {
    /// Signal the loop to exit and wait for it to finish.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.handle.await;
    }
}
