//! Transfer engine
//!
//! Moves funds between two accounts as one atomic unit: debit, credit and
//! the immutable transfer record either all land or none do. The sum of all
//! balances is conserved across every successful transfer and unchanged
//! across every failed one.

use std::sync::Arc;

use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{Account, Amount, Clock, DomainError, Transfer};
use crate::error::AppError;
use crate::store::{AccountStore, TransferRepository};

pub struct TransferEngine {
    accounts: AccountStore,
    transfers: TransferRepository,
    pool: PgPool,
    clock: Arc<dyn Clock>,
}

impl TransferEngine {
    pub fn new(pool: PgPool, clock: Arc<dyn Clock>) -> Self {
        Self {
            accounts: AccountStore::new(pool.clone()),
            transfers: TransferRepository::new(pool.clone()),
            pool,
            clock,
        }
    }

    /// Execute an atomic transfer between two accounts.
    ///
    /// All preconditions are checked against row-locked account state before
    /// any mutation, so a failed transfer leaves no observable change.
    pub async fn transfer(
        &self,
        from_account_id: Uuid,
        to_account_id: Uuid,
        amount: &Amount,
        description: &str,
    ) -> Result<Transfer, AppError> {
        if from_account_id == to_account_id {
            return Err(DomainError::SameAccountTransfer.into());
        }

        let mut tx = self.pool.begin().await?;

        // Lock both rows in ascending-id order so concurrent transfers over
        // the same pair cannot deadlock.
        let (first_id, second_id) = if from_account_id < to_account_id {
            (from_account_id, to_account_id)
        } else {
            (to_account_id, from_account_id)
        };

        let first = self
            .accounts
            .lock(&mut tx, first_id)
            .await?
            .ok_or(DomainError::AccountNotFound(first_id))?;
        let second = self
            .accounts
            .lock(&mut tx, second_id)
            .await?
            .ok_or(DomainError::AccountNotFound(second_id))?;

        let (from, to) = if first.id == from_account_id {
            (first, second)
        } else {
            (second, first)
        };

        validate(&from, &to, amount)?;

        self.accounts
            .adjust_balance(&mut tx, from.id, -amount.value())
            .await?;
        self.accounts
            .adjust_balance(&mut tx, to.id, amount.value())
            .await?;

        let transfer = self
            .transfers
            .insert(
                &mut tx,
                from.id,
                to.id,
                amount.value(),
                description,
                self.clock.now(),
            )
            .await?;

        tx.commit().await?;

        tracing::info!(
            transfer_id = %transfer.id,
            from = %from.id,
            to = %to.id,
            amount = %amount,
            "Transfer completed"
        );

        Ok(transfer)
    }

    pub async fn get(&self, transfer_id: Uuid) -> Result<Transfer, AppError> {
        self.transfers
            .get(transfer_id)
            .await?
            .ok_or_else(|| DomainError::TransferNotFound(transfer_id).into())
    }

    /// Transfer history for one account, both directions, newest first.
    pub async fn history(&self, account_id: Uuid) -> Result<Vec<Transfer>, AppError> {
        if self.accounts.get(account_id).await?.is_none() {
            return Err(DomainError::AccountNotFound(account_id).into());
        }
        Ok(self.transfers.list_by_account(account_id).await?)
    }
}

/// Business-rule checks for a transfer, run against locked account state
/// before any balance is touched.
fn validate(from: &Account, to: &Account, amount: &Amount) -> Result<(), DomainError> {
    if from.currency != to.currency {
        return Err(DomainError::CurrencyMismatch {
            from: from.currency.clone(),
            to: to.currency.clone(),
        });
    }

    if from.balance < amount.value() {
        return Err(DomainError::InsufficientFunds {
            required: amount.value(),
            available: from.balance,
        });
    }

    Ok(())
}
