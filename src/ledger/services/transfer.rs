//! Service layer for direct credit transfers and account queries.

use crate::ledger::domain::{
    Credits, LedgerDomainError, NewTransaction, Transaction, TransactionKind, TransactionStatus,
    UserId,
};
use crate::ledger::ports::{LedgerStore, LedgerStoreError};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Request payload for a direct user-to-user transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    from: UserId,
    to: UserId,
    amount: Credits,
    notes: Option<String>,
}

impl TransferRequest {
    /// Creates a transfer request.
    #[must_use]
    pub const fn new(from: UserId, to: UserId, amount: Credits) -> Self {
        Self {
            from,
            to,
            amount,
            notes: None,
        }
    }

    /// Attaches a free-form annotation to the transfer.
    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Service-level errors for credit transfer operations.
#[derive(Debug, Error)]
pub enum CreditTransferError {
    /// Sender and recipient are the same account.
    #[error("cannot transfer credits to the same account: {0}")]
    SelfTransfer(UserId),

    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] LedgerDomainError),

    /// Ledger store operation failed.
    #[error(transparent)]
    Store(#[from] LedgerStoreError),
}

/// Result type for credit transfer service operations.
pub type CreditTransferResult<T> = Result<T, CreditTransferError>;

/// Direct transfer and account query orchestration.
///
/// Transfers move credits between two balances in one logical step and
/// append a completed `direct_transfer` record; a failed credit to the
/// recipient compensates the sender debit so no partial movement survives.
#[derive(Clone)]
pub struct CreditTransferService<L, C>
where
    L: LedgerStore,
    C: Clock + Send + Sync,
{
    ledger: Arc<L>,
    clock: Arc<C>,
}

impl<L, C> CreditTransferService<L, C>
where
    L: LedgerStore,
    C: Clock + Send + Sync,
{
    /// Creates a new credit transfer service.
    #[must_use]
    pub const fn new(ledger: Arc<L>, clock: Arc<C>) -> Self {
        Self { ledger, clock }
    }

    /// Transfers credits from one account to another.
    ///
    /// # Errors
    ///
    /// Returns [`CreditTransferError::SelfTransfer`] when sender and
    /// recipient match, [`LedgerDomainError::ZeroAmount`] for a zero
    /// amount, and store errors for missing accounts or insufficient
    /// funds.
    pub async fn transfer(&self, request: TransferRequest) -> CreditTransferResult<Transaction> {
        let TransferRequest {
            from,
            to,
            amount,
            notes,
        } = request;

        if from == to {
            return Err(CreditTransferError::SelfTransfer(from));
        }

        let record = Transaction::new(
            NewTransaction {
                from_user: Some(from),
                to_user: Some(to),
                task: None,
                amount,
                kind: TransactionKind::DirectTransfer,
                status: TransactionStatus::Completed,
                notes,
            },
            &*self.clock,
        )?;

        // Both accounts must exist before any balance moves.
        self.ledger.balance_of(to).await?;
        self.ledger.debit(from, amount).await?;
        if let Err(err) = self.ledger.credit(to, amount).await {
            // Hand the debited amount back; the recipient credit did not
            // land, so the transfer never happened.
            self.ledger.credit(from, amount).await?;
            return Err(err.into());
        }
        self.ledger.record_transaction(record.clone()).await?;

        info!(
            from = %from,
            to = %to,
            amount = %amount,
            transaction = %record.id(),
            "credits transferred"
        );
        Ok(record)
    }

    /// Returns the current balance of an account.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerStoreError::UnknownUser`] when the account does not
    /// exist.
    pub async fn balance_of(&self, user: UserId) -> CreditTransferResult<Credits> {
        Ok(self.ledger.balance_of(user).await?)
    }

    /// Returns the transaction history of an account, newest first.
    ///
    /// # Errors
    ///
    /// Returns store errors when the history cannot be read.
    pub async fn transactions_for(&self, user: UserId) -> CreditTransferResult<Vec<Transaction>> {
        Ok(self.ledger.transactions_for(user).await?)
    }
}
