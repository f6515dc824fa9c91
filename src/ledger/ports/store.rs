//! Store port for balances and the transaction log.

use crate::ledger::domain::{
    Credits, InvalidStatusUpdate, Transaction, TransactionId, TransactionStatus, UserId,
};
use crate::task::domain::TaskId;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for ledger store operations.
pub type LedgerStoreResult<T> = Result<T, LedgerStoreError>;

/// Balance and transaction-log persistence contract.
///
/// Implementations must serialise debit and credit on the same account:
/// read-check-write is a single critical section, never two. Idempotency is
/// only guaranteed within the atomic transition that calls these methods;
/// callers own compensation when a multi-step transition fails midway.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Opens an account with a starting balance.
    ///
    /// A non-zero starting balance is recorded as a completed
    /// `system_credit` transaction so seeded credits stay auditable.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerStoreError::AccountExists`] when the account is
    /// already open.
    async fn open_account(
        &self,
        user: UserId,
        starting_balance: Credits,
    ) -> LedgerStoreResult<Option<TransactionId>>;

    /// Returns the current balance of an account.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerStoreError::UnknownUser`] when the account does not
    /// exist.
    async fn balance_of(&self, user: UserId) -> LedgerStoreResult<Credits>;

    /// Adds credits to an account.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerStoreError::UnknownUser`] for a missing account or
    /// [`LedgerStoreError::BalanceOverflow`] when the balance cannot hold
    /// the result.
    async fn credit(&self, user: UserId, amount: Credits) -> LedgerStoreResult<()>;

    /// Removes credits from an account.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerStoreError::InsufficientFunds`] when the balance
    /// would go negative, or [`LedgerStoreError::UnknownUser`] for a
    /// missing account.
    async fn debit(&self, user: UserId, amount: Credits) -> LedgerStoreResult<()>;

    /// Appends an immutable transaction record.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerStoreError::DuplicateTransaction`] when a record
    /// with the same identifier already exists.
    async fn record_transaction(&self, transaction: Transaction) -> LedgerStoreResult<()>;

    /// Applies the single permitted terminal status update to a record.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerStoreError::TransactionNotFound`] for an unknown
    /// record or [`LedgerStoreError::InvalidTransactionState`] when the
    /// record is already terminal.
    async fn update_transaction_status(
        &self,
        id: TransactionId,
        status: TransactionStatus,
    ) -> LedgerStoreResult<()>;

    /// Returns all records debiting or crediting the given account, newest
    /// first.
    async fn transactions_for(&self, user: UserId) -> LedgerStoreResult<Vec<Transaction>>;

    /// Returns all records settling the given task, newest first.
    async fn transactions_for_task(&self, task: TaskId) -> LedgerStoreResult<Vec<Transaction>>;

    /// Returns every open account with its balance.
    ///
    /// Used by audit and conservation checks; order is unspecified.
    async fn accounts(&self) -> LedgerStoreResult<Vec<(UserId, Credits)>>;
}

/// Errors returned by ledger store implementations.
#[derive(Debug, Clone, Error)]
pub enum LedgerStoreError {
    /// The account is already open.
    #[error("account already exists: {0}")]
    AccountExists(UserId),

    /// The account does not exist.
    #[error("unknown user: {0}")]
    UnknownUser(UserId),

    /// A debit would take the balance negative.
    #[error("insufficient funds for {user}: has {available}, needs {required}")]
    InsufficientFunds {
        /// The account that rejected the debit.
        user: UserId,
        /// Balance at the time of the attempt.
        available: Credits,
        /// Amount the debit required.
        required: Credits,
    },

    /// A credit would overflow the balance.
    #[error("balance overflow for {0}")]
    BalanceOverflow(UserId),

    /// A record with this identifier already exists.
    #[error("duplicate transaction: {0}")]
    DuplicateTransaction(TransactionId),

    /// The transaction record was not found.
    #[error("transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    /// The requested status update is not permitted.
    #[error(transparent)]
    InvalidTransactionState(#[from] InvalidStatusUpdate),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl LedgerStoreError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
