//! Thread-safe in-memory ledger store.

use async_trait::async_trait;
use mockable::{Clock, DefaultClock};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use tracing::debug;

use crate::ledger::domain::{
    Credits, NewTransaction, Transaction, TransactionId, TransactionKind, TransactionStatus,
    UserId,
};
use crate::ledger::ports::{LedgerStore, LedgerStoreError, LedgerStoreResult};
use crate::task::domain::TaskId;

/// In-memory [`LedgerStore`] backed by a single `RwLock`.
///
/// The one write lock is what serialises balance mutations: every
/// read-check-write on an account happens inside a single write section, so
/// concurrent debits cannot both observe the same starting balance. Seed
/// records are stamped with the injected clock.
pub struct InMemoryLedger<C = DefaultClock> {
    state: Arc<RwLock<LedgerState>>,
    clock: Arc<C>,
}

#[derive(Debug, Default)]
struct LedgerState {
    balances: HashMap<UserId, Credits>,
    transactions: Vec<Transaction>,
    by_id: HashMap<TransactionId, usize>,
}

impl InMemoryLedger {
    /// Creates an empty ledger stamping records with the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(DefaultClock))
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> InMemoryLedger<C> {
    /// Creates an empty ledger stamping records with `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<C>) -> Self {
        Self {
            state: Arc::default(),
            clock,
        }
    }

    fn read(&self) -> LedgerStoreResult<std::sync::RwLockReadGuard<'_, LedgerState>> {
        self.state
            .read()
            .map_err(|err| LedgerStoreError::persistence(std::io::Error::other(err.to_string())))
    }

    fn write(&self) -> LedgerStoreResult<std::sync::RwLockWriteGuard<'_, LedgerState>> {
        self.state
            .write()
            .map_err(|err| LedgerStoreError::persistence(std::io::Error::other(err.to_string())))
    }
}

impl<C> Clone for InMemoryLedger<C> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<C> fmt::Debug for InMemoryLedger<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryLedger")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

fn newest_first(mut records: Vec<Transaction>) -> Vec<Transaction> {
    records.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
    records
}

#[async_trait]
impl<C> LedgerStore for InMemoryLedger<C>
where
    C: Clock + Send + Sync,
{
    async fn open_account(
        &self,
        user: UserId,
        starting_balance: Credits,
    ) -> LedgerStoreResult<Option<TransactionId>> {
        let mut state = self.write()?;
        if state.balances.contains_key(&user) {
            return Err(LedgerStoreError::AccountExists(user));
        }
        state.balances.insert(user, starting_balance);

        if starting_balance.is_zero() {
            return Ok(None);
        }

        // Seed credits are auditable like every other movement.
        let seed = Transaction::new(
            NewTransaction {
                from_user: None,
                to_user: Some(user),
                task: None,
                amount: starting_balance,
                kind: TransactionKind::SystemCredit,
                status: TransactionStatus::Completed,
                notes: None,
            },
            &*self.clock,
        )
        .map_err(LedgerStoreError::persistence)?;
        let id = seed.id();
        let index = state.transactions.len();
        state.by_id.insert(id, index);
        state.transactions.push(seed);
        debug!(user = %user, balance = %starting_balance, "account opened");
        Ok(Some(id))
    }

    async fn balance_of(&self, user: UserId) -> LedgerStoreResult<Credits> {
        let state = self.read()?;
        state
            .balances
            .get(&user)
            .copied()
            .ok_or(LedgerStoreError::UnknownUser(user))
    }

    async fn credit(&self, user: UserId, amount: Credits) -> LedgerStoreResult<()> {
        if amount.is_zero() {
            return Ok(());
        }
        let mut state = self.write()?;
        let current = state
            .balances
            .get(&user)
            .copied()
            .ok_or(LedgerStoreError::UnknownUser(user))?;
        let updated = current
            .checked_add(amount)
            .ok_or(LedgerStoreError::BalanceOverflow(user))?;
        state.balances.insert(user, updated);
        debug!(user = %user, amount = %amount, before = %current, after = %updated, "balance credited");
        Ok(())
    }

    async fn debit(&self, user: UserId, amount: Credits) -> LedgerStoreResult<()> {
        if amount.is_zero() {
            return Ok(());
        }
        let mut state = self.write()?;
        let current = state
            .balances
            .get(&user)
            .copied()
            .ok_or(LedgerStoreError::UnknownUser(user))?;
        let updated = current
            .checked_sub(amount)
            .ok_or(LedgerStoreError::InsufficientFunds {
                user,
                available: current,
                required: amount,
            })?;
        state.balances.insert(user, updated);
        debug!(user = %user, amount = %amount, before = %current, after = %updated, "balance debited");
        Ok(())
    }

    async fn record_transaction(&self, transaction: Transaction) -> LedgerStoreResult<()> {
        let mut state = self.write()?;
        let id = transaction.id();
        if state.by_id.contains_key(&id) {
            return Err(LedgerStoreError::DuplicateTransaction(id));
        }
        let index = state.transactions.len();
        state.by_id.insert(id, index);
        state.transactions.push(transaction);
        Ok(())
    }

    async fn update_transaction_status(
        &self,
        id: TransactionId,
        status: TransactionStatus,
    ) -> LedgerStoreResult<()> {
        let mut state = self.write()?;
        let index = *state
            .by_id
            .get(&id)
            .ok_or(LedgerStoreError::TransactionNotFound(id))?;
        let record = state
            .transactions
            .get_mut(index)
            .ok_or(LedgerStoreError::TransactionNotFound(id))?;
        let previous = record.update_status(status)?;
        debug!(
            transaction = %id,
            from = previous.as_str(),
            to = status.as_str(),
            "transaction status updated"
        );
        Ok(())
    }

    async fn transactions_for(&self, user: UserId) -> LedgerStoreResult<Vec<Transaction>> {
        let state = self.read()?;
        let records = state
            .transactions
            .iter()
            .filter(|record| record.from_user() == Some(user) || record.to_user() == Some(user))
            .cloned()
            .collect();
        Ok(newest_first(records))
    }

    async fn transactions_for_task(&self, task: TaskId) -> LedgerStoreResult<Vec<Transaction>> {
        let state = self.read()?;
        let records = state
            .transactions
            .iter()
            .filter(|record| record.task() == Some(task))
            .cloned()
            .collect();
        Ok(newest_first(records))
    }

    async fn accounts(&self) -> LedgerStoreResult<Vec<(UserId, Credits)>> {
        let state = self.read()?;
        Ok(state
            .balances
            .iter()
            .map(|(user, balance)| (*user, *balance))
            .collect())
    }
}
