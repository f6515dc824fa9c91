//! In-memory wiring of the full exchange.

use crate::exchange::ExchangeConfig;
use crate::ledger::adapters::InMemoryLedger;
use crate::ledger::domain::{Credits, Transaction, UserId};
use crate::ledger::ports::{LedgerStore, LedgerStoreError};
use crate::ledger::services::{CreditTransferError, CreditTransferService, TransferRequest};
use crate::realtime::{ConnectionId, OutboundFrame, SessionRegistry, SessionSink};
use crate::task::adapters::memory::{InMemoryDirectory, InMemoryTaskRepository};
use crate::task::domain::{DisputeResolution, TaskId, TaskView, UserProfile};
use crate::task::ports::{DirectoryError, UserDirectory};
use crate::task::services::{
    CommittedTransition, CreateTaskRequest, EscrowError, EscrowService, EventDispatcher,
};
use mockable::DefaultClock;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::info;

/// Errors surfaced by the exchange facade.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// A task lifecycle or escrow operation failed.
    #[error(transparent)]
    Escrow(#[from] EscrowError),

    /// A direct credit transfer failed.
    #[error(transparent)]
    Transfer(#[from] CreditTransferError),

    /// A ledger operation failed.
    #[error(transparent)]
    Ledger(#[from] LedgerStoreError),

    /// A profile operation failed.
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

/// Result type for exchange operations.
pub type ExchangeResult<T> = Result<T, ExchangeError>;

/// The assembled exchange: escrow, ledger, transfers, and live sessions
/// wired over in-memory adapters.
///
/// Transitions commit first and dispatch afterwards, so every frame a
/// client sees describes state that is already persisted.
pub struct TaskExchange {
    config: ExchangeConfig,
    ledger: Arc<InMemoryLedger>,
    directory: Arc<InMemoryDirectory>,
    registry: Arc<SessionRegistry>,
    escrow: EscrowService<InMemoryTaskRepository, InMemoryLedger, InMemoryDirectory, DefaultClock>,
    transfers: CreditTransferService<InMemoryLedger, DefaultClock>,
    dispatcher: EventDispatcher<SessionSink, SessionSink, DefaultClock>,
}

impl TaskExchange {
    /// Assembles an exchange with the given configuration.
    #[must_use]
    pub fn new(config: ExchangeConfig) -> Self {
        let clock = Arc::new(DefaultClock);
        let ledger = Arc::new(InMemoryLedger::with_clock(Arc::clone(&clock)));
        let directory = Arc::new(InMemoryDirectory::new());
        let tasks = Arc::new(InMemoryTaskRepository::new());
        let registry = Arc::new(SessionRegistry::new());
        let sink = Arc::new(SessionSink::new(Arc::clone(&registry)));
        let escrow = EscrowService::new(
            tasks,
            Arc::clone(&ledger),
            Arc::clone(&directory),
            Arc::clone(&clock),
        );
        let transfers = CreditTransferService::new(Arc::clone(&ledger), Arc::clone(&clock));
        let dispatcher = EventDispatcher::new(
            Arc::clone(&sink),
            sink,
            clock,
            config.dispatch_timeout,
        );
        Self {
            config,
            ledger,
            directory,
            registry,
            escrow,
            transfers,
            dispatcher,
        }
    }

    /// Registers a user: a display profile plus a seeded credit account.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::ProfileExists`] or
    /// [`LedgerStoreError::AccountExists`] for a repeat registration.
    pub async fn register_user(
        &self,
        name: impl Into<String>,
        avatar: Option<String>,
    ) -> ExchangeResult<UserId> {
        let user = UserId::new();
        self.directory
            .insert_profile(UserProfile {
                id: user,
                name: name.into(),
                avatar,
            })
            .await?;
        self.ledger
            .open_account(user, self.config.starting_balance)
            .await?;
        info!(user = %user, balance = %self.config.starting_balance, "user registered");
        Ok(user)
    }

    /// Opens a live session for a user and returns its frame receiver.
    #[must_use]
    pub fn connect(&self, user: UserId) -> (ConnectionId, UnboundedReceiver<OutboundFrame>) {
        self.registry.connect(user)
    }

    /// Closes one live session.
    pub fn disconnect(&self, user: UserId, connection: ConnectionId) {
        self.registry.disconnect(user, connection);
    }

    /// Returns every user currently holding a live session.
    #[must_use]
    pub fn online_users(&self) -> Vec<UserId> {
        self.registry.online_users()
    }

    /// Posts a new task and broadcasts it.
    ///
    /// # Errors
    ///
    /// Returns validation and registration errors from the escrow service,
    /// and insufficient funds when the creator cannot cover the price.
    pub async fn create_task(&self, request: CreateTaskRequest) -> ExchangeResult<TaskView> {
        let committed = self.escrow.create_task(request).await?;
        Ok(self.dispatch(committed).await)
    }

    /// Records a request to perform a task.
    ///
    /// # Errors
    ///
    /// Returns escrow errors for unknown tasks, closed tasks,
    /// self-requests, and repeats.
    pub async fn request_task(&self, task: TaskId, user: UserId) -> ExchangeResult<TaskView> {
        let committed = self.escrow.request_task(task, user).await?;
        Ok(self.dispatch(committed).await)
    }

    /// Assigns a task to a requester, escrowing the price.
    ///
    /// # Errors
    ///
    /// Returns escrow errors, including insufficient funds on the
    /// creator's account.
    pub async fn assign_task(
        &self,
        task: TaskId,
        caller: UserId,
        performer: UserId,
    ) -> ExchangeResult<TaskView> {
        let committed = self.escrow.assign_task(task, caller, performer).await?;
        Ok(self.dispatch(committed).await)
    }

    /// Records a completion confirmation, releasing escrow when it is the
    /// second one.
    ///
    /// # Errors
    ///
    /// Returns escrow errors for non-assigned tasks, outsiders, and
    /// repeat confirmations.
    pub async fn confirm_completion(&self, task: TaskId, user: UserId) -> ExchangeResult<TaskView> {
        let committed = self.escrow.confirm_completion(task, user).await?;
        Ok(self.dispatch(committed).await)
    }

    /// Cancels an open task.
    ///
    /// # Errors
    ///
    /// Returns escrow errors for unauthorised callers and non-open tasks.
    pub async fn cancel_task(&self, task: TaskId, caller: UserId) -> ExchangeResult<TaskView> {
        let committed = self.escrow.cancel_task(task, caller).await?;
        Ok(self.dispatch(committed).await)
    }

    /// Deletes an open task outright.
    ///
    /// # Errors
    ///
    /// Returns escrow errors for unauthorised callers and non-open tasks.
    pub async fn delete_task(&self, task: TaskId, caller: UserId) -> ExchangeResult<TaskView> {
        let committed = self.escrow.delete_task(task, caller).await?;
        Ok(self.dispatch(committed).await)
    }

    /// Raises a dispute on an assigned task.
    ///
    /// # Errors
    ///
    /// Returns escrow errors for non-assigned tasks and outsiders.
    pub async fn raise_dispute(
        &self,
        task: TaskId,
        caller: UserId,
        reason: impl Into<String>,
    ) -> ExchangeResult<TaskView> {
        let committed = self.escrow.raise_dispute(task, caller, reason).await?;
        Ok(self.dispatch(committed).await)
    }

    /// Settles a dispute, dividing the escrow per the resolution.
    ///
    /// # Errors
    ///
    /// Returns escrow errors when no dispute is open.
    pub async fn resolve_dispute(
        &self,
        task: TaskId,
        resolution: DisputeResolution,
    ) -> ExchangeResult<TaskView> {
        let committed = self.escrow.resolve_dispute(task, resolution).await?;
        Ok(self.dispatch(committed).await)
    }

    /// Transfers credits directly between two users and notifies the
    /// recipient.
    ///
    /// # Errors
    ///
    /// Returns transfer errors for self-transfers, zero amounts, unknown
    /// accounts, and insufficient funds.
    pub async fn transfer_credits(&self, request: TransferRequest) -> ExchangeResult<Transaction> {
        let record = self.transfers.transfer(request).await?;
        if let (Some(from), Some(to)) = (record.from_user(), record.to_user()) {
            let message = format!("You received {} credits from a transfer", record.amount());
            self.dispatcher.notify_credit(to, message).await;
            info!(from = %from, to = %to, "transfer notification dispatched");
        }
        Ok(record)
    }

    /// Returns the current balance of an account.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerStoreError::UnknownUser`] for an unknown account.
    pub async fn balance_of(&self, user: UserId) -> ExchangeResult<Credits> {
        Ok(self.transfers.balance_of(user).await?)
    }

    /// Returns an account's transaction history, newest first.
    ///
    /// # Errors
    ///
    /// Returns ledger errors when the history cannot be read.
    pub async fn transactions_for(&self, user: UserId) -> ExchangeResult<Vec<Transaction>> {
        Ok(self.transfers.transactions_for(user).await?)
    }

    /// Fetches one task as a joined view.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::TaskNotFound`] for an unknown task.
    pub async fn get_task(&self, task: TaskId) -> ExchangeResult<TaskView> {
        Ok(self.escrow.get_task(task).await?)
    }

    /// Lists open tasks, newest first.
    ///
    /// # Errors
    ///
    /// Returns escrow errors when the listing cannot be built.
    pub async fn list_open(&self) -> ExchangeResult<Vec<TaskView>> {
        Ok(self.escrow.list_open().await?)
    }

    /// Lists tasks posted by `creator`, newest first.
    ///
    /// # Errors
    ///
    /// Returns escrow errors when the listing cannot be built.
    pub async fn list_created_by(&self, creator: UserId) -> ExchangeResult<Vec<TaskView>> {
        Ok(self.escrow.list_created_by(creator).await?)
    }

    /// Lists tasks assigned to `performer`, newest first.
    ///
    /// # Errors
    ///
    /// Returns escrow errors when the listing cannot be built.
    pub async fn list_assigned_to(&self, performer: UserId) -> ExchangeResult<Vec<TaskView>> {
        Ok(self.escrow.list_assigned_to(performer).await?)
    }

    async fn dispatch(&self, committed: CommittedTransition) -> TaskView {
        self.dispatcher
            .dispatch(&committed.view, &committed.events)
            .await;
        committed.view
    }
}

impl Default for TaskExchange {
    fn default() -> Self {
        Self::new(ExchangeConfig::default())
    }
}
