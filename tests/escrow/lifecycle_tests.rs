//! Happy-path lifecycle and authorisation edges over the full exchange.

use crate::escrow::helpers::{exchange, fence_task, register, STARTING_BALANCE};
use creata::exchange::{ExchangeError, TaskExchange};
use creata::ledger::domain::{Credits, TransactionKind, TransactionStatus};
use creata::ledger::ports::LedgerStoreError;
use creata::task::domain::{TaskDomainError, TaskStatus};
use creata::task::services::EscrowError;
use eyre::{ensure, Result};
use rstest::rstest;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn registration_seeds_the_starting_balance(exchange: TaskExchange) -> Result<()> {
    let user = register(&exchange, "Ada").await?;
    let balance = exchange.balance_of(user).await?;
    ensure!(
        balance == Credits::new(STARTING_BALANCE),
        "expected seeded balance, got {balance}"
    );

    let history = exchange.transactions_for(user).await?;
    ensure!(history.len() == 1, "expected only the seed record");
    let seed = history.first().expect("seed record");
    ensure!(seed.kind() == TransactionKind::SystemCredit, "seed kind");
    ensure!(seed.status() == TransactionStatus::Completed, "seed status");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn the_full_lifecycle_pays_the_performer(exchange: TaskExchange) -> Result<()> {
    let creator = register(&exchange, "Ada").await?;
    let performer = register(&exchange, "Brin").await?;

    let view = exchange.create_task(fence_task(creator, 10)).await?;
    ensure!(view.status == TaskStatus::Open, "fresh task is open");

    exchange.request_task(view.id, performer).await?;
    let assigned = exchange.assign_task(view.id, creator, performer).await?;
    ensure!(assigned.status == TaskStatus::Assigned, "task assigned");
    ensure!(
        exchange.balance_of(creator).await? == Credits::new(40),
        "price escrowed from creator"
    );

    exchange.confirm_completion(view.id, performer).await?;
    ensure!(
        exchange.balance_of(performer).await? == Credits::new(50),
        "one confirmation releases nothing"
    );

    let completed = exchange.confirm_completion(view.id, creator).await?;
    ensure!(completed.status == TaskStatus::Completed, "task completed");
    ensure!(
        exchange.balance_of(performer).await? == Credits::new(60),
        "escrow released to performer"
    );
    ensure!(
        exchange.balance_of(creator).await? == Credits::new(40),
        "creator paid exactly the price"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn listings_track_the_lifecycle(exchange: TaskExchange) -> Result<()> {
    let creator = register(&exchange, "Ada").await?;
    let performer = register(&exchange, "Brin").await?;

    let view = exchange.create_task(fence_task(creator, 10)).await?;
    ensure!(exchange.list_open().await?.len() == 1, "one open task");
    ensure!(
        exchange.list_created_by(creator).await?.len() == 1,
        "creator listing"
    );

    exchange.request_task(view.id, performer).await?;
    exchange.assign_task(view.id, creator, performer).await?;
    ensure!(exchange.list_open().await?.is_empty(), "no longer open");
    ensure!(
        exchange.list_assigned_to(performer).await?.len() == 1,
        "performer listing"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn a_creator_cannot_request_their_own_task(exchange: TaskExchange) -> Result<()> {
    let creator = register(&exchange, "Ada").await?;
    let view = exchange.create_task(fence_task(creator, 10)).await?;

    let result = exchange.request_task(view.id, creator).await;
    ensure!(
        matches!(
            result,
            Err(ExchangeError::Escrow(EscrowError::Domain(
                TaskDomainError::SelfRequest { .. }
            )))
        ),
        "self-request must be rejected"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn confirmations_from_outsiders_are_rejected(exchange: TaskExchange) -> Result<()> {
    let creator = register(&exchange, "Ada").await?;
    let performer = register(&exchange, "Brin").await?;
    let outsider = register(&exchange, "Cas").await?;

    let view = exchange.create_task(fence_task(creator, 10)).await?;
    exchange.request_task(view.id, performer).await?;
    exchange.assign_task(view.id, creator, performer).await?;

    let result = exchange.confirm_completion(view.id, outsider).await;
    ensure!(
        matches!(
            result,
            Err(ExchangeError::Escrow(EscrowError::Domain(
                TaskDomainError::NotAuthorized { .. }
            )))
        ),
        "outsider confirmation must be rejected"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn repeat_confirmation_is_rejected_but_state_survives(exchange: TaskExchange) -> Result<()> {
    let creator = register(&exchange, "Ada").await?;
    let performer = register(&exchange, "Brin").await?;

    let view = exchange.create_task(fence_task(creator, 10)).await?;
    exchange.request_task(view.id, performer).await?;
    exchange.assign_task(view.id, creator, performer).await?;
    exchange.confirm_completion(view.id, performer).await?;

    let repeat = exchange.confirm_completion(view.id, performer).await;
    ensure!(
        matches!(
            repeat,
            Err(ExchangeError::Escrow(EscrowError::Domain(
                TaskDomainError::AlreadyConfirmed { .. }
            )))
        ),
        "repeat confirmation must be rejected"
    );

    // The earlier confirmation still counts; the creator's completes it.
    let completed = exchange.confirm_completion(view.id, creator).await?;
    ensure!(completed.status == TaskStatus::Completed, "task completed");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn cancelled_tasks_accept_no_further_requests(exchange: TaskExchange) -> Result<()> {
    let creator = register(&exchange, "Ada").await?;
    let performer = register(&exchange, "Brin").await?;

    let view = exchange.create_task(fence_task(creator, 10)).await?;
    let cancelled = exchange.cancel_task(view.id, creator).await?;
    ensure!(cancelled.status == TaskStatus::Cancelled, "task cancelled");

    let result = exchange.request_task(view.id, performer).await;
    ensure!(
        matches!(
            result,
            Err(ExchangeError::Escrow(EscrowError::Domain(
                TaskDomainError::NotOpen { .. }
            )))
        ),
        "requests on cancelled tasks must be rejected"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn deleting_an_assigned_task_is_rejected(exchange: TaskExchange) -> Result<()> {
    let creator = register(&exchange, "Ada").await?;
    let performer = register(&exchange, "Brin").await?;

    let view = exchange.create_task(fence_task(creator, 10)).await?;
    exchange.request_task(view.id, performer).await?;
    exchange.assign_task(view.id, creator, performer).await?;

    let result = exchange.delete_task(view.id, creator).await;
    ensure!(
        matches!(
            result,
            Err(ExchangeError::Escrow(EscrowError::Domain(
                TaskDomainError::NotOpen { .. }
            )))
        ),
        "deleting a task holding escrow must be rejected"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn validation_rejects_bad_creation_requests(exchange: TaskExchange) -> Result<()> {
    let creator = register(&exchange, "Ada").await?;

    let mut no_title = fence_task(creator, 10);
    no_title.title = "   ".to_owned();
    ensure!(
        exchange.create_task(no_title).await.is_err(),
        "blank title must be rejected"
    );

    let free_task = fence_task(creator, 0);
    ensure!(
        exchange.create_task(free_task).await.is_err(),
        "zero price must be rejected"
    );

    let mut long_title = fence_task(creator, 10);
    long_title.title = "x".repeat(101);
    ensure!(
        exchange.create_task(long_title).await.is_err(),
        "oversized title must be rejected"
    );

    let unaffordable = fence_task(creator, STARTING_BALANCE + 1);
    ensure!(
        matches!(
            exchange.create_task(unaffordable).await,
            Err(ExchangeError::Escrow(EscrowError::Ledger(
                LedgerStoreError::InsufficientFunds { .. }
            )))
        ),
        "a price beyond the creator's balance must be rejected"
    );
    Ok(())
}
