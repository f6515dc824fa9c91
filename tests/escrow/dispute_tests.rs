//! Dispute lifecycle and resolution accounting over the full exchange.

use crate::escrow::helpers::{exchange, fence_task, register, STARTING_BALANCE};
use creata::exchange::{ExchangeError, TaskExchange};
use creata::ledger::domain::{Credits, TransactionKind, TransactionStatus};
use creata::task::domain::{DisputeResolution, TaskDomainError, TaskStatus};
use creata::task::services::EscrowError;
use eyre::{ensure, Result};
use rstest::rstest;

async fn disputed_task(
    exchange: &TaskExchange,
    price: u64,
) -> Result<(creata::ledger::domain::UserId, creata::ledger::domain::UserId, creata::task::domain::TaskId)>
{
    let creator = register(exchange, "Ada").await?;
    let performer = register(exchange, "Brin").await?;
    let view = exchange.create_task(fence_task(creator, price)).await?;
    exchange.request_task(view.id, performer).await?;
    exchange.assign_task(view.id, creator, performer).await?;
    exchange
        .raise_dispute(view.id, performer, "payment withheld")
        .await?;
    Ok((creator, performer, view.id))
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn a_dispute_freezes_the_task(exchange: TaskExchange) -> Result<()> {
    let (creator, _performer, task) = disputed_task(&exchange, 10).await?;

    let view = exchange.get_task(task).await?;
    ensure!(view.status == TaskStatus::Disputed, "task disputed");
    let dispute = view.dispute.as_ref().expect("dispute recorded");
    ensure!(dispute.reason() == "payment withheld", "reason preserved");
    ensure!(!dispute.is_resolved(), "not yet resolved");

    // Confirmations are frozen along with the escrow.
    let result = exchange.confirm_completion(task, creator).await;
    ensure!(
        matches!(
            result,
            Err(ExchangeError::Escrow(EscrowError::Domain(
                TaskDomainError::NotAssigned { .. }
            )))
        ),
        "confirmation on a disputed task must be rejected"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn performer_favor_completes_the_payment(exchange: TaskExchange) -> Result<()> {
    let (creator, performer, task) = disputed_task(&exchange, 10).await?;

    exchange
        .resolve_dispute(task, DisputeResolution::PerformerFavor)
        .await?;
    ensure!(
        exchange.balance_of(performer).await? == Credits::new(STARTING_BALANCE + 10),
        "performer receives the full escrow"
    );
    ensure!(
        exchange.balance_of(creator).await? == Credits::new(STARTING_BALANCE - 10),
        "creator paid the full price"
    );

    let history = exchange.transactions_for(performer).await?;
    let payment = history
        .iter()
        .find(|record| record.kind() == TransactionKind::TaskPayment)
        .expect("payment record");
    ensure!(
        payment.status() == TransactionStatus::Completed,
        "pending payment completes"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn creator_favor_refunds_the_escrow(exchange: TaskExchange) -> Result<()> {
    let (creator, performer, task) = disputed_task(&exchange, 10).await?;

    exchange
        .resolve_dispute(task, DisputeResolution::CreatorFavor)
        .await?;
    ensure!(
        exchange.balance_of(creator).await? == Credits::new(STARTING_BALANCE),
        "creator made whole"
    );
    ensure!(
        exchange.balance_of(performer).await? == Credits::new(STARTING_BALANCE),
        "performer receives nothing"
    );

    let history = exchange.transactions_for(creator).await?;
    let payment = history
        .iter()
        .find(|record| record.kind() == TransactionKind::TaskPayment)
        .expect("payment record");
    ensure!(
        payment.status() == TransactionStatus::Cancelled,
        "pending payment cancels"
    );
    ensure!(
        history
            .iter()
            .any(|record| record.kind() == TransactionKind::Refund),
        "refund recorded"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn an_odd_split_gives_the_remainder_to_the_creator(exchange: TaskExchange) -> Result<()> {
    let (creator, performer, task) = disputed_task(&exchange, 7).await?;

    exchange
        .resolve_dispute(task, DisputeResolution::Split)
        .await?;
    ensure!(
        exchange.balance_of(performer).await? == Credits::new(STARTING_BALANCE + 3),
        "performer gets the floored half"
    );
    ensure!(
        exchange.balance_of(creator).await? == Credits::new(STARTING_BALANCE - 3),
        "creator recovers the remainder"
    );

    let view = exchange.get_task(task).await?;
    ensure!(view.status == TaskStatus::Completed, "task completed");
    let dispute = view.dispute.as_ref().expect("dispute retained");
    ensure!(dispute.is_resolved(), "dispute resolved");
    ensure!(
        dispute.resolution() == Some(DisputeResolution::Split),
        "resolution recorded"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn a_resolved_dispute_cannot_be_resolved_again(exchange: TaskExchange) -> Result<()> {
    let (_creator, _performer, task) = disputed_task(&exchange, 10).await?;

    exchange
        .resolve_dispute(task, DisputeResolution::Split)
        .await?;
    let repeat = exchange
        .resolve_dispute(task, DisputeResolution::PerformerFavor)
        .await;
    ensure!(
        matches!(
            repeat,
            Err(ExchangeError::Escrow(EscrowError::Domain(
                TaskDomainError::NotDisputed { .. }
            )))
        ),
        "a settled dispute must stay settled"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn disputes_on_open_tasks_are_rejected(exchange: TaskExchange) -> Result<()> {
    let creator = register(&exchange, "Ada").await?;
    let view = exchange.create_task(fence_task(creator, 10)).await?;

    let result = exchange.raise_dispute(view.id, creator, "nothing yet").await;
    ensure!(
        matches!(
            result,
            Err(ExchangeError::Escrow(EscrowError::Domain(
                TaskDomainError::NotAssigned { .. }
            )))
        ),
        "open tasks hold no escrow to dispute"
    );
    Ok(())
}
