//! Conservation checks: credits move, they are never minted or burned.

use crate::escrow::helpers::{exchange, fence_task, register, total_balances, STARTING_BALANCE};
use creata::exchange::TaskExchange;
use creata::ledger::domain::{Credits, TransactionKind};
use creata::ledger::services::TransferRequest;
use creata::task::domain::DisputeResolution;
use eyre::{ensure, Result};
use rstest::rstest;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn a_completed_lifecycle_conserves_the_supply(exchange: TaskExchange) -> Result<()> {
    let creator = register(&exchange, "Ada").await?;
    let performer = register(&exchange, "Brin").await?;
    let users = [creator, performer];
    let supply = 2 * STARTING_BALANCE;
    ensure!(
        total_balances(&exchange, &users).await? == supply,
        "seeded supply"
    );

    let view = exchange.create_task(fence_task(creator, 10)).await?;
    exchange.request_task(view.id, performer).await?;
    exchange.assign_task(view.id, creator, performer).await?;
    // While assigned, the escrowed price is outside both balances.
    ensure!(
        total_balances(&exchange, &users).await? == supply - 10,
        "escrow held out of balances"
    );

    exchange.confirm_completion(view.id, creator).await?;
    exchange.confirm_completion(view.id, performer).await?;
    ensure!(
        total_balances(&exchange, &users).await? == supply,
        "supply restored after release"
    );
    Ok(())
}

#[rstest]
#[case(DisputeResolution::PerformerFavor)]
#[case(DisputeResolution::CreatorFavor)]
#[case(DisputeResolution::Split)]
#[tokio::test(flavor = "multi_thread")]
async fn every_resolution_conserves_the_supply(
    exchange: TaskExchange,
    #[case] resolution: DisputeResolution,
) -> Result<()> {
    let creator = register(&exchange, "Ada").await?;
    let performer = register(&exchange, "Brin").await?;
    let users = [creator, performer];
    let supply = 2 * STARTING_BALANCE;

    // Odd price, so the split case exercises the remainder share.
    let view = exchange.create_task(fence_task(creator, 7)).await?;
    exchange.request_task(view.id, performer).await?;
    exchange.assign_task(view.id, creator, performer).await?;
    exchange.raise_dispute(view.id, creator, "half done").await?;
    exchange.resolve_dispute(view.id, resolution).await?;

    ensure!(
        total_balances(&exchange, &users).await? == supply,
        "supply must survive {resolution:?}"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn direct_transfers_conserve_the_supply(exchange: TaskExchange) -> Result<()> {
    let sender = register(&exchange, "Ada").await?;
    let recipient = register(&exchange, "Brin").await?;

    exchange
        .transfer_credits(TransferRequest::new(sender, recipient, Credits::new(15)))
        .await?;

    ensure!(
        exchange.balance_of(sender).await? == Credits::new(STARTING_BALANCE - 15),
        "sender debited"
    );
    ensure!(
        exchange.balance_of(recipient).await? == Credits::new(STARTING_BALANCE + 15),
        "recipient credited"
    );
    ensure!(
        total_balances(&exchange, &[sender, recipient]).await? == 2 * STARTING_BALANCE,
        "supply unchanged"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn a_failed_assignment_leaves_the_supply_untouched(exchange: TaskExchange) -> Result<()> {
    let creator = register(&exchange, "Ada").await?;
    let performer = register(&exchange, "Brin").await?;

    let view = exchange.create_task(fence_task(creator, 40)).await?;
    exchange.request_task(view.id, performer).await?;
    // Spending after posting drops the balance below the price.
    exchange
        .transfer_credits(TransferRequest::new(creator, performer, Credits::new(15)))
        .await?;
    let result = exchange.assign_task(view.id, creator, performer).await;
    ensure!(result.is_err(), "assignment must fail");

    ensure!(
        total_balances(&exchange, &[creator, performer]).await? == 2 * STARTING_BALANCE,
        "no partial escrow survives"
    );
    let records = exchange.transactions_for(creator).await?;
    ensure!(
        records
            .iter()
            .all(|record| record.kind() != TransactionKind::TaskPayment),
        "no payment record survives the failed assignment"
    );
    Ok(())
}
