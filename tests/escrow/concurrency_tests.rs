//! Races on a single task commit at most once.

use crate::escrow::helpers::{exchange, fence_task, register, STARTING_BALANCE};
use creata::exchange::TaskExchange;
use creata::ledger::domain::Credits;
use creata::task::domain::TaskStatus;
use eyre::{ensure, Result};
use rstest::rstest;
use std::sync::Arc;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn concurrent_confirmations_release_the_escrow_once(exchange: TaskExchange) -> Result<()> {
    let creator = register(&exchange, "Ada").await?;
    let performer = register(&exchange, "Brin").await?;

    let view = exchange.create_task(fence_task(creator, 10)).await?;
    exchange.request_task(view.id, performer).await?;
    exchange.assign_task(view.id, creator, performer).await?;

    let shared = Arc::new(exchange);
    let from_creator = {
        let client = Arc::clone(&shared);
        let task = view.id;
        tokio::spawn(async move { client.confirm_completion(task, creator).await })
    };
    let from_performer = {
        let client = Arc::clone(&shared);
        let task = view.id;
        tokio::spawn(async move { client.confirm_completion(task, performer).await })
    };
    from_creator.await?.map_err(|err| eyre::eyre!("{err}"))?;
    from_performer.await?.map_err(|err| eyre::eyre!("{err}"))?;

    let settled = shared.get_task(view.id).await?;
    ensure!(settled.status == TaskStatus::Completed, "task completed");
    ensure!(
        shared.balance_of(performer).await? == Credits::new(STARTING_BALANCE + 10),
        "exactly one release"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn racing_requests_from_many_users_all_land_distinctly(
    exchange: TaskExchange,
) -> Result<()> {
    let creator = register(&exchange, "Ada").await?;
    let view = exchange.create_task(fence_task(creator, 10)).await?;

    let shared = Arc::new(exchange);
    let mut workers = Vec::new();
    for index in 0..8 {
        let requester = register(&shared, &format!("worker-{index}")).await?;
        let handle = {
            let client = Arc::clone(&shared);
            let task = view.id;
            tokio::spawn(async move { client.request_task(task, requester).await })
        };
        workers.push(handle);
    }
    for handle in workers {
        handle.await?.map_err(|err| eyre::eyre!("{err}"))?;
    }

    let settled = shared.get_task(view.id).await?;
    ensure!(
        settled.requests.len() == 8,
        "every distinct request must land"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn racing_assignments_pick_exactly_one_performer(exchange: TaskExchange) -> Result<()> {
    let creator = register(&exchange, "Ada").await?;
    let view = exchange.create_task(fence_task(creator, 10)).await?;

    let mut requesters = Vec::new();
    for index in 0..4 {
        let requester = register(&exchange, &format!("worker-{index}")).await?;
        exchange.request_task(view.id, requester).await?;
        requesters.push(requester);
    }

    let shared = Arc::new(exchange);
    let mut attempts = Vec::new();
    for performer in requesters {
        let handle = {
            let client = Arc::clone(&shared);
            let task = view.id;
            tokio::spawn(async move { client.assign_task(task, creator, performer).await })
        };
        attempts.push(handle);
    }
    let mut winners = 0;
    for handle in attempts {
        if handle.await?.is_ok() {
            winners += 1;
        }
    }

    ensure!(winners == 1, "exactly one assignment may commit, got {winners}");
    let settled = shared.get_task(view.id).await?;
    ensure!(settled.status == TaskStatus::Assigned, "task assigned");
    ensure!(settled.assignee.is_some(), "winner recorded");
    ensure!(
        shared.balance_of(creator).await? == Credits::new(STARTING_BALANCE - 10),
        "creator debited exactly once"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn a_cancel_and_an_assign_cannot_both_win(exchange: TaskExchange) -> Result<()> {
    let creator = register(&exchange, "Ada").await?;
    let performer = register(&exchange, "Brin").await?;

    let view = exchange.create_task(fence_task(creator, 10)).await?;
    exchange.request_task(view.id, performer).await?;

    let shared = Arc::new(exchange);
    let cancel = {
        let client = Arc::clone(&shared);
        let task = view.id;
        tokio::spawn(async move { client.cancel_task(task, creator).await })
    };
    let assign = {
        let client = Arc::clone(&shared);
        let task = view.id;
        tokio::spawn(async move { client.assign_task(task, creator, performer).await })
    };
    let cancel_result = cancel.await?;
    let assign_result = assign.await?;

    ensure!(
        cancel_result.is_ok() != assign_result.is_ok(),
        "exactly one of the racing transitions may commit"
    );

    let settled = shared.get_task(view.id).await?;
    let expected_balance = if assign_result.is_ok() {
        ensure!(settled.status == TaskStatus::Assigned, "assign won");
        STARTING_BALANCE - 10
    } else {
        ensure!(settled.status == TaskStatus::Cancelled, "cancel won");
        STARTING_BALANCE
    };
    ensure!(
        shared.balance_of(creator).await? == Credits::new(expected_balance),
        "escrow matches the winning transition"
    );
    Ok(())
}
