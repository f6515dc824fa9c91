//! Live session frames reflect committed state.

use crate::escrow::helpers::{exchange, fence_task, register};
use creata::exchange::TaskExchange;
use creata::realtime::OutboundFrame;
use eyre::{ensure, Result};
use rstest::rstest;
use tokio::sync::mpsc::UnboundedReceiver;

fn drain(receiver: &mut UnboundedReceiver<OutboundFrame>) -> Vec<OutboundFrame> {
    let mut frames = Vec::new();
    while let Ok(frame) = receiver.try_recv() {
        frames.push(frame);
    }
    frames
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn online_users_tracks_connections(exchange: TaskExchange) -> Result<()> {
    let user = register(&exchange, "Ada").await?;
    ensure!(exchange.online_users().is_empty(), "nobody online yet");

    let (connection, _receiver) = exchange.connect(user);
    ensure!(exchange.online_users() == vec![user], "user online");

    exchange.disconnect(user, connection);
    ensure!(exchange.online_users().is_empty(), "user offline again");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn task_creation_is_broadcast_to_connected_users(exchange: TaskExchange) -> Result<()> {
    let creator = register(&exchange, "Ada").await?;
    let watcher = register(&exchange, "Brin").await?;
    let (_connection, mut receiver) = exchange.connect(watcher);

    let view = exchange.create_task(fence_task(creator, 10)).await?;

    let frames = drain(&mut receiver);
    ensure!(frames.len() == 1, "one frame for the creation");
    let frame = frames.first().expect("frame");
    ensure!(frame.event == "taskCreated", "wire name");
    ensure!(
        frame.payload.get("id").is_some(),
        "payload carries the view"
    );
    ensure!(
        frame.payload.get("title").and_then(|v| v.as_str())
            == Some(view.title.as_str()),
        "payload title matches"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn a_request_notifies_the_connected_creator(exchange: TaskExchange) -> Result<()> {
    let creator = register(&exchange, "Ada").await?;
    let performer = register(&exchange, "Brin").await?;
    let view = exchange.create_task(fence_task(creator, 10)).await?;

    let (_connection, mut receiver) = exchange.connect(creator);
    exchange.request_task(view.id, performer).await?;

    let frames = drain(&mut receiver);
    // The creator sees the broadcast plus their personal notification.
    ensure!(
        frames.iter().any(|frame| frame.event == "taskRequested"),
        "broadcast received"
    );
    let note = frames
        .iter()
        .find(|frame| frame.event == "notification")
        .expect("notification frame");
    ensure!(
        note.payload
            .get("message")
            .and_then(|v| v.as_str())
            .is_some_and(|message| message.contains("Brin")),
        "notification names the requester"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn offline_users_miss_frames_silently(exchange: TaskExchange) -> Result<()> {
    let creator = register(&exchange, "Ada").await?;
    let performer = register(&exchange, "Brin").await?;
    let view = exchange.create_task(fence_task(creator, 10)).await?;

    // Nobody is connected; the commit must still land.
    exchange.request_task(view.id, performer).await?;
    let settled = exchange.get_task(view.id).await?;
    ensure!(settled.requests.len() == 1, "request committed");
    Ok(())
}
