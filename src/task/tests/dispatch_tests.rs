//! Tests for post-commit event fan-out.

use crate::ledger::domain::{Credits, UserId};
use crate::task::adapters::memory::{RecordingBroadcastSink, RecordingNotificationSink};
use crate::task::domain::{
    CompletionConfirmation, DisputeResolution, TaskEvent, TaskId, TaskStatus, TaskView,
    UserProfile,
};
use crate::task::ports::NotificationKind;
use crate::task::services::EventDispatcher;
use chrono::Utc;
use mockable::DefaultClock;
use rstest::{fixture, rstest};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

type TestDispatcher =
    EventDispatcher<RecordingBroadcastSink, RecordingNotificationSink, DefaultClock>;

struct Harness {
    broadcast: Arc<RecordingBroadcastSink>,
    notifications: Arc<RecordingNotificationSink>,
    dispatcher: TestDispatcher,
}

#[fixture]
fn harness() -> Harness {
    let broadcast = Arc::new(RecordingBroadcastSink::new());
    let notifications = Arc::new(RecordingNotificationSink::new());
    let dispatcher = EventDispatcher::new(
        Arc::clone(&broadcast),
        Arc::clone(&notifications),
        Arc::new(DefaultClock),
        Duration::from_secs(1),
    );
    Harness {
        broadcast,
        notifications,
        dispatcher,
    }
}

fn profile(name: &str) -> UserProfile {
    UserProfile {
        id: UserId::new(),
        name: name.to_owned(),
        avatar: None,
    }
}

fn fence_view(creator: UserProfile, requests: Vec<UserProfile>) -> TaskView {
    let now = Utc::now();
    TaskView {
        id: TaskId::new(),
        title: "Fix the garden fence".to_owned(),
        description: "Two panels came loose in the storm".to_owned(),
        price: Credits::new(10),
        skills: BTreeSet::new(),
        status: TaskStatus::Open,
        creator,
        requests,
        assignee: None,
        confirmation: CompletionConfirmation::default(),
        dispute: None,
        created_at: now,
        updated_at: now,
    }
}

#[rstest]
#[case(TaskEvent::Created, "taskCreated")]
#[case(TaskEvent::Cancelled, "taskCancelled")]
#[case(
    TaskEvent::DisputeResolved { resolution: DisputeResolution::Split },
    "taskDisputeResolved"
)]
#[tokio::test(flavor = "multi_thread")]
async fn events_broadcast_under_their_wire_names(
    harness: Harness,
    #[case] event: TaskEvent,
    #[case] expected: &str,
) {
    let view = fence_view(profile("Ada"), Vec::new());
    harness.dispatcher.dispatch(&view, &[event]).await;

    let published = harness.broadcast.published().expect("sink readable");
    assert_eq!(published.len(), 1);
    assert_eq!(
        published.first().map(|(name, _)| name.as_str()),
        Some(expected)
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn a_request_notifies_the_creator_by_name(harness: Harness) {
    let creator = profile("Ada");
    let requester = profile("Brin");
    let creator_id = creator.id;
    let requester_id = requester.id;
    let view = fence_view(creator, vec![requester]);

    harness
        .dispatcher
        .dispatch(
            &view,
            &[TaskEvent::Requested {
                requested_by: requester_id,
            }],
        )
        .await;

    let delivered = harness.notifications.delivered().expect("sink readable");
    assert_eq!(delivered.len(), 1);
    let note = delivered.first().expect("one notification");
    assert_eq!(note.user, creator_id);
    assert_eq!(note.kind, NotificationKind::Task);
    assert_eq!(note.related_task, Some(view.id));
    assert!(note.message.contains("Brin"));
    assert!(note.message.contains("Fix the garden fence"));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn completion_pays_the_performer_a_credit_notification(harness: Harness) {
    let performer = UserId::new();
    let view = fence_view(profile("Ada"), Vec::new());

    harness
        .dispatcher
        .dispatch(
            &view,
            &[TaskEvent::Completed {
                performer,
                amount: Credits::new(10),
            }],
        )
        .await;

    let delivered = harness.notifications.delivered().expect("sink readable");
    assert_eq!(delivered.len(), 2);
    let credit = delivered
        .iter()
        .find(|note| note.user == performer)
        .expect("performer notified");
    assert_eq!(credit.kind, NotificationKind::Credit);
    assert!(credit.message.contains("10"));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn cancellation_notifies_every_requester(harness: Harness) {
    let first = profile("Brin");
    let second = profile("Cas");
    let targets = [first.id, second.id];
    let view = fence_view(profile("Ada"), vec![first, second]);

    harness.dispatcher.dispatch(&view, &[TaskEvent::Cancelled]).await;

    let delivered = harness.notifications.delivered().expect("sink readable");
    let mut notified: Vec<UserId> = delivered.iter().map(|note| note.user).collect();
    notified.sort();
    let mut expected = targets.to_vec();
    expected.sort();
    assert_eq!(notified, expected);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn deletion_broadcasts_but_notifies_nobody(harness: Harness) {
    let view = fence_view(profile("Ada"), Vec::new());
    harness
        .dispatcher
        .dispatch(&view, &[TaskEvent::Deleted { task_id: view.id }])
        .await;

    assert_eq!(
        harness.broadcast.published().expect("sink readable").len(),
        1
    );
    assert!(harness
        .notifications
        .delivered()
        .expect("sink readable")
        .is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn notify_credit_targets_one_user(harness: Harness) {
    let user = UserId::new();
    harness
        .dispatcher
        .notify_credit(user, "You received 20 credits from a transfer".to_owned())
        .await;

    let delivered = harness.notifications.delivered().expect("sink readable");
    assert_eq!(delivered.len(), 1);
    let note = delivered.first().expect("one notification");
    assert_eq!(note.user, user);
    assert_eq!(note.kind, NotificationKind::Credit);
    assert_eq!(note.related_task, None);
}
