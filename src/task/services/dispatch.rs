//! Post-commit fan-out of task events.
//!
//! Dispatch happens after the transition committed and outside the task
//! lock. Delivery is best-effort: a slow or failing sink is logged and
//! skipped, never allowed to unwind a commit or stall the caller beyond
//! the configured timeout.

use crate::ledger::domain::UserId;
use crate::task::domain::{TaskEvent, TaskView};
use crate::task::ports::{BroadcastSink, Notification, NotificationKind, NotificationSink};
use mockable::Clock;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::warn;

/// Wire-level event names, matching what connected clients subscribe to.
const EVENT_CREATED: &str = "taskCreated";
const EVENT_REQUESTED: &str = "taskRequested";
const EVENT_ASSIGNED: &str = "taskAssigned";
const EVENT_COMPLETION_CONFIRMED: &str = "taskCompletionConfirmed";
const EVENT_COMPLETED: &str = "taskCompleted";
const EVENT_CANCELLED: &str = "taskCancelled";
const EVENT_DELETED: &str = "taskDeleted";
const EVENT_DISPUTE_RAISED: &str = "taskDisputeRaised";
const EVENT_DISPUTE_RESOLVED: &str = "taskDisputeResolved";

/// Fans committed task events out to the broadcast and notification sinks.
#[derive(Clone)]
pub struct EventDispatcher<B, N, C>
where
    B: BroadcastSink,
    N: NotificationSink,
    C: Clock + Send + Sync,
{
    broadcast: Arc<B>,
    notifications: Arc<N>,
    clock: Arc<C>,
    delivery_timeout: Duration,
}

impl<B, N, C> EventDispatcher<B, N, C>
where
    B: BroadcastSink,
    N: NotificationSink,
    C: Clock + Send + Sync,
{
    /// Creates a dispatcher with the given per-delivery timeout.
    #[must_use]
    pub const fn new(
        broadcast: Arc<B>,
        notifications: Arc<N>,
        clock: Arc<C>,
        delivery_timeout: Duration,
    ) -> Self {
        Self {
            broadcast,
            notifications,
            clock,
            delivery_timeout,
        }
    }

    /// Dispatches every event raised by one committed transition.
    pub async fn dispatch(&self, view: &TaskView, events: &[TaskEvent]) {
        for event in events {
            self.publish(Self::event_name(event), view).await;
            for notification in self.notifications_for(view, event) {
                self.deliver(notification).await;
            }
        }
    }

    /// Delivers a single credit notification outside the task lifecycle,
    /// e.g. for direct transfers.
    pub async fn notify_credit(&self, user: UserId, message: String) {
        self.deliver(Notification {
            user,
            kind: NotificationKind::Credit,
            message,
            related_task: None,
            created_at: self.clock.utc(),
        })
        .await;
    }

    const fn event_name(event: &TaskEvent) -> &'static str {
        match event {
            TaskEvent::Created => EVENT_CREATED,
            TaskEvent::Requested { .. } => EVENT_REQUESTED,
            TaskEvent::Assigned { .. } => EVENT_ASSIGNED,
            TaskEvent::CompletionConfirmed { .. } => EVENT_COMPLETION_CONFIRMED,
            TaskEvent::Completed { .. } => EVENT_COMPLETED,
            TaskEvent::Cancelled => EVENT_CANCELLED,
            TaskEvent::Deleted { .. } => EVENT_DELETED,
            TaskEvent::DisputeRaised { .. } => EVENT_DISPUTE_RAISED,
            TaskEvent::DisputeResolved { .. } => EVENT_DISPUTE_RESOLVED,
        }
    }

    fn notifications_for(&self, view: &TaskView, event: &TaskEvent) -> Vec<Notification> {
        let now = self.clock.utc();
        let task_note = |user: UserId, message: String| Notification {
            user,
            kind: NotificationKind::Task,
            message,
            related_task: Some(view.id),
            created_at: now,
        };
        match event {
            TaskEvent::Created | TaskEvent::Deleted { .. } => Vec::new(),
            TaskEvent::Requested { requested_by } => {
                let requester = profile_name(view, *requested_by);
                vec![task_note(
                    view.creator.id,
                    format!("{requester} requested your task '{}'", view.title),
                )]
            }
            TaskEvent::Assigned { performer } => vec![task_note(
                *performer,
                format!("You were assigned the task '{}'", view.title),
            )],
            TaskEvent::CompletionConfirmed {
                confirmed_by,
                awaiting,
            } => {
                let confirmer = profile_name(view, *confirmed_by);
                vec![task_note(
                    *awaiting,
                    format!(
                        "{confirmer} confirmed completion of '{}'; your confirmation is pending",
                        view.title
                    ),
                )]
            }
            TaskEvent::Completed { performer, amount } => vec![
                Notification {
                    user: *performer,
                    kind: NotificationKind::Credit,
                    message: format!(
                        "You received {amount} credits for completing '{}'",
                        view.title
                    ),
                    related_task: Some(view.id),
                    created_at: now,
                },
                task_note(
                    view.creator.id,
                    format!("Your task '{}' is complete", view.title),
                ),
            ],
            TaskEvent::Cancelled => view
                .requests
                .iter()
                .map(|profile| {
                    task_note(
                        profile.id,
                        format!("The task '{}' was cancelled", view.title),
                    )
                })
                .collect(),
            TaskEvent::DisputeRaised {
                raised_by,
                counterparty,
            } => {
                let raiser = profile_name(view, *raised_by);
                vec![task_note(
                    *counterparty,
                    format!("{raiser} raised a dispute on '{}'", view.title),
                )]
            }
            TaskEvent::DisputeResolved { resolution } => {
                let message = format!(
                    "The dispute on '{}' was resolved ({})",
                    view.title,
                    resolution.as_str()
                );
                let mut targets = vec![task_note(view.creator.id, message.clone())];
                if let Some(assignee) = &view.assignee {
                    targets.push(task_note(assignee.id, message));
                }
                targets
            }
        }
    }

    async fn publish(&self, event: &str, view: &TaskView) {
        match timeout(self.delivery_timeout, self.broadcast.publish(event, view)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!(event, task = %view.id, error = %err, "broadcast failed"),
            Err(_) => warn!(event, task = %view.id, "broadcast timed out"),
        }
    }

    async fn deliver(&self, notification: Notification) {
        let user = notification.user;
        match timeout(
            self.delivery_timeout,
            self.notifications.notify(notification),
        )
        .await
        {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!(user = %user, error = %err, "notification failed"),
            Err(_) => warn!(user = %user, "notification timed out"),
        }
    }
}

/// Resolves a display name from the profiles joined into the view,
/// falling back to the identifier when none matches.
fn profile_name(view: &TaskView, user: UserId) -> String {
    if view.creator.id == user {
        return view.creator.name.clone();
    }
    if let Some(profile) = view.requests.iter().find(|profile| profile.id == user) {
        return profile.name.clone();
    }
    if let Some(profile) = view.assignee.as_ref().filter(|profile| profile.id == user) {
        return profile.name.clone();
    }
    user.to_string()
}
