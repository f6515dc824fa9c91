//! Session-backed implementations of the delivery ports.

use crate::realtime::registry::{OutboundFrame, SessionRegistry};
use crate::task::domain::TaskView;
use crate::task::ports::{BroadcastSink, Notification, NotificationSink, SinkError, SinkResult};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Event name carried by per-user notification frames.
const EVENT_NOTIFICATION: &str = "notification";

/// Delivers broadcasts and notifications over live sessions.
///
/// Broadcasts reach every connected user; notifications reach only the
/// addressee's connections and evaporate when the addressee is offline.
#[derive(Debug, Clone)]
pub struct SessionSink {
    registry: Arc<SessionRegistry>,
}

impl SessionSink {
    /// Creates a sink over the given registry.
    #[must_use]
    pub const fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl BroadcastSink for SessionSink {
    async fn publish(&self, event: &str, view: &TaskView) -> SinkResult<()> {
        let payload = serde_json::to_value(view).map_err(SinkError::delivery)?;
        let reached = self.registry.broadcast(&OutboundFrame {
            event: event.to_owned(),
            payload,
        });
        debug!(event, task = %view.id, reached, "task event broadcast");
        Ok(())
    }
}

#[async_trait]
impl NotificationSink for SessionSink {
    async fn notify(&self, notification: Notification) -> SinkResult<()> {
        let user = notification.user;
        let payload = serde_json::to_value(&notification).map_err(SinkError::delivery)?;
        let reached = self.registry.send_to(
            user,
            &OutboundFrame {
                event: EVENT_NOTIFICATION.to_owned(),
                payload,
            },
        );
        debug!(user = %user, reached, "notification delivered");
        Ok(())
    }
}
