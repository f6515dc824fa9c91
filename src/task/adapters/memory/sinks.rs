//! Recording sinks for tests and local runs.

use async_trait::async_trait;
use std::sync::{Arc, RwLock};

use crate::task::domain::TaskView;
use crate::task::ports::{BroadcastSink, Notification, NotificationSink, SinkError, SinkResult};

/// [`NotificationSink`] that appends every delivery to a shared list.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotificationSink {
    delivered: Arc<RwLock<Vec<Notification>>>,
}

impl RecordingNotificationSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every notification delivered so far.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Delivery`] when the backing lock is poisoned.
    pub fn delivered(&self) -> SinkResult<Vec<Notification>> {
        let delivered = self
            .delivered
            .read()
            .map_err(|err| SinkError::delivery(std::io::Error::other(err.to_string())))?;
        Ok(delivered.clone())
    }
}

#[async_trait]
impl NotificationSink for RecordingNotificationSink {
    async fn notify(&self, notification: Notification) -> SinkResult<()> {
        let mut delivered = self
            .delivered
            .write()
            .map_err(|err| SinkError::delivery(std::io::Error::other(err.to_string())))?;
        delivered.push(notification);
        Ok(())
    }
}

/// [`BroadcastSink`] that records event names alongside their payloads.
#[derive(Debug, Clone, Default)]
pub struct RecordingBroadcastSink {
    published: Arc<RwLock<Vec<(String, TaskView)>>>,
}

impl RecordingBroadcastSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every `(event, view)` pair published so far.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Delivery`] when the backing lock is poisoned.
    pub fn published(&self) -> SinkResult<Vec<(String, TaskView)>> {
        let published = self
            .published
            .read()
            .map_err(|err| SinkError::delivery(std::io::Error::other(err.to_string())))?;
        Ok(published.clone())
    }
}

#[async_trait]
impl BroadcastSink for RecordingBroadcastSink {
    async fn publish(&self, event: &str, view: &TaskView) -> SinkResult<()> {
        let mut published = self
            .published
            .write()
            .map_err(|err| SinkError::delivery(std::io::Error::other(err.to_string())))?;
        published.push((event.to_owned(), view.clone()));
        Ok(())
    }
}
