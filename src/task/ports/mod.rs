//! Port contracts for the task bounded context.

mod directory;
mod repository;
mod sinks;

pub use directory::{DirectoryError, DirectoryResult, UserDirectory};
pub use repository::{TaskRepository, TaskRepositoryError, TaskRepositoryResult};
pub use sinks::{
    BroadcastSink, Notification, NotificationKind, NotificationSink, SinkError, SinkResult,
};
