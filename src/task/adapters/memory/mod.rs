//! In-memory adapter implementations.

mod directory;
mod sinks;
mod task;

pub use directory::InMemoryDirectory;
pub use sinks::{RecordingBroadcastSink, RecordingNotificationSink};
pub use task::InMemoryTaskRepository;
