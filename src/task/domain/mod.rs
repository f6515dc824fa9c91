//! Domain types for the task bounded context.

mod dispute;
mod error;
mod events;
mod ids;
mod status;
mod task;
mod view;

pub use dispute::{Dispute, DisputeResolution, ResolutionShares};
pub use error::{ParseDisputeResolutionError, ParseTaskStatusError, TaskDomainError};
pub use events::TaskEvent;
pub use ids::{TaskDescription, TaskId, TaskTitle};
pub use status::TaskStatus;
pub use task::{
    CompletionConfirmation, ConfirmationProgress, NewTask, PersistedTaskData, Task,
};
pub use view::{TaskView, UserProfile};
