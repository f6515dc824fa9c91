//! Orchestration services for the task bounded context.

mod dispatch;
mod escrow;
mod locks;

pub use dispatch::EventDispatcher;
pub use escrow::{
    CommittedTransition, CreateTaskRequest, EscrowError, EscrowResult, EscrowService,
};
