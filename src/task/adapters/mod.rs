//! Adapter implementations for the task bounded context.

pub mod memory;
