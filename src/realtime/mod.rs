//! Live session tracking and event push.
//!
//! The registry maps users to their open connections; sinks built on it
//! turn committed task events and notifications into frames on each
//! connection's channel. Transport (websockets or otherwise) sits outside
//! this crate and only consumes the frame receivers.

mod registry;
mod sink;

pub use registry::{ConnectionId, OutboundFrame, SessionRegistry};
pub use sink::SessionSink;
