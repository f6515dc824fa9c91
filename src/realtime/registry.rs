//! Connection tracking and frame fan-out for live sessions.

use crate::ledger::domain::UserId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

/// Identifier for one live connection.
///
/// A user may hold several connections at once (one per tab or device);
/// each gets its own identifier and receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Creates a new random connection identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One event frame pushed to a connected client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundFrame {
    /// Wire-level event name.
    pub event: String,
    /// JSON payload.
    pub payload: serde_json::Value,
}

type Connections = HashMap<ConnectionId, mpsc::UnboundedSender<OutboundFrame>>;

/// Tracks which users hold live connections and fans frames out to them.
///
/// Senders whose receiving side has gone away are pruned on the next send
/// that touches them, so a dropped client cannot accumulate stale entries.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<UserId, Connections>>>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection for `user` and returns its frame receiver.
    #[must_use]
    pub fn connect(&self, user: UserId) -> (ConnectionId, mpsc::UnboundedReceiver<OutboundFrame>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let connection = ConnectionId::new();
        // The guarded maps stay usable after a panic elsewhere.
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        sessions.entry(user).or_default().insert(connection, sender);
        debug!(user = %user, connection = %connection, "session connected");
        (connection, receiver)
    }

    /// Removes one connection; the user stays online while others remain.
    pub fn disconnect(&self, user: UserId, connection: ConnectionId) {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(connections) = sessions.get_mut(&user) {
            connections.remove(&connection);
            if connections.is_empty() {
                sessions.remove(&user);
            }
        }
        debug!(user = %user, connection = %connection, "session disconnected");
    }

    /// Returns `true` while the user holds at least one live connection.
    #[must_use]
    pub fn is_online(&self, user: UserId) -> bool {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        sessions.get(&user).is_some_and(|c| !c.is_empty())
    }

    /// Returns every user currently holding a live connection.
    #[must_use]
    pub fn online_users(&self) -> Vec<UserId> {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        sessions
            .iter()
            .filter(|(_, connections)| !connections.is_empty())
            .map(|(user, _)| *user)
            .collect()
    }

    /// Sends a frame to every connection of one user.
    ///
    /// Returns the number of connections reached. Offline users receive
    /// nothing; delivery to live sessions is fire-and-forget.
    #[must_use = "the delivery count tells whether anyone was reached"]
    pub fn send_to(&self, user: UserId, frame: &OutboundFrame) -> usize {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let Some(connections) = sessions.get_mut(&user) else {
            return 0;
        };
        let delivered = Self::fan_out(connections, frame);
        if connections.is_empty() {
            sessions.remove(&user);
        }
        delivered
    }

    /// Sends a frame to every live connection of every user.
    ///
    /// Returns the number of connections reached.
    #[must_use = "the delivery count tells whether anyone was reached"]
    pub fn broadcast(&self, frame: &OutboundFrame) -> usize {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let mut delivered = 0;
        sessions.retain(|_, connections| {
            delivered += Self::fan_out(connections, frame);
            !connections.is_empty()
        });
        delivered
    }

    fn fan_out(connections: &mut Connections, frame: &OutboundFrame) -> usize {
        let mut delivered = 0;
        connections.retain(|_, sender| match sender.send(frame.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(_) => false,
        });
        delivered
    }
}
