//! Lookup port for user display profiles.

use crate::ledger::domain::UserId;
use crate::task::domain::UserProfile;
use async_trait::async_trait;
use std::error::Error;
use std::sync::Arc;
use thiserror::Error;

/// Result alias for directory operations.
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Errors surfaced by profile lookup.
#[derive(Debug, Clone, Error)]
pub enum DirectoryError {
    /// A profile for the user already exists.
    #[error("profile for user {0} already exists")]
    ProfileExists(UserId),

    /// The backing store failed.
    #[error("persistence error: {0}")]
    Persistence(#[source] Arc<dyn Error + Send + Sync>),
}

impl DirectoryError {
    /// Wraps a backend error as a persistence failure.
    pub fn persistence(err: impl Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}

/// Read/write access to user display profiles.
///
/// The directory backs the view join: services resolve creator, requester,
/// and assignee identifiers to profiles before handing a task to
/// observers.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Registers a profile for a new user.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::ProfileExists`] when the user is already
    /// registered.
    async fn insert_profile(&self, profile: UserProfile) -> DirectoryResult<()>;

    /// Fetches a user's profile, if registered.
    async fn find_profile(&self, user: UserId) -> DirectoryResult<Option<UserProfile>>;
}
