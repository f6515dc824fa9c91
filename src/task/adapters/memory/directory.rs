//! Thread-safe in-memory user directory.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::ledger::domain::UserId;
use crate::task::domain::UserProfile;
use crate::task::ports::{DirectoryError, DirectoryResult, UserDirectory};

/// In-memory [`UserDirectory`] backed by a single `RwLock`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    state: Arc<RwLock<HashMap<UserId, UserProfile>>>,
}

impl InMemoryDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserDirectory for InMemoryDirectory {
    async fn insert_profile(&self, profile: UserProfile) -> DirectoryResult<()> {
        let mut state = self
            .state
            .write()
            .map_err(|err| DirectoryError::persistence(std::io::Error::other(err.to_string())))?;
        if state.contains_key(&profile.id) {
            return Err(DirectoryError::ProfileExists(profile.id));
        }
        state.insert(profile.id, profile);
        Ok(())
    }

    async fn find_profile(&self, user: UserId) -> DirectoryResult<Option<UserProfile>> {
        let state = self
            .state
            .read()
            .map_err(|err| DirectoryError::persistence(std::io::Error::other(err.to_string())))?;
        Ok(state.get(&user).cloned())
    }
}
