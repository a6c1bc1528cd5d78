//! In-memory state store for testing and development.

use async_trait::async_trait;
use std::sync::{PoisonError, RwLock};

use crate::error::StateResult;
use crate::traits::state::StateStore;
use crate::types::record::ReplicationBookmark;
use crate::types::state::StateDocument;

/// In-memory replication state.
///
/// Useful for tests and for runs whose state is emitted elsewhere. Nothing
/// survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    state: RwLock<StateDocument>,
}

impl MemoryStateStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing state document.
    pub fn with_state(state: StateDocument) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }

    /// Number of streams with at least one bookmark.
    pub fn stream_count(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .bookmarks
            .len()
    }

    /// Drop all bookmarks.
    pub fn clear(&self) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = StateDocument::default();
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn get_bookmark(&self, stream_id: &str, index: &str) -> StateResult<Option<String>> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        Ok(state.bookmark(stream_id, index).map(str::to_string))
    }

    async fn put_bookmark(&self, bookmark: &ReplicationBookmark) -> StateResult<()> {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .advance(bookmark);
        Ok(())
    }

    async fn snapshot(&self) -> StateResult<StateDocument> {
        Ok(self.state.read().unwrap_or_else(PoisonError::into_inner).clone())
    }
}
