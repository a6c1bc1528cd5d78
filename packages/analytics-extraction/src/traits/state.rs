//! Persisted state store trait.
//!
//! The store is keyed by stream identity and index. It is read once when a
//! run starts and written as completed bookmarks stream past it.

use async_trait::async_trait;

use crate::error::StateResult;
use crate::types::record::ReplicationBookmark;
use crate::types::state::StateDocument;

/// Durable key-value store for replication bookmarks.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Last synced `date` for `(stream_id, index)`, exactly as stored.
    async fn get_bookmark(&self, stream_id: &str, index: &str) -> StateResult<Option<String>>;

    /// Persist a bookmark. Implementations must never move a bookmark backwards.
    async fn put_bookmark(&self, bookmark: &ReplicationBookmark) -> StateResult<()>;

    /// The full state document.
    async fn snapshot(&self) -> StateResult<StateDocument>;
}
