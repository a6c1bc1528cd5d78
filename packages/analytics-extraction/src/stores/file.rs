//! State persisted as a Singer state document on disk.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::StateResult;
use crate::traits::state::StateStore;
use crate::types::record::ReplicationBookmark;
use crate::types::state::StateDocument;

/// File-backed state store.
///
/// The whole document is loaded on open and rewritten on every bookmark
/// that advances. Writes go to a sibling temp file which is then renamed
/// over the target, so a crash never leaves a half-written document.
#[derive(Debug)]
pub struct FileStateStore {
    path: PathBuf,
    state: Mutex<StateDocument>,
}

impl FileStateStore {
    /// Open the document at `path`. A missing file is an empty state.
    pub async fn open(path: impl Into<PathBuf>) -> StateResult<Self> {
        let path = path.into();
        let state = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => StateDocument::default(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StateDocument::default(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), streams = state.bookmarks.len(), "Loaded state file");
        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, state: &StateDocument) -> StateResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut temp = self.path.clone().into_os_string();
        temp.push(".tmp");
        let temp = PathBuf::from(temp);

        let bytes = serde_json::to_vec_pretty(state)?;
        tokio::fs::write(&temp, bytes).await?;
        tokio::fs::rename(&temp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn get_bookmark(&self, stream_id: &str, index: &str) -> StateResult<Option<String>> {
        let state = self.state.lock().await;
        Ok(state.bookmark(stream_id, index).map(str::to_string))
    }

    async fn put_bookmark(&self, bookmark: &ReplicationBookmark) -> StateResult<()> {
        let mut state = self.state.lock().await;
        if state.advance(bookmark) {
            self.persist(&state).await?;
            debug!(
                path = %self.path.display(),
                stream = %bookmark.stream_id,
                index = %bookmark.index,
                date = %bookmark.last_date,
                "Persisted bookmark"
            );
        }
        Ok(())
    }

    async fn snapshot(&self) -> StateResult<StateDocument> {
        Ok(self.state.lock().await.clone())
    }
}
