//! Replication bookmark tracking for one `(stream, index)` pair.
//!
//! The bookmark is the maximum `date` among emitted records. When it is
//! allowed to move depends on the [`BookmarkPolicy`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StateResult;
use crate::traits::state::StateStore;
use crate::types::record::{EnrichedRecord, ReplicationBookmark};
use crate::types::window::{format_date, parse_date};

/// When an observed record date becomes the persisted bookmark.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookmarkPolicy {
    /// Only once every page of the day has been fetched. A failure in the
    /// middle of a day leaves the bookmark on the previous completed day.
    #[default]
    DayCompleted,
    /// As soon as a record carrying the date is emitted.
    RecordEmitted,
}

#[derive(Debug, Clone)]
pub struct ReplicationTracker {
    stream_id: String,
    index: String,
    policy: BookmarkPolicy,
    committed: Option<NaiveDate>,
    pending: Option<NaiveDate>,
}

impl ReplicationTracker {
    pub fn new(stream_id: impl Into<String>, index: impl Into<String>, policy: BookmarkPolicy) -> Self {
        Self {
            stream_id: stream_id.into(),
            index: index.into(),
            policy,
            committed: None,
            pending: None,
        }
    }

    /// Read the stored bookmark. Returned as stored so the caller decides
    /// what to do with a value that does not parse; a parseable one also
    /// becomes the floor for later advancement.
    pub async fn starting_point<S: StateStore + ?Sized>(&mut self, store: &S) -> StateResult<Option<String>> {
        let stored = store.get_bookmark(&self.stream_id, &self.index).await?;
        self.committed = stored.as_deref().and_then(parse_date);
        debug!(
            stream = %self.stream_id,
            index = %self.index,
            bookmark = ?stored,
            "Loaded replication bookmark"
        );
        Ok(stored)
    }

    /// Note a record's date.
    ///
    /// Under [`BookmarkPolicy::RecordEmitted`] this returns the new bookmark
    /// when it advanced.
    pub fn observe(&mut self, record: &EnrichedRecord) -> Option<ReplicationBookmark> {
        let date = record.date().and_then(parse_date)?;
        match self.policy {
            BookmarkPolicy::RecordEmitted => self.commit(date),
            BookmarkPolicy::DayCompleted => {
                if self.pending.map_or(true, |p| date > p) {
                    self.pending = Some(date);
                }
                None
            }
        }
    }

    /// The current day finished cleanly. Returns the new bookmark when it advanced.
    pub fn complete_day(&mut self) -> Option<ReplicationBookmark> {
        let pending = self.pending.take()?;
        self.commit(pending)
    }

    /// Current bookmark, if any.
    pub fn bookmark(&self) -> Option<ReplicationBookmark> {
        self.committed.map(|date| self.to_bookmark(date))
    }

    fn commit(&mut self, date: NaiveDate) -> Option<ReplicationBookmark> {
        if self.committed.is_some_and(|c| c >= date) {
            return None;
        }
        self.committed = Some(date);
        Some(self.to_bookmark(date))
    }

    fn to_bookmark(&self, date: NaiveDate) -> ReplicationBookmark {
        ReplicationBookmark::new(self.stream_id.as_str(), self.index.as_str(), format_date(date))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::MemoryStateStore;
    use serde_json::{json, Map, Value};

    fn record(date: &str) -> EnrichedRecord {
        let fields: Map<String, Value> = serde_json::from_value(json!({"date": date, "count": 1})).unwrap();
        EnrichedRecord::from_map(fields)
    }

    #[tokio::test]
    async fn test_starting_point_reads_store() {
        let store = MemoryStateStore::new();
        store
            .put_bookmark(&ReplicationBookmark::new("users_count", "prod", "2024-01-10"))
            .await
            .unwrap();

        let mut tracker = ReplicationTracker::new("users_count", "prod", BookmarkPolicy::default());
        assert_eq!(tracker.starting_point(&store).await.unwrap().as_deref(), Some("2024-01-10"));
        assert_eq!(tracker.bookmark().unwrap().last_date, "2024-01-10");

        let mut other = ReplicationTracker::new("users_count", "staging", BookmarkPolicy::default());
        assert_eq!(other.starting_point(&store).await.unwrap(), None);
    }

    #[test]
    fn test_day_completed_waits_for_the_day() {
        let mut tracker = ReplicationTracker::new("users_count", "prod", BookmarkPolicy::DayCompleted);

        assert!(tracker.observe(&record("2024-03-01")).is_none());
        assert!(tracker.bookmark().is_none());

        let advanced = tracker.complete_day().unwrap();
        assert_eq!(advanced.last_date, "2024-03-01");
        assert_eq!(advanced.index, "prod");
    }

    #[test]
    fn test_empty_day_does_not_advance() {
        let mut tracker = ReplicationTracker::new("users_count", "prod", BookmarkPolicy::DayCompleted);
        assert!(tracker.complete_day().is_none());
        assert!(tracker.bookmark().is_none());
    }

    #[test]
    fn test_record_emitted_advances_immediately() {
        let mut tracker = ReplicationTracker::new("users_count", "prod", BookmarkPolicy::RecordEmitted);
        assert_eq!(tracker.observe(&record("2024-03-01")).unwrap().last_date, "2024-03-01");
        assert!(tracker.observe(&record("2024-03-01")).is_none());
        assert!(tracker.complete_day().is_none());
    }

    #[test]
    fn test_never_moves_backwards() {
        let mut tracker = ReplicationTracker::new("users_count", "prod", BookmarkPolicy::RecordEmitted);
        tracker.observe(&record("2024-03-05"));
        assert!(tracker.observe(&record("2024-03-04")).is_none());
        assert_eq!(tracker.bookmark().unwrap().last_date, "2024-03-05");
    }

    #[test]
    fn test_records_without_date_are_ignored() {
        let mut tracker = ReplicationTracker::new("users_count", "prod", BookmarkPolicy::RecordEmitted);
        let fields: Map<String, Value> = serde_json::from_value(json!({"count": 1})).unwrap();
        assert!(tracker.observe(&EnrichedRecord::from_map(fields)).is_none());
    }
}
