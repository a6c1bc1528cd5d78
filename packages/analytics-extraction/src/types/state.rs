//! Persisted bookmark document.
//!
//! The layout is the Singer state format with one partition per index:
//!
//! ```json
//! {"bookmarks": {"users_count": {"partitions": [
//!     {"context": {"index": "prod"}, "replication_key": "date", "replication_key_value": "2024-01-10"}
//! ]}}}
//! ```
//!
//! A stream-level `replication_key_value` (unpartitioned state) is honoured
//! as a fallback for every index of that stream.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::endpoint::REPLICATION_KEY;
use crate::types::record::ReplicationBookmark;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateDocument {
    #[serde(default)]
    pub bookmarks: BTreeMap<String, StreamState>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamState {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub partitions: Vec<PartitionState>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_key_value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionState {
    pub context: PartitionContext,
    #[serde(default)]
    pub replication_key: Option<String>,
    #[serde(default)]
    pub replication_key_value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionContext {
    pub index: String,
}

impl StateDocument {
    /// Bookmark for `(stream_id, index)`: the index partition first, then the
    /// stream-level value.
    pub fn bookmark(&self, stream_id: &str, index: &str) -> Option<&str> {
        let stream = self.bookmarks.get(stream_id)?;
        stream
            .partitions
            .iter()
            .find(|p| p.context.index == index)
            .and_then(|p| p.replication_key_value.as_deref())
            .or(stream.replication_key_value.as_deref())
    }

    /// Record a bookmark. Values never move backwards.
    ///
    /// Returns whether the document changed.
    pub fn advance(&mut self, bookmark: &ReplicationBookmark) -> bool {
        let stream = self.bookmarks.entry(bookmark.stream_id.clone()).or_default();
        let partition = match stream
            .partitions
            .iter()
            .position(|p| p.context.index == bookmark.index)
        {
            Some(pos) => &mut stream.partitions[pos],
            None => {
                stream.partitions.push(PartitionState {
                    context: PartitionContext {
                        index: bookmark.index.clone(),
                    },
                    replication_key: Some(REPLICATION_KEY.to_string()),
                    replication_key_value: None,
                });
                let last = stream.partitions.len() - 1;
                &mut stream.partitions[last]
            }
        };

        // ISO dates order lexicographically
        if partition
            .replication_key_value
            .as_deref()
            .is_some_and(|current| current >= bookmark.last_date.as_str())
        {
            return false;
        }
        partition.replication_key = Some(REPLICATION_KEY.to_string());
        partition.replication_key_value = Some(bookmark.last_date.clone());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_wins_over_stream_value() {
        let doc: StateDocument = serde_json::from_str(
            r#"{"bookmarks": {"users_count": {
                "replication_key_value": "2024-01-01",
                "partitions": [{"context": {"index": "prod"}, "replication_key": "date", "replication_key_value": "2024-01-10"}]
            }}}"#,
        )
        .unwrap();

        assert_eq!(doc.bookmark("users_count", "prod"), Some("2024-01-10"));
        assert_eq!(doc.bookmark("users_count", "staging"), Some("2024-01-01"));
        assert_eq!(doc.bookmark("top_searches", "prod"), None);
    }

    #[test]
    fn test_advance_is_monotonic() {
        let mut doc = StateDocument::default();
        assert!(doc.advance(&ReplicationBookmark::new("users_count", "prod", "2024-01-10")));
        assert!(!doc.advance(&ReplicationBookmark::new("users_count", "prod", "2024-01-09")));
        assert!(!doc.advance(&ReplicationBookmark::new("users_count", "prod", "2024-01-10")));
        assert!(doc.advance(&ReplicationBookmark::new("users_count", "prod", "2024-01-11")));
        assert!(doc.advance(&ReplicationBookmark::new("users_count", "staging", "2024-01-01")));

        assert_eq!(doc.bookmark("users_count", "prod"), Some("2024-01-11"));
        assert_eq!(doc.bookmarks["users_count"].partitions.len(), 2);
    }

    #[test]
    fn test_serializes_singer_layout() {
        let mut doc = StateDocument::default();
        doc.advance(&ReplicationBookmark::new("top_searches", "prod", "2024-05-05"));
        let value = serde_json::to_value(&doc).unwrap();
        let partition = &value["bookmarks"]["top_searches"]["partitions"][0];
        assert_eq!(partition["context"]["index"], "prod");
        assert_eq!(partition["replication_key"], "date");
        assert_eq!(partition["replication_key_value"], "2024-05-05");
    }
}
