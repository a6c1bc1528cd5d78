//! Sequential sync of every selected stream for every configured index.

use analytics_extraction::{
    EndpointDescriptor, ExtractEvent, ExtractionOverrides, Extractor, RunSummary, StateStore,
    Transport,
};
use anyhow::{Context, Result};
use std::io::Write;
use tracing::info;

use crate::output::SingerWriter;

/// Streams × indices, one after another.
pub struct Tap<T: Transport, S: StateStore> {
    extractor: Extractor<T, S>,
    streams: Vec<&'static EndpointDescriptor>,
    indices: Vec<String>,
}

impl<T: Transport, S: StateStore> Tap<T, S> {
    pub fn new(
        extractor: Extractor<T, S>,
        streams: Vec<&'static EndpointDescriptor>,
        indices: Vec<String>,
    ) -> Self {
        Self {
            extractor,
            streams,
            indices,
        }
    }

    pub fn extractor(&self) -> &Extractor<T, S> {
        &self.extractor
    }

    /// Run every stream for every index, writing Singer messages to `writer`.
    ///
    /// The first failure aborts the sync. State written up to that point
    /// reflects the last checkpoint reached.
    pub async fn sync<W: Write>(
        &self,
        overrides: &ExtractionOverrides,
        writer: &mut SingerWriter<W>,
    ) -> Result<Vec<RunSummary>> {
        let mut state = self.extractor.store().snapshot().await?;
        let mut summaries = Vec::new();

        for &endpoint in &self.streams {
            writer.write_schema(endpoint)?;

            for index in &self.indices {
                info!(stream = endpoint.name, index = %index, "Syncing stream");
                let summary = self
                    .extractor
                    .sync(endpoint, index, overrides, |event| match event {
                        ExtractEvent::Record(record) => writer.write_record(endpoint.name, record),
                        ExtractEvent::Checkpoint(bookmark) => {
                            state.advance(bookmark);
                            writer.write_state(&state)
                        }
                        ExtractEvent::DayCompleted { .. } => Ok(()),
                    })
                    .await
                    .with_context(|| format!("Sync of {} for index {} failed", endpoint.name, index))?;
                summaries.push(summary);
            }
        }

        writer.write_state(&self.extractor.store().snapshot().await?)?;

        let records: usize = summaries.iter().map(|s| s.records).sum();
        info!(runs = summaries.len(), records, "Sync finished");
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analytics_extraction::testing::{dates_body, searches_body, MockFailure, MockTransport};
    use analytics_extraction::{find_endpoint, EngineSettings, MemoryStateStore};
    use chrono::NaiveDate;
    use serde_json::Value;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn messages(writer: SingerWriter<Vec<u8>>) -> Vec<Value> {
        String::from_utf8(writer.into_inner())
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    fn tap(transport: MockTransport, streams: &[&str], indices: &[&str]) -> Tap<MockTransport, MemoryStateStore> {
        let extractor = Extractor::new(transport, MemoryStateStore::new(), EngineSettings::new())
            .with_today(date("2024-01-02"));
        Tap::new(
            extractor,
            streams.iter().map(|s| find_endpoint(s).unwrap()).collect(),
            indices.iter().map(|i| i.to_string()).collect(),
        )
    }

    #[tokio::test]
    async fn test_message_order_for_one_stream() {
        let path = find_endpoint("users_count").unwrap().path;
        let transport = MockTransport::new()
            .with_page(path, "2024-01-01", 0, dates_body(&[5]))
            .with_page(path, "2024-01-02", 0, dates_body(&[6]));
        let tap = tap(transport, &["users_count"], &["prod"]);
        let overrides = ExtractionOverrides::new().with_start_date("2024-01-01");

        let mut writer = SingerWriter::new(Vec::new());
        let summaries = tap.sync(&overrides, &mut writer).await.unwrap();

        let kinds: Vec<_> = messages(writer)
            .iter()
            .map(|m| m["type"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(kinds, vec!["SCHEMA", "RECORD", "STATE", "RECORD", "STATE", "STATE"]);
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].records, 2);
        assert_eq!(summaries[0].bookmark.as_deref(), Some("2024-01-02"));
    }

    #[tokio::test]
    async fn test_streams_then_indices_in_order() {
        let transport = MockTransport::new();
        let tap = tap(transport, &["users_count", "top_searches"], &["a", "b"]);
        let overrides = ExtractionOverrides::new().with_start_date("2024-01-02");

        let mut writer = SingerWriter::new(Vec::new());
        tap.sync(&overrides, &mut writer).await.unwrap();

        let order: Vec<_> = tap
            .extractor()
            .transport()
            .calls()
            .iter()
            .map(|c| (c.path.clone(), c.index.clone()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("/2/users/count".to_string(), "a".to_string()),
                ("/2/users/count".to_string(), "b".to_string()),
                ("/2/searches".to_string(), "a".to_string()),
                ("/2/searches".to_string(), "b".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_failure_keeps_state_written_so_far() {
        let path = find_endpoint("top_searches").unwrap().path;
        let transport = MockTransport::new()
            .with_page(path, "2024-01-01", 0, searches_body(&["a"]))
            .with_failures(path, "2024-01-02", 0, MockFailure::Status(401), 1);
        let tap = tap(transport, &["top_searches"], &["prod"]);
        let overrides = ExtractionOverrides::new().with_start_date("2024-01-01");

        let mut writer = SingerWriter::new(Vec::new());
        let err = tap.sync(&overrides, &mut writer).await.unwrap_err();

        assert!(err.to_string().contains("top_searches"));
        let last = messages(writer).pop().unwrap();
        assert_eq!(last["type"], "STATE");
        assert_eq!(
            last["value"]["bookmarks"]["top_searches"]["partitions"][0]["replication_key_value"],
            "2024-01-01"
        );
    }
}
