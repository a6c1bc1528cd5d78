//! Mapping of response bodies to enriched records.

use serde_json::Value;

use crate::types::endpoint::{EndpointDescriptor, RecordArray};
use crate::types::record::EnrichedRecord;
use crate::types::window::DayContext;

/// Records extracted from one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedPage {
    pub records: Vec<EnrichedRecord>,
    /// Entries in the record array, object or not. Drives pagination.
    pub raw_len: usize,
}

/// Flattens a response body into records and stamps them with the day.
#[derive(Debug, Clone, Copy)]
pub struct ResponseNormalizer {
    record_array: RecordArray,
    echo_window: bool,
}

impl ResponseNormalizer {
    pub fn new(record_array: RecordArray) -> Self {
        Self {
            record_array,
            echo_window: true,
        }
    }

    pub fn for_endpoint(endpoint: &EndpointDescriptor) -> Self {
        Self::new(endpoint.record_array)
    }

    /// Whether to add `start_date`/`end_date` to each record.
    pub fn with_window_echo(mut self, echo: bool) -> Self {
        self.echo_window = echo;
        self
    }

    /// Normalize one response body.
    ///
    /// A missing or non-array record field yields an empty page. Entries
    /// that are not objects are skipped. The input is never mutated.
    pub fn normalize(&self, body: &Value, day: &DayContext) -> NormalizedPage {
        let Some(entries) = body.get(self.record_array.key()).and_then(Value::as_array) else {
            return NormalizedPage::default();
        };

        let iso_date = day.iso_date();
        let records = entries
            .iter()
            .filter_map(Value::as_object)
            .map(|entry| {
                let mut fields = entry.clone();
                if !fields.contains_key("index_name") {
                    fields.insert("index_name".into(), Value::from(day.index.as_str()));
                }
                // The day is authoritative over whatever date the entry carries
                fields.insert("date".into(), Value::from(iso_date.as_str()));
                if self.echo_window {
                    fields.insert("start_date".into(), Value::from(iso_date.as_str()));
                    fields.insert("end_date".into(), Value::from(iso_date.as_str()));
                }
                EnrichedRecord::from_map(fields)
            })
            .collect();

        NormalizedPage {
            records,
            raw_len: entries.len(),
        }
    }
}
