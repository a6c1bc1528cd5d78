//! Singer message output.
//!
//! One JSON document per line: `SCHEMA` before a stream's records, `RECORD`
//! per record, `STATE` whenever a bookmark advances and once at the end.

use analytics_extraction::{
    catalog, EndpointDescriptor, EnrichedRecord, StateDocument,
};
use analytics_extraction::types::endpoint::REPLICATION_KEY;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::io::{self, Write};

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
enum Message<'a> {
    Schema {
        stream: &'a str,
        schema: Value,
        key_properties: &'a [&'static str],
        bookmark_properties: [&'static str; 1],
    },
    Record {
        stream: &'a str,
        record: &'a EnrichedRecord,
        time_extracted: String,
    },
    State {
        value: &'a StateDocument,
    },
}

/// Writes Singer messages to any `Write` sink.
pub struct SingerWriter<W: Write> {
    out: W,
}

impl<W: Write> SingerWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn write_schema(&mut self, endpoint: &EndpointDescriptor) -> io::Result<()> {
        self.emit(&Message::Schema {
            stream: endpoint.name,
            schema: endpoint.json_schema(),
            key_properties: endpoint.primary_keys,
            bookmark_properties: [REPLICATION_KEY],
        })
    }

    pub fn write_record(&mut self, stream: &str, record: &EnrichedRecord) -> io::Result<()> {
        self.emit(&Message::Record {
            stream,
            record,
            time_extracted: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        })
    }

    /// Write a state message and flush, so everything before it is out.
    pub fn write_state(&mut self, state: &StateDocument) -> io::Result<()> {
        self.emit(&Message::State { value: state })?;
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, message: &Message<'_>) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, message)?;
        self.out.write_all(b"\n")
    }
}

/// Catalog document printed by `discover`.
pub fn discover_catalog() -> Value {
    let streams: Vec<Value> = catalog()
        .iter()
        .map(|endpoint| {
            json!({
                "tap_stream_id": endpoint.name,
                "stream": endpoint.name,
                "schema": endpoint.json_schema(),
                "key_properties": endpoint.primary_keys,
                "replication_key": REPLICATION_KEY,
                "replication_method": "INCREMENTAL",
            })
        })
        .collect();
    json!({ "streams": streams })
}

#[cfg(test)]
mod tests {
    use super::*;
    use analytics_extraction::{find_endpoint, ReplicationBookmark};

    fn lines(writer: SingerWriter<Vec<u8>>) -> Vec<Value> {
        String::from_utf8(writer.into_inner())
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_schema_message() {
        let mut writer = SingerWriter::new(Vec::new());
        writer.write_schema(find_endpoint("top_searches").unwrap()).unwrap();

        let messages = lines(writer);
        assert_eq!(messages[0]["type"], "SCHEMA");
        assert_eq!(messages[0]["stream"], "top_searches");
        assert_eq!(messages[0]["key_properties"], json!(["index_name", "search", "date"]));
        assert_eq!(messages[0]["bookmark_properties"], json!(["date"]));
        assert!(messages[0]["schema"]["properties"]["search"].is_object());
    }

    #[test]
    fn test_record_and_state_messages() {
        let record: EnrichedRecord =
            serde_json::from_value(json!({"index_name": "prod", "date": "2024-01-01", "count": 3})).unwrap();
        let mut state = StateDocument::default();
        state.advance(&ReplicationBookmark::new("users_count", "prod", "2024-01-01"));

        let mut writer = SingerWriter::new(Vec::new());
        writer.write_record("users_count", &record).unwrap();
        writer.write_state(&state).unwrap();

        let messages = lines(writer);
        assert_eq!(messages[0]["type"], "RECORD");
        assert_eq!(messages[0]["record"]["count"], 3);
        assert!(messages[0]["time_extracted"].is_string());
        assert_eq!(messages[1]["type"], "STATE");
        assert_eq!(
            messages[1]["value"]["bookmarks"]["users_count"]["partitions"][0]["replication_key_value"],
            "2024-01-01"
        );
    }

    #[test]
    fn test_discover_lists_every_stream() {
        let doc = discover_catalog();
        let streams = doc["streams"].as_array().unwrap();
        assert_eq!(streams.len(), catalog().len());
        assert!(streams.iter().all(|s| s["replication_key"] == "date"));
    }
}
