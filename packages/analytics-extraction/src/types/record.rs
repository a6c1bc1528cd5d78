//! Records emitted by the engine and the bookmark they advance.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;

/// An endpoint entry as returned by the API. Shape varies per endpoint.
pub type RawRecord = Map<String, Value>;

/// A raw record plus `index_name` and `date` (always `YYYY-MM-DD`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnrichedRecord(Map<String, Value>);

impl EnrichedRecord {
    pub(crate) fn from_map(fields: RawRecord) -> Self {
        Self(fields)
    }

    pub fn index_name(&self) -> Option<&str> {
        self.0.get("index_name").and_then(Value::as_str)
    }

    /// The replication key value.
    pub fn date(&self) -> Option<&str> {
        self.0.get("date").and_then(Value::as_str)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Read a numeric field as an exact decimal.
    ///
    /// Numbers keep their original literal, so `0.1` reads back as exactly
    /// `0.1`. Numeric strings are accepted as well.
    pub fn decimal(&self, field: &str) -> Option<Decimal> {
        let literal = match self.0.get(field)? {
            Value::Number(n) => n.to_string(),
            Value::String(s) => s.clone(),
            _ => return None,
        };
        Decimal::from_str(&literal)
            .or_else(|_| Decimal::from_scientific(&literal))
            .ok()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<EnrichedRecord> for Value {
    fn from(record: EnrichedRecord) -> Self {
        Value::Object(record.0)
    }
}

/// The resumable position for one `(stream, index)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationBookmark {
    pub stream_id: String,
    pub index: String,
    /// Latest completed `date`, `YYYY-MM-DD`.
    pub last_date: String,
}

impl ReplicationBookmark {
    pub fn new(
        stream_id: impl Into<String>,
        index: impl Into<String>,
        last_date: impl Into<String>,
    ) -> Self {
        Self {
            stream_id: stream_id.into(),
            index: index.into(),
            last_date: last_date.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(body: &str) -> EnrichedRecord {
        let fields: Map<String, Value> = serde_json::from_str(body).unwrap();
        EnrichedRecord::from_map(fields)
    }

    #[test]
    fn test_rate_keeps_its_literal() {
        let r = record(r#"{"rate": 0.1, "date": "2024-05-05"}"#);
        assert_eq!(r.get("rate").unwrap().to_string(), "0.1");
        assert_eq!(r.decimal("rate"), Some(Decimal::new(1, 1)));
        assert_eq!(r.decimal("rate").unwrap().to_string(), "0.1");
    }

    #[test]
    fn test_decimal_handles_strings_exponents_and_missing() {
        let r = record(r#"{"a": "0.25", "b": 1e-3, "c": true, "d": 42}"#);
        assert_eq!(r.decimal("a"), Some(Decimal::new(25, 2)));
        assert_eq!(r.decimal("b"), Some(Decimal::new(1, 3)));
        assert_eq!(r.decimal("c"), None);
        assert_eq!(r.decimal("d"), Some(Decimal::from(42)));
        assert_eq!(r.decimal("missing"), None);
    }

    #[test]
    fn test_serializes_as_flat_object() {
        let r = record(r#"{"search": "shoes", "count": 10}"#);
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(json, r#"{"count":10,"search":"shoes"}"#);
    }
}
