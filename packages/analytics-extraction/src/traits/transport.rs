//! Transport trait for issuing page requests.
//!
//! The engine only needs one operation: GET a page of an endpoint for a
//! single day and hand back the decoded JSON body. Transport-level retries
//! (e.g. on 5xx) belong to the implementation; the engine itself only
//! retries connection failures.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::TransportResult;
use crate::types::window::format_date;

/// One offset-limited page of an endpoint for a single day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Endpoint path, e.g. `/2/searches`
    pub path: String,
    pub index: String,
    pub day: NaiveDate,
    pub offset: u64,
    pub limit: u32,
    /// `tags`, `clickAnalytics` and endpoint-specific parameters
    pub filters: BTreeMap<String, String>,
}

impl PageRequest {
    pub fn new(path: impl Into<String>, index: impl Into<String>, day: NaiveDate) -> Self {
        Self {
            path: path.into(),
            index: index.into(),
            day,
            offset: 0,
            limit: 1,
            filters: BTreeMap::new(),
        }
    }

    pub fn with_page(mut self, offset: u64, limit: u32) -> Self {
        self.offset = offset;
        self.limit = limit;
        self
    }

    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(key.into(), value.into());
        self
    }

    /// Query string parameters. `startDate` and `endDate` are always equal.
    pub fn query_params(&self) -> Vec<(String, String)> {
        let day = format_date(self.day);
        let mut params = vec![
            ("index".to_string(), self.index.clone()),
            ("startDate".to_string(), day.clone()),
            ("endDate".to_string(), day),
            ("limit".to_string(), self.limit.to_string()),
            ("offset".to_string(), self.offset.to_string()),
        ];
        params.extend(self.filters.iter().map(|(k, v)| (k.clone(), v.clone())));
        params
    }
}

/// A successful response.
#[derive(Debug, Clone, PartialEq)]
pub struct PageResponse {
    pub status: u16,
    /// Final request URL, query string included.
    pub url: String,
    pub body: Value,
}

/// Issues page requests against the analytics API.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch one page.
    ///
    /// Connection-level failures must surface as
    /// [`TransportError::Connection`](crate::error::TransportError::Connection)
    /// so the engine can retry them.
    async fn get(&self, request: &PageRequest) -> TransportResult<PageResponse>;

    /// Name of this transport (for logging).
    fn name(&self) -> &str {
        "transport"
    }
}
