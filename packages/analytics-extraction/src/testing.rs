//! Testing utilities including mock implementations.
//!
//! These are useful for testing applications that use the extraction library
//! without talking to the Analytics API.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::{TransportError, TransportResult};
use crate::traits::transport::{PageRequest, PageResponse, Transport};
use crate::types::window::format_date;

/// Pages are keyed by endpoint path, ISO day and offset.
type PageKey = (String, String, u64);

/// Failure a [`MockTransport`] can inject before serving a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// Transient; the engine retries it.
    ConnectionReset,
    Timeout,
    /// Non-success HTTP status.
    Status(u16),
}

impl MockFailure {
    fn to_error(self, url: &str) -> TransportError {
        match self {
            MockFailure::ConnectionReset => TransportError::Connection("connection reset by peer".into()),
            MockFailure::Timeout => TransportError::Timeout("mock timeout".into()),
            MockFailure::Status(status) => TransportError::Status {
                status,
                url: url.to_string(),
                body: r#"{"message": "mock failure"}"#.into(),
            },
        }
    }
}

/// A mock transport for testing.
///
/// Serves predefined bodies per `(path, day, offset)`. A page that was not
/// registered answers with `{}`, which normalizes to zero records. Clones
/// share pages, failures and recorded calls.
#[derive(Default, Clone)]
pub struct MockTransport {
    /// Predefined bodies
    pages: Arc<RwLock<HashMap<PageKey, Value>>>,

    /// Failures still to inject, with remaining count
    failures: Arc<RwLock<HashMap<PageKey, (MockFailure, u32)>>>,

    /// Call tracking for assertions
    calls: Arc<RwLock<Vec<PageRequest>>>,
}

impl MockTransport {
    /// Create a new mock transport with no pages.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for the page of `path` on `date` (`YYYY-MM-DD`) at `offset`.
    pub fn with_page(self, path: &str, date: &str, offset: u64, body: Value) -> Self {
        self.pages
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key(path, date, offset), body);
        self
    }

    /// Fail the next `times` requests for that page before serving it.
    pub fn with_failures(self, path: &str, date: &str, offset: u64, failure: MockFailure, times: u32) -> Self {
        self.failures
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key(path, date, offset), (failure, times));
        self
    }

    /// Get all requests made to this mock, in order.
    pub fn calls(&self) -> Vec<PageRequest> {
        self.calls.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Clear recorded calls.
    pub fn clear_calls(&self) {
        self.calls.write().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

fn key(path: &str, date: &str, offset: u64) -> PageKey {
    (path.to_string(), date.to_string(), offset)
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, request: &PageRequest) -> TransportResult<PageResponse> {
        self.calls
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        let key = key(&request.path, &format_date(request.day), request.offset);
        let url = format!("mock://{}?offset={}", request.path, request.offset);

        {
            let mut failures = self.failures.write().unwrap_or_else(PoisonError::into_inner);
            if let Some((failure, remaining)) = failures.get_mut(&key) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(failure.to_error(&url));
                }
            }
        }

        let body = self
            .pages
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned()
            .unwrap_or_else(|| json!({}));

        Ok(PageResponse { status: 200, url, body })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Body of a count/rate endpoint with one `dates` entry per count.
pub fn dates_body(counts: &[u64]) -> Value {
    let dates: Vec<Value> = counts.iter().map(|count| json!({ "count": count })).collect();
    json!({ "count": counts.iter().sum::<u64>(), "dates": dates })
}

/// Body of a search-list endpoint with one `searches` entry per query.
pub fn searches_body(queries: &[&str]) -> Value {
    let searches: Vec<Value> = queries
        .iter()
        .map(|q| json!({ "search": q, "count": 1, "nbHits": 10 }))
        .collect();
    json!({ "searches": searches })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn request(day: &str, offset: u64) -> PageRequest {
        let day = NaiveDate::parse_from_str(day, "%Y-%m-%d").unwrap();
        PageRequest::new("/2/searches", "prod", day).with_page(offset, 2)
    }

    #[tokio::test]
    async fn test_mock_transport_serves_registered_pages() {
        let transport = MockTransport::new().with_page("/2/searches", "2024-05-05", 0, searches_body(&["a"]));

        let hit = transport.get(&request("2024-05-05", 0)).await.unwrap();
        assert_eq!(hit.body["searches"][0]["search"], "a");

        let miss = transport.get(&request("2024-05-06", 0)).await.unwrap();
        assert_eq!(miss.body, json!({}));

        assert_eq!(transport.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_mock_transport_failures_run_out() {
        let transport = MockTransport::new()
            .with_page("/2/searches", "2024-05-05", 0, searches_body(&["a"]))
            .with_failures("/2/searches", "2024-05-05", 0, MockFailure::ConnectionReset, 2);

        assert!(transport.get(&request("2024-05-05", 0)).await.unwrap_err().is_transient());
        assert!(transport.get(&request("2024-05-05", 0)).await.unwrap_err().is_transient());
        assert!(transport.get(&request("2024-05-05", 0)).await.is_ok());
    }

    #[tokio::test]
    async fn test_clones_share_calls() {
        let transport = MockTransport::new();
        let clone = transport.clone();
        clone.get(&request("2024-05-05", 0)).await.unwrap();
        assert_eq!(transport.calls().len(), 1);
        transport.clear_calls();
        assert!(clone.calls().is_empty());
    }

    #[test]
    fn test_bodies() {
        assert_eq!(dates_body(&[1, 2])["count"], 3);
        assert_eq!(dates_body(&[1, 2])["dates"].as_array().unwrap().len(), 2);
        assert_eq!(searches_body(&["x"])["searches"][0]["search"], "x");
    }
}
