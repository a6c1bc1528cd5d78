//! HTTP transport for the Algolia Analytics REST API.
//!
//! Rate limiting (429), server errors (5xx) and timeouts are retried here with
//! exponential backoff. Connection failures are left to the engine.

use async_trait::async_trait;
use std::error::Error as StdError;
use std::time::Duration;
use tracing::{debug, warn};

use crate::engine::RetryPolicy;
use crate::error::{TransportError, TransportResult};
use crate::security::AlgoliaCredentials;
use crate::traits::transport::{PageRequest, PageResponse, Transport};
use crate::types::config::Region;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default `User-Agent`: `tap-algolia/<version>`.
pub const DEFAULT_USER_AGENT: &str = concat!("tap-algolia/", env!("CARGO_PKG_VERSION"));

/// reqwest-backed [`Transport`].
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    credentials: AlgoliaCredentials,
    user_agent: String,
    retry: RetryPolicy,
}

impl HttpTransport {
    pub fn new(credentials: AlgoliaCredentials, region: Region) -> TransportResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| TransportError::Request(Box::new(e)))?;
        Ok(Self {
            client,
            base_url: region.base_url().to_string(),
            credentials,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            retry: RetryPolicy::default(),
        })
    }

    /// Backoff for 429, 5xx and timeout responses.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Point at another host, e.g. a local mock server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Use a preconfigured client.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send(&self, request: &PageRequest) -> TransportResult<PageResponse> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self
            .client
            .get(&url)
            .query(&request.query_params())
            .header(reqwest::header::USER_AGENT, self.user_agent.as_str());
        for (name, value) in self.credentials.headers() {
            builder = builder.header(name, value);
        }

        let resp = builder.send().await.map_err(classify)?;
        let status = resp.status();
        let url = resp.url().to_string();
        debug!(status = status.as_u16(), url = %url, "Analytics API response");

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                url,
                body,
            });
        }

        let bytes = resp.bytes().await.map_err(classify)?;
        let body = serde_json::from_slice(&bytes)?;
        Ok(PageResponse {
            status: status.as_u16(),
            url,
            body,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, request: &PageRequest) -> TransportResult<PageResponse> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.send(request).await {
                Err(e) if should_retry(&e) && attempt < self.retry.max_attempts => {
                    let delay = self.retry.delay_for_attempt(attempt);
                    warn!(
                        path = %request.path,
                        date = %request.day,
                        offset = request.offset,
                        attempt,
                        delay_secs = delay.as_secs_f64(),
                        error = %e,
                        "Retrying request"
                    );
                    tokio::time::sleep(delay).await;
                }
                result => return result,
            }
        }
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Failures the API may recover from on its own.
fn should_retry(err: &TransportError) -> bool {
    match err {
        TransportError::Timeout(_) => true,
        TransportError::Status { status, .. } => *status == 429 || (500..600).contains(status),
        _ => false,
    }
}

/// Map a reqwest failure onto the transport error taxonomy.
fn classify(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(err.to_string())
    } else if err.is_connect() || connection_dropped(&err) {
        TransportError::Connection(err.to_string())
    } else {
        TransportError::Request(Box::new(err))
    }
}

/// Whether an I/O error somewhere in the source chain is a dropped connection.
fn connection_dropped(err: &(dyn StdError + 'static)) -> bool {
    let mut source = Some(err);
    while let Some(e) = source {
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            if matches!(
                io.kind(),
                std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::BrokenPipe
            ) {
                return true;
            }
        }
        source = e.source();
    }
    false
}
