//! Paginated fetching of a single day, with retry on connection failures.

use async_stream::try_stream;
use futures::Stream;
use std::pin::Pin;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::engine::normalizer::ResponseNormalizer;
use crate::error::{ExtractionError, Result};
use crate::traits::transport::{PageRequest, PageResponse, Transport};
use crate::types::config::StreamSettings;
use crate::types::endpoint::EndpointDescriptor;
use crate::types::record::EnrichedRecord;
use crate::types::window::DayContext;

/// Lazy stream of records for one day.
pub type RecordStream<'a> = Pin<Box<dyn Stream<Item = Result<EnrichedRecord>> + Send + 'a>>;

/// Bounded exponential backoff for transient failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per page request, the first one included.
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay after the `attempt`-th failure: `base × 2^(attempt-1)`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

/// Pages through one endpoint for one day at a time.
pub struct PaginatedDayFetcher<'a, T: Transport> {
    transport: &'a T,
    endpoint: &'static EndpointDescriptor,
    settings: &'a StreamSettings,
    retry: RetryPolicy,
    normalizer: ResponseNormalizer,
}

impl<'a, T: Transport> PaginatedDayFetcher<'a, T> {
    pub fn new(
        transport: &'a T,
        endpoint: &'static EndpointDescriptor,
        settings: &'a StreamSettings,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            endpoint,
            settings,
            retry,
            normalizer: ResponseNormalizer::for_endpoint(endpoint),
        }
    }

    /// Request for the page of `day` starting at `offset`.
    pub fn page_request(&self, day: &DayContext, offset: u64) -> PageRequest {
        let mut request = PageRequest::new(self.endpoint.path, day.index.as_str(), day.date)
            .with_page(offset, self.settings.page_limit);
        if let Some(tags) = &self.settings.tags {
            request = request.with_filter("tags", tags.as_str());
        }
        if self.settings.click_analytics {
            request = request.with_filter("clickAnalytics", "true");
        }
        for (key, value) in self.endpoint.extra_params {
            request = request.with_filter(*key, *value);
        }
        request
    }

    /// Stream every record of `day`.
    ///
    /// A page shorter than the page limit ends the day. Records of earlier
    /// pages are yielded before later pages are requested, so a failure on
    /// a later page surfaces after those records.
    pub fn fetch(&self, day: &DayContext) -> RecordStream<'_> {
        Box::pin(self.pages(day.clone()))
    }

    fn pages(&self, day: DayContext) -> impl Stream<Item = Result<EnrichedRecord>> + Send + '_ {
        try_stream! {
            let limit = u64::from(self.settings.page_limit);
            let mut offset = 0u64;
            loop {
                let request = self.page_request(&day, offset);
                let response = self.send_with_retry(&request, &day).await?;
                let page = self.normalizer.normalize(&response.body, &day);
                debug!(
                    stream = self.endpoint.name,
                    index = %day.index,
                    date = %day.date,
                    offset,
                    returned = page.raw_len,
                    "Fetched page"
                );

                for record in page.records {
                    yield record;
                }

                if page.raw_len as u64 == limit {
                    offset += limit;
                } else {
                    break;
                }
            }
        }
    }

    async fn send_with_retry(&self, request: &PageRequest, day: &DayContext) -> Result<PageResponse> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.transport.get(request).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_transient() => {
                    if attempt >= self.retry.max_attempts {
                        error!(
                            stream = self.endpoint.name,
                            date = %day.date,
                            attempts = attempt,
                            error = %e,
                            "Giving up after repeated connection failures"
                        );
                        return Err(ExtractionError::RetriesExhausted {
                            date: day.iso_date(),
                            attempts: attempt,
                            source: e,
                        });
                    }
                    let delay = self.retry.delay_for_attempt(attempt);
                    warn!(
                        stream = self.endpoint.name,
                        date = %day.date,
                        offset = request.offset,
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        delay_secs = delay.as_secs_f64(),
                        error = %e,
                        "Connection failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    error!(
                        stream = self.endpoint.name,
                        date = %day.date,
                        error = %e,
                        "Error fetching page"
                    );
                    return Err(ExtractionError::Fetch {
                        date: day.iso_date(),
                        source: e,
                    });
                }
            }
        }
    }
}
