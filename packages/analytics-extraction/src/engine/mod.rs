//! Incremental day-windowed extraction engine.
//!
//! One run covers one stream for one index:
//!
//! ```text
//! bookmark ─► DateRangeResolver ─► DayWindows ─► for each day:
//!                                                 PaginatedDayFetcher ─► ResponseNormalizer
//!                                                 ReplicationTracker ◄── record dates
//! ```
//!
//! Days run strictly in order and a day is drained before the next one is
//! requested. Nothing runs in parallel.

pub mod days;
pub mod fetcher;
pub mod normalizer;
pub mod resolver;
pub mod tracker;

pub use days::{iterate, DayWindows};
pub use fetcher::{PaginatedDayFetcher, RecordStream, RetryPolicy};
pub use normalizer::{NormalizedPage, ResponseNormalizer};
pub use resolver::DateRangeResolver;
pub use tracker::{BookmarkPolicy, ReplicationTracker};

use async_stream::try_stream;
use chrono::NaiveDate;
use futures::{Stream, StreamExt};
use std::pin::Pin;
use tracing::info;

use crate::error::{ConfigError, ExtractionError, Result};
use crate::traits::state::StateStore;
use crate::traits::transport::Transport;
use crate::types::config::EngineSettings;
use crate::types::endpoint::EndpointDescriptor;
use crate::types::record::{EnrichedRecord, ReplicationBookmark};
use crate::types::window::{ExtractionOverrides, ExtractionWindow};

/// Something a run produced, in emission order.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractEvent {
    Record(EnrichedRecord),
    /// Every page of this day was fetched.
    DayCompleted { date: NaiveDate, records: usize },
    /// The bookmark advanced and should be persisted.
    Checkpoint(ReplicationBookmark),
}

/// Lazy stream of run events.
pub type EventStream<'a> = Pin<Box<dyn Stream<Item = Result<ExtractEvent>> + Send + 'a>>;

/// Totals for a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub stream: String,
    pub index: String,
    pub days: usize,
    pub records: usize,
    /// Bookmark after the run, if any.
    pub bookmark: Option<String>,
}

/// Drives extraction runs against a transport and a state store.
pub struct Extractor<T: Transport, S: StateStore> {
    transport: T,
    store: S,
    settings: EngineSettings,
    today: Option<NaiveDate>,
}

impl<T: Transport, S: StateStore> Extractor<T, S> {
    pub fn new(transport: T, store: S, settings: EngineSettings) -> Self {
        Self {
            transport,
            store,
            settings,
            today: None,
        }
    }

    /// Pin "today" instead of reading the clock.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Window a run would cover given the stored bookmark and `overrides`.
    pub async fn resolve_window(
        &self,
        endpoint: &EndpointDescriptor,
        index: &str,
        overrides: &ExtractionOverrides,
    ) -> Result<ExtractionWindow> {
        let mut tracker = ReplicationTracker::new(endpoint.name, index, self.settings.bookmark_policy);
        let stored = tracker.starting_point(&self.store).await?;
        Ok(self.resolver(endpoint).resolve(stored.as_deref(), overrides))
    }

    fn resolver(&self, endpoint: &EndpointDescriptor) -> DateRangeResolver {
        let settings = self.settings.for_endpoint(endpoint);
        let mut resolver = DateRangeResolver::new(settings.window_days)
            .with_config_dates(self.settings.start_date.clone(), self.settings.end_date.clone());
        if let Some(today) = self.today {
            resolver = resolver.with_today(today);
        }
        resolver
    }

    /// Run one stream for one index.
    ///
    /// The stream ends after the last day, or right after the first error.
    /// An empty window ends it immediately with no events.
    pub fn run<'a>(
        &'a self,
        endpoint: &'static EndpointDescriptor,
        index: &'a str,
        overrides: &'a ExtractionOverrides,
    ) -> EventStream<'a> {
        Box::pin(self.events(endpoint, index, overrides))
    }

    fn events<'a>(
        &'a self,
        endpoint: &'static EndpointDescriptor,
        index: &'a str,
        overrides: &'a ExtractionOverrides,
    ) -> impl Stream<Item = Result<ExtractEvent>> + Send + 'a {
        try_stream! {
            if index.trim().is_empty() {
                Err::<(), ExtractionError>(ConfigError::NoIndices.into())?;
            }

            let settings = self.settings.for_endpoint(endpoint);
            let mut tracker = ReplicationTracker::new(endpoint.name, index, self.settings.bookmark_policy);
            let stored = tracker.starting_point(&self.store).await?;
            let window = self.resolver(endpoint).resolve(stored.as_deref(), overrides);

            if window.is_empty() {
                info!(
                    stream = endpoint.name,
                    index,
                    start = %window.start,
                    end = %window.end,
                    "Start date is after end date, skipping extraction"
                );
                return;
            }

            info!(
                stream = endpoint.name,
                index,
                start = %window.start,
                end = %window.end,
                days = window.day_count(),
                "Date range for extraction"
            );

            let fetcher = PaginatedDayFetcher::new(&self.transport, endpoint, &settings, self.settings.retry);
            for day in iterate(window, index, &overrides.extra) {
                info!(stream = endpoint.name, index, date = %day.date, "Processing day");

                let mut count = 0usize;
                let mut records = fetcher.fetch(&day);
                while let Some(record) = records.next().await {
                    let record = record?;
                    count += 1;
                    let advanced = tracker.observe(&record);
                    yield ExtractEvent::Record(record);
                    if let Some(bookmark) = advanced {
                        yield ExtractEvent::Checkpoint(bookmark);
                    }
                }

                info!(stream = endpoint.name, index, date = %day.date, count, "Processed records for day");
                yield ExtractEvent::DayCompleted { date: day.date, records: count };
                if let Some(bookmark) = tracker.complete_day() {
                    yield ExtractEvent::Checkpoint(bookmark);
                }
            }
        }
    }

    /// Run to completion. Every checkpoint is written to the state store
    /// before the event reaches `emit`.
    ///
    /// On error the store keeps the last checkpoint that was reached.
    pub async fn sync<F>(
        &self,
        endpoint: &'static EndpointDescriptor,
        index: &str,
        overrides: &ExtractionOverrides,
        mut emit: F,
    ) -> Result<RunSummary>
    where
        F: FnMut(&ExtractEvent) -> std::io::Result<()>,
    {
        let mut summary = RunSummary {
            stream: endpoint.name.to_string(),
            index: index.to_string(),
            ..RunSummary::default()
        };

        let mut events = self.run(endpoint, index, overrides);
        while let Some(event) = events.next().await {
            let event = event?;
            match &event {
                ExtractEvent::Record(_) => summary.records += 1,
                ExtractEvent::DayCompleted { .. } => summary.days += 1,
                ExtractEvent::Checkpoint(bookmark) => {
                    self.store.put_bookmark(bookmark).await?;
                    summary.bookmark = Some(bookmark.last_date.clone());
                }
            }
            emit(&event)?;
        }

        if summary.bookmark.is_none() {
            summary.bookmark = self.store.get_bookmark(endpoint.name, index).await?;
        }

        info!(
            stream = %summary.stream,
            index = %summary.index,
            days = summary.days,
            records = summary.records,
            bookmark = ?summary.bookmark,
            "Stream sync complete"
        );
        Ok(summary)
    }
}
