//! Incremental Analytics Extraction Library
//!
//! Pulls daily metrics from the Algolia Analytics REST API one day at a
//! time, paginates each day to exhaustion, stamps every record with its day
//! and index, and tracks a per-`(stream, index)` bookmark so the next run
//! resumes the day after the last completed one.
//!
//! # Usage
//!
//! ```rust,ignore
//! use analytics_extraction::{
//!     find_endpoint, EngineSettings, ExtractionOverrides, Extractor, FileStateStore,
//!     HttpTransport, AlgoliaCredentials, Region,
//! };
//!
//! let transport = HttpTransport::new(AlgoliaCredentials::new("APP", "key"), Region::Us)?;
//! let store = FileStateStore::open("state.json").await?;
//! let extractor = Extractor::new(transport, store, EngineSettings::new());
//!
//! let endpoint = find_endpoint("top_searches").unwrap();
//! let summary = extractor
//!     .sync(endpoint, "prod", &ExtractionOverrides::new(), |event| {
//!         println!("{event:?}");
//!         Ok(())
//!     })
//!     .await?;
//! ```
//!
//! # Modules
//!
//! - [`engine`] - Date resolution, day iteration, pagination, normalization, bookmarks
//! - [`traits`] - Transport and state store abstractions
//! - [`types`] - Config, endpoint catalog, records, state document
//! - [`transports`] - reqwest-backed HTTP transport
//! - [`stores`] - In-memory and file state stores
//! - [`security`] - Credential handling
//! - [`testing`] - Mock transport for testing

pub mod engine;
pub mod error;
pub mod security;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod transports;
pub mod types;

// Re-export core types at crate root
pub use engine::{
    BookmarkPolicy, DateRangeResolver, EventStream, ExtractEvent, Extractor, PaginatedDayFetcher,
    ReplicationTracker, ResponseNormalizer, RetryPolicy, RunSummary,
};
pub use error::{ConfigError, ExtractionError, Result, StateError, TransportError};
pub use security::{AlgoliaCredentials, SecretString};
pub use stores::{FileStateStore, MemoryStateStore};
pub use traits::{
    state::StateStore,
    transport::{PageRequest, PageResponse, Transport},
};
pub use transports::HttpTransport;
pub use types::{
    config::{EngineSettings, Region, StreamSettings, TapConfig},
    endpoint::{catalog, find_endpoint, EndpointDescriptor, RecordArray},
    record::{EnrichedRecord, ReplicationBookmark},
    state::StateDocument,
    window::{DayContext, ExtractionOverrides, ExtractionWindow},
};
