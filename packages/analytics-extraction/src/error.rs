//! Typed errors for the analytics extraction library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling.

use thiserror::Error;

/// Errors that can occur during an extraction run.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Configuration rejected before extraction began
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Persisted state could not be read or written
    #[error("state error: {0}")]
    State(#[from] StateError),

    /// A transient failure kept recurring until the attempt budget ran out
    #[error("fetch for {date} failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        date: String,
        attempts: u32,
        #[source]
        source: TransportError,
    },

    /// A non-transient failure while fetching a page
    #[error("fetch for {date} failed: {source}")]
    Fetch {
        date: String,
        #[source]
        source: TransportError,
    },

    /// Emitting an event to the consumer failed
    #[error("output error: {0}")]
    Output(#[from] std::io::Error),
}

/// Errors raised by a [`Transport`](crate::traits::transport::Transport).
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection reset, refused or aborted before a response arrived
    #[error("connection failed: {0}")]
    Connection(String),

    /// Request timed out
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Non-success HTTP status
    #[error("HTTP {status} from {url}: {body}")]
    Status {
        status: u16,
        url: String,
        body: String,
    },

    /// Response body was not valid JSON
    #[error("response decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Any other request failure
    #[error("request error: {0}")]
    Request(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl TransportError {
    /// Only connection-level failures are worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, TransportError::Connection(_))
    }
}

/// Errors from a [`StateStore`](crate::traits::state::StateStore).
#[derive(Debug, Error)]
pub enum StateError {
    #[error("state I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("state JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration errors. All of them are fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No index to extract
    #[error("no indices specified in configuration, at least one index is required")]
    NoIndices,

    /// Required credential missing
    #[error("missing credential: {0}")]
    MissingCredential(&'static str),

    /// Region other than `us` or `eu`
    #[error("invalid region: {0} (expected \"us\" or \"eu\")")]
    InvalidRegion(String),

    /// Stream name not present in the catalog
    #[error("unknown stream: {0}")]
    UnknownStream(String),

    /// Cold-start window outside 1..=365 days
    #[error("invalid date window size: {0} (expected 1..=365)")]
    InvalidWindowSize(u32),

    /// Page size of zero
    #[error("page limit must be greater than zero")]
    InvalidPageLimit,

    /// Config file could not be read
    #[error("failed to read config {path}: {source}")]
    Load {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Config file was not valid JSON for [`TapConfig`](crate::types::config::TapConfig)
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractionError>;

/// Result type alias for transport operations.
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Result type alias for state store operations.
pub type StateResult<T> = std::result::Result<T, StateError>;
