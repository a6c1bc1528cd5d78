//! Configuration types for the tap and the extraction engine.

use serde::Deserialize;
use std::str::FromStr;

use crate::engine::{BookmarkPolicy, RetryPolicy};
use crate::error::ConfigError;
use crate::security::credentials::{AlgoliaCredentials, SecretString};
use crate::types::endpoint::{catalog, find_endpoint, EndpointDescriptor};

/// Largest cold-start window the API accepts.
pub const MAX_WINDOW_DAYS: u32 = 365;

/// Algolia analytics region. Only affects the base URL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum Region {
    #[default]
    Us,
    Eu,
}

impl Region {
    pub fn base_url(&self) -> &'static str {
        match self {
            Region::Us => "https://analytics.us.algolia.com",
            Region::Eu => "https://analytics.de.algolia.com",
        }
    }
}

impl FromStr for Region {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "us" => Ok(Region::Us),
            "eu" | "de" => Ok(Region::Eu),
            other => Err(ConfigError::InvalidRegion(other.to_string())),
        }
    }
}

impl TryFrom<String> for Region {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

fn default_true() -> bool {
    true
}

/// Tap configuration, as read from the JSON config file.
#[derive(Debug, Clone, Deserialize)]
pub struct TapConfig {
    /// `X-Algolia-Application-Id`
    #[serde(default)]
    pub application_id: Option<String>,

    /// `X-Algolia-API-Key`, needs analytics permissions
    #[serde(default)]
    pub api_key: Option<SecretString>,

    /// Indices to sync analytics for.
    #[serde(default)]
    pub indices: Vec<String>,

    #[serde(default)]
    pub region: Region,

    /// Earliest date to sync when there is no bookmark yet.
    #[serde(default)]
    pub start_date: Option<String>,

    /// Latest date to sync. Defaults to today.
    #[serde(default)]
    pub end_date: Option<String>,

    /// Send `clickAnalytics=true` to endpoints that support it.
    #[serde(default = "default_true")]
    pub include_click_analytics: bool,

    /// Tag filter, e.g. `device:mobile`.
    #[serde(default)]
    pub tags: Option<String>,

    /// Cold-start lookback in days.
    #[serde(default)]
    pub date_window_size: Option<u32>,

    #[serde(default)]
    pub user_agent: Option<String>,

    /// Page size override for every stream.
    #[serde(default)]
    pub page_limit: Option<u32>,

    /// Streams to sync. Empty means all of them.
    #[serde(default)]
    pub streams: Vec<String>,
}

impl TapConfig {
    /// Parse a config document.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Fill credentials that the config file left out.
    pub fn with_fallback_credentials(
        mut self,
        application_id: Option<String>,
        api_key: Option<String>,
    ) -> Self {
        if self.application_id.as_deref().map_or(true, str::is_empty) {
            self.application_id = application_id;
        }
        if self.api_key.as_ref().map_or(true, |k| k.expose().is_empty()) {
            self.api_key = api_key.map(SecretString::from);
        }
        self
    }

    /// Reject configurations that cannot run. Called before any extraction.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.indices.iter().all(|i| i.trim().is_empty()) {
            return Err(ConfigError::NoIndices);
        }
        self.credentials()?;
        if let Some(days) = self.date_window_size {
            if days == 0 || days > MAX_WINDOW_DAYS {
                return Err(ConfigError::InvalidWindowSize(days));
            }
        }
        if self.page_limit == Some(0) {
            return Err(ConfigError::InvalidPageLimit);
        }
        self.selected_streams(&[])?;
        Ok(())
    }

    pub fn credentials(&self) -> Result<AlgoliaCredentials, ConfigError> {
        let application_id = self
            .application_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .ok_or(ConfigError::MissingCredential("application_id"))?;
        let api_key = self
            .api_key
            .clone()
            .filter(|key| !key.expose().trim().is_empty())
            .ok_or(ConfigError::MissingCredential("api_key"))?;
        Ok(AlgoliaCredentials::new(application_id, api_key))
    }

    /// Non-blank indices in config order.
    pub fn indices(&self) -> impl Iterator<Item = &str> {
        self.indices
            .iter()
            .map(|i| i.trim())
            .filter(|i| !i.is_empty())
    }

    /// Streams to run. `filter` (e.g. from the command line) narrows the
    /// configured selection further.
    pub fn selected_streams(
        &self,
        filter: &[String],
    ) -> Result<Vec<&'static EndpointDescriptor>, ConfigError> {
        let names: &[String] = if filter.is_empty() { &self.streams } else { filter };
        if names.is_empty() {
            return Ok(catalog().iter().collect());
        }
        names
            .iter()
            .map(|name| find_endpoint(name).ok_or_else(|| ConfigError::UnknownStream(name.clone())))
            .collect()
    }

    /// Engine settings derived from this config.
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            page_limit: self.page_limit,
            window_days: self.date_window_size,
            include_click_analytics: self.include_click_analytics,
            tags: self.tags.clone().filter(|t| !t.trim().is_empty()),
            start_date: self.start_date.clone(),
            end_date: self.end_date.clone(),
            ..EngineSettings::default()
        }
    }
}

/// Settings shared by every stream in a run.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Overrides each endpoint's page size when set.
    pub page_limit: Option<u32>,
    /// Overrides each endpoint's cold-start window when set.
    pub window_days: Option<u32>,
    pub include_click_analytics: bool,
    pub tags: Option<String>,
    /// Configured start date, used when there is no bookmark.
    pub start_date: Option<String>,
    /// Configured end date, used when the caller gives none.
    pub end_date: Option<String>,
    pub bookmark_policy: BookmarkPolicy,
    pub retry: RetryPolicy,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            page_limit: None,
            window_days: None,
            include_click_analytics: true,
            tags: None,
            start_date: None,
            end_date: None,
            bookmark_policy: BookmarkPolicy::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl EngineSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page_limit(mut self, limit: u32) -> Self {
        self.page_limit = Some(limit);
        self
    }

    pub fn with_window_days(mut self, days: u32) -> Self {
        self.window_days = Some(days);
        self
    }

    pub fn with_tags(mut self, tags: impl Into<String>) -> Self {
        self.tags = Some(tags.into());
        self
    }

    pub fn with_click_analytics(mut self, enabled: bool) -> Self {
        self.include_click_analytics = enabled;
        self
    }

    pub fn with_bookmark_policy(mut self, policy: BookmarkPolicy) -> Self {
        self.bookmark_policy = policy;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Resolve the per-stream values once, before the run starts.
    ///
    /// The window is clamped to `1..=MAX_WINDOW_DAYS`.
    pub fn for_endpoint(&self, endpoint: &EndpointDescriptor) -> StreamSettings {
        StreamSettings {
            page_limit: self.page_limit.unwrap_or(endpoint.page_limit).max(1),
            window_days: self
                .window_days
                .unwrap_or(endpoint.default_window_days)
                .clamp(1, MAX_WINDOW_DAYS),
            click_analytics: endpoint.supports_click_analytics && self.include_click_analytics,
            tags: self.tags.clone(),
        }
    }
}

/// Fully resolved settings for one stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSettings {
    pub page_limit: u32,
    pub window_days: u32,
    pub click_analytics: bool,
    pub tags: Option<String>,
}
