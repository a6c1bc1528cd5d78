//! Algolia credentials. The API key is held in a `secrecy` box so it only
//! leaves memory as a request header.

use secrecy::{ExposeSecret, SecretBox};
use serde::{Deserialize, Deserializer};
use std::fmt;

/// API key wrapper. Formats as `[REDACTED]` and deserializes from a plain
/// JSON string, so it can sit directly in [`TapConfig`](crate::TapConfig).
pub struct SecretString(SecretBox<str>);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretBox::new(value.into().into_boxed_str()))
    }

    /// The raw key, for the `X-Algolia-API-Key` header and blank checks.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl Clone for SecretString {
    fn clone(&self) -> Self {
        Self::new(self.expose().to_string())
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl<'de> Deserialize<'de> for SecretString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(SecretString::new)
    }
}

/// Static credentials for the Analytics API. There is no refresh.
#[derive(Clone)]
pub struct AlgoliaCredentials {
    pub application_id: String,
    pub api_key: SecretString,
}

impl AlgoliaCredentials {
    pub fn new(application_id: impl Into<String>, api_key: impl Into<SecretString>) -> Self {
        Self {
            application_id: application_id.into(),
            api_key: api_key.into(),
        }
    }

    /// Header pairs sent with every request.
    pub fn headers(&self) -> [(&'static str, &str); 2] {
        [
            ("X-Algolia-Application-Id", self.application_id.as_str()),
            ("X-Algolia-API-Key", self.api_key.expose()),
        ]
    }
}

impl fmt::Debug for AlgoliaCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlgoliaCredentials")
            .field("application_id", &self.application_id)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_is_redacted() {
        let key = SecretString::new("a1b2c3-analytics");
        assert_eq!(format!("{key:?}"), "[REDACTED]");
        assert_eq!(key.to_string(), "[REDACTED]");
        assert_eq!(key.expose(), "a1b2c3-analytics");
    }

    #[test]
    fn test_api_key_from_config_json() {
        #[derive(Deserialize)]
        struct Keys {
            api_key: SecretString,
        }
        let keys: Keys = serde_json::from_str(r#"{"api_key": "from-config"}"#).unwrap();
        assert_eq!(keys.api_key.expose(), "from-config");
        assert_eq!(keys.api_key.clone().expose(), "from-config");
    }

    #[test]
    fn test_credentials_headers_and_debug() {
        let creds = AlgoliaCredentials::new("APP123", "api-key-value");
        let headers = creds.headers();
        assert_eq!(headers[0], ("X-Algolia-Application-Id", "APP123"));
        assert_eq!(headers[1], ("X-Algolia-API-Key", "api-key-value"));

        let debug = format!("{:?}", creds);
        assert!(debug.contains("APP123"));
        assert!(!debug.contains("api-key-value"));
    }
}
