//! Config file loading with environment fallback for credentials.

use analytics_extraction::{ConfigError, TapConfig};
use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::path::Path;

pub const APPLICATION_ID_ENV: &str = "ALGOLIA_APPLICATION_ID";
pub const API_KEY_ENV: &str = "ALGOLIA_API_KEY";

/// Load and validate the config at `path`, filling missing credentials from
/// the process environment.
pub fn load_config(path: &Path) -> Result<TapConfig> {
    load_config_with(path, |key| env::var(key).ok())
}

/// Same as [`load_config`] with an explicit environment lookup.
pub fn load_config_with(path: &Path, env: impl Fn(&str) -> Option<String>) -> Result<TapConfig> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Load {
        path: path.display().to_string(),
        source,
    })?;

    let config = TapConfig::from_json(&raw)
        .with_context(|| format!("Invalid config file {}", path.display()))?
        .with_fallback_credentials(env(APPLICATION_ID_ENV), env(API_KEY_ENV));

    config
        .validate()
        .with_context(|| format!("Invalid config file {}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn write_config(dir: &tempfile::TempDir, body: &str) -> std::path::PathBuf {
        let path = dir.path().join("config.json");
        fs::write(&path, body).unwrap();
        path
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_loads_file_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"{"application_id": "APP", "api_key": "KEY", "indices": ["prod"], "region": "eu"}"#,
        );

        let config = load_config_with(&path, no_env).unwrap();
        assert_eq!(config.application_id.as_deref(), Some("APP"));
        assert_eq!(config.indices().collect::<Vec<_>>(), vec!["prod"]);
    }

    #[test]
    fn test_env_fills_missing_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, r#"{"indices": ["prod"]}"#);
        let env: HashMap<&str, &str> = [(APPLICATION_ID_ENV, "ENVAPP"), (API_KEY_ENV, "ENVKEY")].into();

        let config = load_config_with(&path, |k| env.get(k).map(|v| v.to_string())).unwrap();
        let credentials = config.credentials().unwrap();
        assert_eq!(credentials.application_id, "ENVAPP");
        assert_eq!(credentials.api_key.expose(), "ENVKEY");
    }

    #[test]
    fn test_file_credentials_win_over_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"{"application_id": "APP", "api_key": "KEY", "indices": ["prod"]}"#,
        );

        let config = load_config_with(&path, |_| Some("ENV".to_string())).unwrap();
        assert_eq!(config.credentials().unwrap().application_id, "APP");
    }

    #[test]
    fn test_missing_indices_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, r#"{"application_id": "APP", "api_key": "KEY", "indices": []}"#);

        let err = load_config_with(&path, no_env).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::NoIndices)
        ));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config_with(&dir.path().join("nope.json"), no_env).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::Load { .. })
        ));
    }
}
