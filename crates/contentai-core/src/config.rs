//! Client configuration.
//!
//! Settings live in `config.json` inside the config directory
//! (see [`crate::paths::config_dir`]). A missing file means defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// API base used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/api";

/// Environment variable that overrides `baseUrl`.
pub const API_URL_ENV: &str = "CONTENTAI_API_URL";

const CONFIG_FILE: &str = "config.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Settings for talking to the content-assistant API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Base URL of the API, e.g. `http://127.0.0.1:8000/api`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// User id to use when nobody is signed in.
    #[serde(default)]
    pub user_id: Option<String>,

    /// Bound on connection setup. Reads are never timed out.
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,

    /// Directory for raw stream transcripts. Disabled when unset.
    #[serde(default)]
    pub log_dir: Option<String>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_id: None,
            connect_timeout_secs: None,
            log_dir: None,
        }
    }
}

impl ClientConfig {
    /// Load `config.json` from `dir`, falling back to defaults if absent.
    pub fn load(dir: &Path) -> Result<Self, ConfigError> {
        let file_path = dir.join(CONFIG_FILE);
        if !file_path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(&file_path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Save to `config.json` in `dir` (write temp file, then rename).
    pub fn save(&self, dir: &Path) -> Result<(), ConfigError> {
        fs::create_dir_all(dir)?;
        let file_path = dir.join(CONFIG_FILE);
        let temp_path = dir.join(format!("{CONFIG_FILE}.tmp"));
        fs::write(&temp_path, serde_json::to_string_pretty(self)?)?;
        fs::rename(&temp_path, &file_path)?;
        Ok(())
    }

    /// Apply `$CONTENTAI_API_URL` if set.
    pub fn with_env_overrides(self) -> Self {
        self.with_base_url(std::env::var(API_URL_ENV).ok())
    }

    /// Replace the base URL when `url` is a non-empty value.
    pub fn with_base_url(mut self, url: Option<String>) -> Self {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            self.base_url = url.trim().to_string();
        }
        self
    }

    /// Build the absolute URL for an API path such as `sessions/abc`.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn load_missing_file_returns_defaults() {
        let dir = tempdir().unwrap();
        let config = ClientConfig::load(dir.path()).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn save_then_load_preserves_fields() {
        let dir = tempdir().unwrap();
        let config = ClientConfig {
            base_url: "https://api.example.com/api".to_string(),
            user_id: Some("writer@example.com".to_string()),
            connect_timeout_secs: Some(5),
            log_dir: Some("/tmp/logs".to_string()),
        };
        config.save(dir.path()).unwrap();

        assert!(!dir.path().join("config.json.tmp").exists());
        assert_eq!(ClientConfig::load(dir.path()).unwrap(), config);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("config.json"), r#"{"userId":"a@b.c"}"#).unwrap();

        let config = ClientConfig::load(dir.path()).unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.user_id.as_deref(), Some("a@b.c"));
        assert!(config.connect_timeout().is_none());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("config.json"), "{not json").unwrap();
        assert!(matches!(
            ClientConfig::load(dir.path()),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn endpoint_joins_without_double_slashes() {
        let config = ClientConfig::default().with_base_url(Some("http://host/api/".into()));
        assert_eq!(config.endpoint("/chat"), "http://host/api/chat");
        assert_eq!(config.endpoint("sessions/x"), "http://host/api/sessions/x");
    }

    #[test]
    fn blank_override_is_ignored() {
        let config = ClientConfig::default().with_base_url(Some("   ".into()));
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }
}
