//! # Configuration State
//!
//! Stores application configuration loaded at startup.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`STOCKROOM_*`)
//! 2. Config file (`--config PATH`, else `stockroom.toml` in the platform
//!    config directory)
//! 3. Defaults (this file)
//!
//! ## Configuration File Format
//! ```toml
//! # stockroom.toml
//! backend_url = "https://abc.example.co"
//! anon_key = "eyJhbGciOi..."
//! request_timeout_secs = 30
//! currency_symbol = "$"
//! log_filter = "info,stockroom=debug"
//! # data_dir = "/var/lib/stockroom"
//! ```
//!
//! ## Thread Safety
//! Configuration is read-only after initialization, so no mutex needed.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use stockroom_backend::BackendConfig;
use stockroom_core::Money;

/// Default log filter when neither `RUST_LOG` nor the config sets one.
pub const DEFAULT_LOG_FILTER: &str = "info,stockroom=debug";

const CONFIG_FILE: &str = "stockroom.toml";
const STORE_FILE: &str = "local-store.json";

/// Configuration failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Missing configuration: {0} (set it in stockroom.toml or the environment)")]
    Missing(&'static str),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Could not determine the platform config directory")]
    NoProjectDirs,
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigState {
    /// Hosted backend project URL.
    pub backend_url: Option<String>,

    /// Public anonymous key of the backend project.
    pub anon_key: Option<String>,

    /// Directory for the local store. Default: platform data dir.
    pub data_dir: Option<PathBuf>,

    /// Per-request timeout for backend calls.
    pub request_timeout_secs: u64,

    /// Currency symbol (for display)
    pub currency_symbol: String,

    /// `tracing` filter directive, overridden by `RUST_LOG`.
    pub log_filter: String,
}

impl Default for ConfigState {
    fn default() -> Self {
        ConfigState {
            backend_url: None,
            anon_key: None,
            data_dir: None,
            request_timeout_secs: 30,
            currency_symbol: "$".to_string(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

fn project_dirs() -> Result<ProjectDirs, ConfigError> {
    ProjectDirs::from("com", "stockroom", "stockroom").ok_or(ConfigError::NoProjectDirs)
}

impl ConfigState {
    /// Loads defaults, then the config file, then environment overrides.
    ///
    /// An explicit `path` must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = project_dirs()?.config_dir().join(CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    debug!(?default_path, "No config file, using defaults");
                    ConfigState::default()
                }
            }
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings that would make every backend call fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Parses a TOML config file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: ConfigState = toml::from_str(&text)?;
        info!(?path, "Loaded config file");
        Ok(config)
    }

    /// Applies `STOCKROOM_*` overrides read through `lookup`.
    ///
    /// ## Environment Variables
    /// - `STOCKROOM_BACKEND_URL`
    /// - `STOCKROOM_ANON_KEY`
    /// - `STOCKROOM_DATA_DIR`
    /// - `STOCKROOM_TIMEOUT_SECS` (ignored unless a positive integer)
    /// - `STOCKROOM_CURRENCY_SYMBOL`
    /// - `STOCKROOM_LOG`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("STOCKROOM_BACKEND_URL") {
            self.backend_url = Some(url);
        }
        if let Some(key) = lookup("STOCKROOM_ANON_KEY") {
            self.anon_key = Some(key);
        }
        if let Some(dir) = lookup("STOCKROOM_DATA_DIR") {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(secs) = lookup("STOCKROOM_TIMEOUT_SECS").and_then(|s| s.trim().parse::<u64>().ok()) {
            if secs > 0 {
                self.request_timeout_secs = secs;
            }
        }
        if let Some(symbol) = lookup("STOCKROOM_CURRENCY_SYMBOL") {
            self.currency_symbol = symbol;
        }
        if let Some(filter) = lookup("STOCKROOM_LOG") {
            self.log_filter = filter;
        }
    }

    /// Backend connection settings; URL and key are required.
    pub fn backend_config(&self) -> Result<BackendConfig, ConfigError> {
        self.validate()?;
        let url = self
            .backend_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or(ConfigError::Missing("backend_url"))?;
        let key = self
            .anon_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::Missing("anon_key"))?;

        let config = BackendConfig::new(url, key).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(config.timeout(Duration::from_secs(self.request_timeout_secs)))
    }

    /// Where the local store file lives.
    pub fn store_path(&self) -> Result<PathBuf, ConfigError> {
        let dir = match &self.data_dir {
            Some(dir) => dir.clone(),
            None => project_dirs()?.data_dir().to_path_buf(),
        };
        Ok(dir.join(STORE_FILE))
    }

    /// Formats a cent amount with the configured symbol.
    pub fn format_currency(&self, cents: i64) -> String {
        Money::from_cents(cents).format_with(&self.currency_symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_file_then_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stockroom.toml");
        std::fs::write(
            &path,
            "backend_url = \"abc.example.co\"\nanon_key = \"file-key\"\ncurrency_symbol = \"€\"\n",
        )
        .unwrap();

        let mut config = ConfigState::from_file(&path).unwrap();
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.currency_symbol, "€");

        let env: HashMap<&str, &str> = [
            ("STOCKROOM_ANON_KEY", "env-key"),
            ("STOCKROOM_TIMEOUT_SECS", "5"),
        ]
        .into_iter()
        .collect();
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.anon_key.as_deref(), Some("env-key"));
        assert_eq!(config.backend_url.as_deref(), Some("abc.example.co"));

        let backend = config.backend_config().unwrap();
        assert_eq!(backend.url.as_str(), "https://abc.example.co/");
        assert_eq!(backend.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_bad_timeout_ignored() {
        let mut config = ConfigState::default();
        config.apply_env(|key| (key == "STOCKROOM_TIMEOUT_SECS").then(|| "0".to_string()));
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn test_zero_timeout_in_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stockroom.toml");
        std::fs::write(
            &path,
            "backend_url = \"abc.example.co\"\nanon_key = \"k\"\nrequest_timeout_secs = 0\n",
        )
        .unwrap();

        let result = ConfigState::load(Some(&path));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));

        let config = ConfigState::from_file(&path).unwrap();
        assert!(matches!(config.backend_config(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_missing_backend_settings() {
        let config = ConfigState::default();
        assert!(matches!(
            config.backend_config(),
            Err(ConfigError::Missing("backend_url"))
        ));
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = ConfigState::load(Some(&dir.path().join("nope.toml")));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stockroom.toml");
        std::fs::write(&path, "request_timeout_secs = \"soon\"").unwrap();
        assert!(matches!(ConfigState::from_file(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_store_path_and_currency() {
        let config = ConfigState {
            data_dir: Some(PathBuf::from("/tmp/stockroom")),
            ..ConfigState::default()
        };
        assert_eq!(config.store_path().unwrap(), PathBuf::from("/tmp/stockroom/local-store.json"));
        assert_eq!(config.format_currency(1234), "$12.34");
    }
}
