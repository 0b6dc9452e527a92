//! Optional TOML configuration file.
//!
//! Looked up at `<config_dir>/shopsync/config.toml` unless `--config` points
//! elsewhere. Every key is optional; a missing file means defaults.
//!
//! ```toml
//! site = "my-shop.myshopify.com"
//! access_token = "shpat_..."
//! api_version = "2024-01"
//!
//! [retry]
//! max_attempts = 3
//! base_delay_ms = 500
//! max_delay_ms = 8000
//! ```

use crate::error::{Result, SyncError};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Admin API version used when neither the config file nor a flag sets one.
pub const DEFAULT_API_VERSION: &str = "2024-01";

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub site: Option<String>,
    pub access_token: Option<String>,
    pub api_version: String,
    pub retry: RetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site: None,
            access_token: None,
            api_version: DEFAULT_API_VERSION.to_string(),
            retry: RetryConfig::default(),
        }
    }
}

/// Retry budget for a single per-item unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 8_000,
        }
    }
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

impl Config {
    /// Default config location (`~/.config/shopsync/config.toml` on Linux)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("shopsync").join("config.toml"))
    }

    /// Load config from an explicit path. The file must exist.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| SyncError::io(path, e))?;
        Self::parse(&text).map_err(|e| {
            SyncError::Config(format!("{}: {}", path.display(), e))
        })
    }

    /// Load the explicit path if given, otherwise the default location if present.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => {
                tracing::debug!("Loading config from {}", path.display());
                Self::from_file(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    fn parse(text: &str) -> std::result::Result<Self, String> {
        let config: Config = toml::from_str(text).map_err(|e| e.to_string())?;
        if config.retry.max_attempts == 0 {
            return Err("retry.max_attempts must be at least 1".to_string());
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api_version, DEFAULT_API_VERSION);
        assert_eq!(config.retry.max_attempts, 3);
        assert!(config.site.is_none());
    }

    #[test]
    fn test_parse_partial_file() {
        let config = Config::parse(
            r#"
site = "demo.myshopify.com"

[retry]
max_attempts = 5
"#,
        )
        .unwrap();
        assert_eq!(config.site.as_deref(), Some("demo.myshopify.com"));
        assert_eq!(config.retry.max_attempts, 5);
        // Unset keys keep their defaults
        assert_eq!(config.retry.base_delay_ms, 500);
        assert_eq!(config.api_version, DEFAULT_API_VERSION);
    }

    #[test]
    fn test_rejects_unknown_keys() {
        assert!(Config::parse("sitee = \"typo\"").is_err());
    }

    #[test]
    fn test_rejects_zero_attempts() {
        let err = Config::parse("[retry]\nmax_attempts = 0").unwrap_err();
        assert!(err.contains("max_attempts"));
    }

    #[test]
    fn test_from_file_reports_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "api_version = 12").unwrap();

        let err = Config::from_file(&path).unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn test_load_explicit_missing_file_is_error() {
        let temp = TempDir::new().unwrap();
        let err = Config::load(Some(&temp.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, SyncError::Io { .. }));
    }
}
