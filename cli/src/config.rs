//! Centralized configuration management.
//!
//! Every environment variable is read and validated once at startup through
//! this module, so a missing credential fails before any request is made.

use sleeve::{aggregator::DEFAULT_AGGREGATOR_URL, discogs::DEFAULT_API_URL, Result, SleeveError};
use std::{path::PathBuf, time::Duration};

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Catalog API personal token (required)
    pub discogs_token: String,
    /// Account whose collection is published (required)
    pub discogs_username: String,
    /// Catalog API base URL (default: "https://api.discogs.com")
    pub discogs_api_url: String,
    /// Collection page size (default: 100)
    pub per_page: u32,
    /// First collection page to request (default: 1)
    pub start_page: u32,
    /// Pause between page requests (default: 1100ms)
    pub request_delay: Duration,
    /// SQLite cache URL (default: "sqlite:sleeve-cache.db")
    pub cache_db: String,
    /// Processing registry file (default: "processed_releases.json")
    pub registry_path: PathBuf,
    /// Root the documents are written under (default: "content/music")
    pub content_dir: PathBuf,
    /// Body lines below which a document is shown in full (default: 25)
    pub full_threshold: usize,
    /// Directory for run logs (default: "logs")
    pub log_dir: PathBuf,
    /// Link aggregator base URL
    pub aggregator_url: String,
    /// Preview program, run before publishing when set
    pub preview_command: Option<String>,
    /// Downstream queue file, appended to when set
    pub queue_file: Option<PathBuf>,
    /// How long a prompt waits before taking its default (default: 120s)
    pub confirm_timeout: Duration,
}

impl AppConfig {
    /// Load configuration from the process environment.
    ///
    /// Returns `NotConfigured` if `DISCOGS_TOKEN` or `DISCOGS_USERNAME` is
    /// missing, or if a numeric variable does not parse.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| var(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| {
            var(key).ok_or_else(|| {
                SleeveError::NotConfigured(format!("Missing required {key} env var"))
            })
        };
        let or = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        Ok(Self {
            discogs_token: required("DISCOGS_TOKEN")?,
            discogs_username: required("DISCOGS_USERNAME")?,
            discogs_api_url: or("DISCOGS_API_URL", DEFAULT_API_URL),
            per_page: number(&var, "SLEEVE_PER_PAGE", 100)?,
            start_page: number(&var, "SLEEVE_START_PAGE", 1)?,
            request_delay: Duration::from_millis(number(&var, "SLEEVE_REQUEST_DELAY_MS", 1100)?),
            cache_db: or("SLEEVE_CACHE_DB", "sqlite:sleeve-cache.db"),
            registry_path: or("SLEEVE_REGISTRY", "processed_releases.json").into(),
            content_dir: or("SLEEVE_CONTENT_DIR", "content/music").into(),
            full_threshold: number(&var, "SLEEVE_FULL_THRESHOLD", 25)?,
            log_dir: or("SLEEVE_LOG_DIR", "logs").into(),
            aggregator_url: or("SLEEVE_AGGREGATOR_URL", DEFAULT_AGGREGATOR_URL),
            preview_command: var("SLEEVE_PREVIEW_CMD"),
            queue_file: var("SLEEVE_QUEUE_FILE").map(PathBuf::from),
            confirm_timeout: Duration::from_secs(number(&var, "SLEEVE_CONFIRM_TIMEOUT_SECS", 120)?),
        })
    }
}

fn number<T: std::str::FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T> {
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| SleeveError::NotConfigured(format!("{key} must be a number, got {raw:?}"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let loaded = config(&[("DISCOGS_TOKEN", "t"), ("DISCOGS_USERNAME", "collector")]).unwrap();
        assert_eq!(loaded.discogs_api_url, DEFAULT_API_URL);
        assert_eq!(loaded.per_page, 100);
        assert_eq!(loaded.start_page, 1);
        assert_eq!(loaded.request_delay, Duration::from_millis(1100));
        assert_eq!(loaded.registry_path, PathBuf::from("processed_releases.json"));
        assert_eq!(loaded.content_dir, PathBuf::from("content/music"));
        assert_eq!(loaded.full_threshold, 25);
        assert_eq!(loaded.confirm_timeout, Duration::from_secs(120));
        assert!(loaded.preview_command.is_none());
        assert!(loaded.queue_file.is_none());
    }

    #[test]
    fn missing_credentials_are_not_configured() {
        let err = config(&[("DISCOGS_USERNAME", "collector")]).unwrap_err();
        assert!(matches!(err, SleeveError::NotConfigured(ref m) if m.contains("DISCOGS_TOKEN")));

        let err = config(&[("DISCOGS_TOKEN", "t"), ("DISCOGS_USERNAME", "  ")]).unwrap_err();
        assert!(err.to_string().contains("DISCOGS_USERNAME"));
    }

    #[test]
    fn overrides_and_bad_numbers() {
        let loaded = config(&[
            ("DISCOGS_TOKEN", "t"),
            ("DISCOGS_USERNAME", "collector"),
            ("SLEEVE_PER_PAGE", " 50 "),
            ("SLEEVE_REQUEST_DELAY_MS", "0"),
            ("SLEEVE_PREVIEW_CMD", "glow -p"),
        ])
        .unwrap();
        assert_eq!(loaded.per_page, 50);
        assert_eq!(loaded.request_delay, Duration::ZERO);
        assert_eq!(loaded.preview_command.as_deref(), Some("glow -p"));

        assert!(config(&[
            ("DISCOGS_TOKEN", "t"),
            ("DISCOGS_USERNAME", "collector"),
            ("SLEEVE_FULL_THRESHOLD", "lots"),
        ])
        .is_err());
    }
}
