use std::time::Duration;

use anyhow::{Context, Result};

use crate::history::DEFAULT_CAPACITY;
use crate::persistence::DEFAULT_HISTORY_KEY;
use crate::scheduler::DEFAULT_POLL_INTERVAL;
use crate::storage::StorageBackend;

/// Settings that shape the history and its refresh loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistorySettings {
    /// Storage slot the history is persisted under.
    pub key: String,

    /// Maximum number of links kept.
    pub capacity: usize,

    /// Delay between visit-count lookups for each link.
    pub poll_interval: Duration,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            key: DEFAULT_HISTORY_KEY.to_owned(),
            capacity: DEFAULT_CAPACITY,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend origin, e.g. "http://localhost:5000".
    /// Never has a trailing slash.
    pub api_base_url: String,

    /// Where the history is persisted: "memory", "file:<dir>" or "sqlite:<path>".
    pub storage: StorageBackend,

    pub history: HistorySettings,
}

impl ClientConfig {
    /// Load configuration from environment variables (populated by dotenvy before this is called).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_base_url = var("API_BASE_URL")
            .unwrap_or_else(|| "http://localhost:5000".into())
            .trim_end_matches('/')
            .to_owned();

        if api_base_url.is_empty() {
            anyhow::bail!("API_BASE_URL must not be empty");
        }

        let parsed = reqwest::Url::parse(&api_base_url)
            .context("API_BASE_URL must be an absolute URL, e.g. http://localhost:5000")?;
        if !matches!(parsed.scheme(), "http" | "https") || !parsed.has_host() {
            anyhow::bail!(
                "API_BASE_URL must be an http(s) URL with a host, e.g. http://localhost:5000 (got {api_base_url:?})"
            );
        }

        let storage = var("STORAGE_URL")
            .unwrap_or_else(|| "file:./.linkly-client".into())
            .parse::<StorageBackend>()
            .map_err(anyhow::Error::msg)
            .context("STORAGE_URL is invalid")?;

        let key = var("HISTORY_KEY").unwrap_or_else(|| DEFAULT_HISTORY_KEY.into());
        if key.trim().is_empty() {
            anyhow::bail!("HISTORY_KEY must not be empty");
        }

        let capacity = var("HISTORY_CAPACITY")
            .unwrap_or_else(|| DEFAULT_CAPACITY.to_string())
            .parse::<usize>()
            .context("HISTORY_CAPACITY must be a positive whole number")?;

        if capacity == 0 {
            anyhow::bail!("HISTORY_CAPACITY must be at least 1");
        }

        let poll_secs = var("POLL_INTERVAL_SECS")
            .unwrap_or_else(|| DEFAULT_POLL_INTERVAL.as_secs().to_string())
            .parse::<u64>()
            .context("POLL_INTERVAL_SECS must be a positive whole number of seconds")?;

        if poll_secs == 0 {
            anyhow::bail!("POLL_INTERVAL_SECS must be at least 1");
        }

        Ok(Self {
            api_base_url,
            storage,
            history: HistorySettings {
                key,
                capacity,
                poll_interval: Duration::from_secs(poll_secs),
            },
        })
    }
}
