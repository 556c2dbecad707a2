use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One shortened link as kept in the history and in the persisted slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    /// The validated URL the user submitted.
    pub original: String,
    /// The short URL issued by the backend.
    pub shortened: String,
    /// Final path segment of `shortened`, used for stats lookups.
    pub slug: String,
    /// Last known visit count.
    pub visits: u64,
    #[serde(rename = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl LinkRecord {
    /// A fresh record with zero visits, stamped with the current time.
    pub fn new(
        original: impl Into<String>,
        shortened: impl Into<String>,
        slug: impl Into<String>,
    ) -> Self {
        Self {
            original: original.into(),
            shortened: shortened.into(),
            slug: slug.into(),
            visits: 0,
            created_at: Utc::now(),
        }
    }
}

// ── Backend wire shapes ────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ShortenRequest<'a> {
    pub url: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ShortenResponse {
    #[serde(rename = "shortUrl")]
    pub short_url: String,
}

#[derive(Debug, Deserialize)]
pub struct StatsResponse {
    pub visits: u64,
}

/// Final `/`-delimited segment of a short URL. May be empty when the URL ends
/// with a slash.
pub fn slug_of(short_url: &str) -> &str {
    short_url.rsplit('/').next().unwrap_or_default()
}
