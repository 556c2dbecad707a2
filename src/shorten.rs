use std::sync::Arc;

use reqwest::Url;

use crate::api::LinkApi;
use crate::error::{RequestError, SubmitError, ValidationError};
use crate::history::HistoryStore;
use crate::models::{slug_of, LinkRecord};

/// Turns raw user input into a stored short link.
#[derive(Clone)]
pub struct ShortenWorkflow {
    api: Arc<dyn LinkApi>,
    store: Arc<HistoryStore>,
}

impl ShortenWorkflow {
    pub fn new(api: Arc<dyn LinkApi>, store: Arc<HistoryStore>) -> Self {
        Self { api, store }
    }

    /// Validate `raw`, ask the backend for a short link, and add the result to
    /// the history. Nothing is retried; on error the store is untouched.
    pub async fn submit(&self, raw: &str) -> Result<LinkRecord, SubmitError> {
        let url = validate(raw)?;

        tracing::debug!("Requesting short link for {}", url);
        let short_url = self.api.shorten(url).await.map_err(|e| {
            tracing::error!("Failed to shorten {}: {}", url, e);
            e
        })?;

        let slug = slug_of(&short_url);
        if slug.is_empty() {
            tracing::error!("Backend returned short URL without a slug: {}", short_url);
            return Err(RequestError::InvalidResponse(format!(
                "short URL {short_url:?} has no slug"
            ))
            .into());
        }

        let record = LinkRecord::new(url, short_url.as_str(), slug);
        self.store.add(record.clone()).await;
        Ok(record)
    }
}

/// Trim and check that `raw` is an absolute URL. Returns the trimmed text.
pub fn validate(raw: &str) -> Result<&str, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty);
    }

    Url::parse(trimmed).map_err(|e| ValidationError::Malformed(e.to_string()))?;
    Ok(trimmed)
}
