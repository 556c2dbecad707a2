use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;

use crate::error::RequestError;
use crate::models::{ShortenRequest, ShortenResponse, StatsResponse};

// ── Trait ──────────────────────────────────────────────────────────────────

/// The two backend endpoints the client consumes.
#[async_trait]
pub trait LinkApi: Send + Sync + 'static {
    /// `POST /api/shorten`. Returns the issued short URL.
    async fn shorten(&self, url: &str) -> Result<String, RequestError>;

    /// `GET /api/stats/{slug}`. Returns the current visit count.
    async fn stats(&self, slug: &str) -> Result<u64, RequestError>;
}

// ── HTTP implementation ────────────────────────────────────────────────────

/// `LinkApi` over HTTP. One `reqwest::Client` is shared by every request so
/// connections are pooled across the stats polls.
#[derive(Clone, Debug)]
pub struct HttpLinkApi {
    client: Client,
    base_url: String,
}

impl HttpLinkApi {
    /// `base_url` is the backend origin, e.g. "http://localhost:5000".
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn shorten_url(&self) -> String {
        format!("{}/api/shorten", self.base_url)
    }

    fn stats_url(&self, slug: &str) -> Result<Url, RequestError> {
        let mut url = Url::parse(&format!("{}/api/stats/", self.base_url))
            .map_err(|e| RequestError::InvalidResponse(format!("bad base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| RequestError::InvalidResponse("base URL cannot have paths".into()))?
            .pop_if_empty()
            .push(slug);
        Ok(url)
    }
}

#[async_trait]
impl LinkApi for HttpLinkApi {
    async fn shorten(&self, url: &str) -> Result<String, RequestError> {
        let resp = self
            .client
            .post(self.shorten_url())
            .json(&ShortenRequest { url })
            .send()
            .await?;

        let body: ShortenResponse = decode(resp).await?;
        Ok(body.short_url)
    }

    async fn stats(&self, slug: &str) -> Result<u64, RequestError> {
        let resp = self.client.get(self.stats_url(slug)?).send().await?;
        let body: StatsResponse = decode(resp).await?;
        Ok(body.visits)
    }
}

// ── Internal helpers ───────────────────────────────────────────────────────

/// Reject non-2xx responses, then parse the JSON body.
async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, RequestError> {
    let status = resp.status();
    if !status.is_success() {
        return Err(RequestError::Status(status));
    }

    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| RequestError::Decode(e.to_string()))
}
