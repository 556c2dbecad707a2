use reqwest::StatusCode;
use thiserror::Error;

/// Message shown for every request failure. Details stay in the logs.
pub const REQUEST_FAILED_MESSAGE: &str = "Failed to shorten URL. Please try again.";

// ── Validation ─────────────────────────────────────────────────────────────

/// Problems with the raw text a user typed into the shorten box.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter a URL")]
    Empty,

    #[error("Please enter a valid URL (include http:// or https://)")]
    Malformed(String),
}

// ── Backend requests ───────────────────────────────────────────────────────

/// Failures talking to the shortener backend.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend responded with status {0}")]
    Status(StatusCode),

    #[error("could not decode backend response: {0}")]
    Decode(String),

    #[error("backend returned an unusable response: {0}")]
    InvalidResponse(String),
}

impl RequestError {
    /// The text shown to the user. Never includes the underlying cause.
    pub fn user_message(&self) -> &'static str {
        REQUEST_FAILED_MESSAGE
    }
}

// ── Persistence ────────────────────────────────────────────────────────────

/// Load/save failures of the history slot. Always recoverable: callers log
/// these and carry on with the in-memory state.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("stored history could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("storage migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),
}

// ── Submit ─────────────────────────────────────────────────────────────────

/// Everything `submit` can fail with.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Request(#[from] RequestError),
}

impl SubmitError {
    /// User-facing message for this failure.
    pub fn user_message(&self) -> String {
        match self {
            SubmitError::Validation(e) => e.to_string(),
            SubmitError::Request(e) => e.user_message().to_owned(),
        }
    }
}
