//! Lookup client errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("unsupported lookup: {0}")]
    Unsupported(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid lookup URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("unexpected response from {service}: HTTP {status}")]
    UnexpectedStatus { service: &'static str, status: u16 },

    #[error("malformed response from {service}: {reason}")]
    Malformed { service: &'static str, reason: String },

    #[error("rate limited")]
    RateLimited,
}
