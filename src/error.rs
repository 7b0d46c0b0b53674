//! Errors raised while fetching pages, details and files.
//!
//! Application plumbing uses `anyhow`; this type exists so the pagination
//! coordinator can tell a transient failure (worth retrying) from a payload
//! that will never parse.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("detail has no canonical URL")]
    MissingUrl,

    #[error("metadata extraction failed: {0}")]
    Extractor(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    /// Network errors, rate limiting and server errors may succeed on retry.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Network(_) => true,
            FetchError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
