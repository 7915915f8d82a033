//! Outbound HTTP.
//!
//! Everything that talks to last.fm goes through an [`HttpFetcher`], so the
//! scraping and API layers can be exercised against canned responses.

mod client;
mod retry_policy;

pub use client::FetchClient;
pub use retry_policy::RetryPolicy;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    /// The request never produced a response (connect failure, timeout).
    #[error("request to {url} failed: {message}")]
    Transient { url: String, message: String },

    /// A response arrived with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("failed to read response body from {url}: {message}")]
    Body { url: String, message: String },
}

impl FetchError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Transient { .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[async_trait]
pub trait HttpFetcher: Send + Sync {
    /// GET `url` and return the body. Non-2xx statuses are errors.
    async fn get_text(&self, url: &str) -> Result<String, FetchError>;

    /// HEAD `url` and return the status code, whatever it is.
    async fn get_status(&self, url: &str) -> Result<u16, FetchError>;
}
