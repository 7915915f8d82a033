//! Error taxonomy shared by the stats pipeline.

use crate::cache::CacheError;
use crate::fetch::FetchError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StatsError {
    /// Unknown user, or an upstream 404.
    #[error("not found: {0}")]
    NotFound(String),

    /// Upstream could not be reached after retries.
    #[error("upstream unavailable: {0}")]
    UpstreamTransient(String),

    /// Upstream answered with a non-success status.
    #[error("upstream returned HTTP {status} for {url}")]
    UpstreamHttp { status: u16, url: String },

    /// The request itself is invalid; never retried.
    #[error("{0}")]
    Validation(String),

    #[error("unexpected upstream response: {0}")]
    Parse(String),

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
}

pub type StatsResult<T> = Result<T, StatsError>;

impl StatsError {
    pub fn validation(message: impl Into<String>) -> Self {
        StatsError::Validation(message.into())
    }
}

impl From<FetchError> for StatsError {
    fn from(error: FetchError) -> Self {
        match error {
            FetchError::Status { url, status: 404 } => StatsError::NotFound(url),
            FetchError::Status { url, status } => StatsError::UpstreamHttp { status, url },
            FetchError::Transient { .. } => StatsError::UpstreamTransient(error.to_string()),
            FetchError::Body { .. } => StatsError::UpstreamTransient(error.to_string()),
        }
    }
}

impl From<serde_json::Error> for StatsError {
    fn from(error: serde_json::Error) -> Self {
        StatsError::Parse(error.to_string())
    }
}
