//! Mapping of domain errors onto HTTP responses.

use crate::corrections::CorrectionError;
use crate::error::StatsError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{debug, error};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Username required")]
    MissingUsername,

    #[error(transparent)]
    Stats(#[from] StatsError),

    #[error(transparent)]
    Correction(#[from] CorrectionError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingUsername => StatusCode::BAD_REQUEST,
            ApiError::Stats(StatsError::Validation(_)) => StatusCode::BAD_REQUEST,
            ApiError::Stats(StatsError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Stats(
                StatsError::UpstreamTransient(_)
                | StatsError::UpstreamHttp { .. }
                | StatsError::Parse(_),
            ) => StatusCode::BAD_GATEWAY,
            ApiError::Stats(StatsError::Cache(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Correction(CorrectionError::Invalid(_)) => StatusCode::BAD_REQUEST,
            ApiError::Correction(CorrectionError::Io(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed with {}: {}", status, self);
        } else {
            debug!("Request rejected with {}: {}", status, self);
        }

        // Upstream URLs stay in the logs
        let message = match &self {
            ApiError::Stats(StatsError::UpstreamHttp { status, .. }) => {
                format!("last.fm responded with status {}", status)
            }
            other => other.to_string(),
        };
        (status, message).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Rejects absent or blank usernames.
pub fn require_username(username: Option<String>) -> ApiResult<String> {
    match username.map(|u| u.trim().to_string()) {
        Some(u) if !u.is_empty() => Ok(u),
        _ => Err(ApiError::MissingUsername),
    }
}
