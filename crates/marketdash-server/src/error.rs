//! API error responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use marketdash_cache::FetchError;
use serde_json::json;

use crate::market::UpstreamError;

/// Errors returned by the public market routes.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("unknown market data source '{0}'")]
    UnknownSource(String),

    #[error(transparent)]
    UpstreamUnavailable(#[from] FetchError<UpstreamError>),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownSource(_) => "unknown_source",
            Self::UpstreamUnavailable(_) => "upstream_unavailable",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::UnknownSource(_) => StatusCode::NOT_FOUND,
            Self::UpstreamUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::UpstreamUnavailable(err) = &self {
            tracing::error!(key = %err.key, error = %err.error, "Market data unavailable");
        }

        // Upstream details stay in the logs.
        (self.status(), Json(json!({ "error": self.code() }))).into_response()
    }
}
