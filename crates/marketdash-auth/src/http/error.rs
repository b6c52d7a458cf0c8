//! Error response mapping for admin authentication.
//!
//! Bodies have the shape `{"error": <code>, "message": <text>}`. Messages are
//! generic; a server misconfiguration is reported without detail.

use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::AuthError;

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = status_code(&self);
        let message = match &self {
            AuthError::ServerMisconfigured { .. } => "Internal server error".to_string(),
            other => other.to_string(),
        };

        let body = json!({
            "error": self.code(),
            "message": message,
        });

        let mut headers = HeaderMap::new();
        if status == StatusCode::UNAUTHORIZED
            && let Ok(value) = HeaderValue::from_str(&build_www_authenticate_header(self.code()))
        {
            headers.insert(header::WWW_AUTHENTICATE, value);
        }

        (status, headers, Json(body)).into_response()
    }
}

/// HTTP status for an [`AuthError`].
pub fn status_code(error: &AuthError) -> StatusCode {
    match error {
        AuthError::LockedOut => StatusCode::TOO_MANY_REQUESTS,
        AuthError::InvalidCredentials | AuthError::InvalidOrExpiredSession => {
            StatusCode::UNAUTHORIZED
        }
        AuthError::MissingInput { .. } => StatusCode::BAD_REQUEST,
        AuthError::ServerMisconfigured { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Format: `Bearer realm="marketdash", error="invalid_credentials"`
fn build_www_authenticate_header(error: &str) -> String {
    format!("Bearer realm=\"marketdash\", error=\"{error}\"")
}
