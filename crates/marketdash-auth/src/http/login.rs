//! Admin login and logout handlers.
//!
//! # Request Format
//!
//! ```text
//! POST /api/admin/auth
//! Content-Type: application/json
//!
//! {"secret": "..."}            -> 200 {"success":true,"sessionToken":"...","expiresInMillis":86400000}
//! {"sessionToken": "..."}      -> 200 {"valid":true}
//! ```
//!
//! Failures use the bodies described in [`crate::http::error`].

use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
};

use crate::client::client_identifier;
use crate::AuthResult;
use crate::http::extractor::bearer_token;
use crate::service::{AdminAuthenticator, AuthOutcome, AuthRequest};

/// State required by the admin auth handlers.
#[derive(Clone)]
pub struct AdminAuthState {
    pub authenticator: Arc<AdminAuthenticator>,
}

impl AdminAuthState {
    pub fn new(authenticator: Arc<AdminAuthenticator>) -> Self {
        Self { authenticator }
    }
}

/// `POST /api/admin/auth`
pub async fn admin_auth_handler(
    State(state): State<AdminAuthState>,
    headers: HeaderMap,
    body: Result<Json<AuthRequest>, JsonRejection>,
) -> AuthResult<Json<AuthOutcome>> {
    let client_id = client_identifier(&headers);

    // An unreadable body carries no credentials; the flow still checks the
    // lockout before reporting missing input.
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::debug!(client_id = %client_id, error = %rejection, "Malformed admin auth body");
            AuthRequest::default()
        }
    };

    state
        .authenticator
        .authenticate(&client_id, &request)
        .map(Json)
}

/// `POST /api/admin/logout`
///
/// Revokes the session named by `Authorization: Bearer` or the body's
/// `sessionToken`. Always answers 204 so callers cannot probe for tokens.
pub async fn logout_handler(
    State(state): State<AdminAuthState>,
    headers: HeaderMap,
    body: Result<Json<AuthRequest>, JsonRejection>,
) -> StatusCode {
    let from_body = body.ok().and_then(|Json(request)| request.session_token);
    let token = bearer_token(&headers)
        .map(str::to_string)
        .or(from_body)
        .filter(|t| !t.is_empty());

    if let Some(token) = token
        && state.authenticator.logout(&token)
    {
        tracing::info!(client_id = %client_identifier(&headers), "Admin session revoked");
    }

    StatusCode::NO_CONTENT
}
