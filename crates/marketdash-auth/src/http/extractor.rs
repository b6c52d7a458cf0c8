//! Admin session extractor.
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, routing::get};
//! use marketdash_auth::http::AdminSession;
//!
//! async fn stats(_admin: AdminSession) -> &'static str {
//!     "ok"
//! }
//!
//! let app = Router::new()
//!     .route("/api/admin/cache/stats", get(stats))
//!     .with_state(app_state);
//! ```

use axum::extract::{FromRef, FromRequestParts};
use axum::http::{HeaderMap, header, request::Parts};

use crate::error::AuthError;
use crate::http::login::AdminAuthState;
use crate::session::Session;

/// A request carrying a live admin session in `Authorization: Bearer`.
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub session: Session,
}

impl<S> FromRequestParts<S> for AdminSession
where
    S: Send + Sync,
    AdminAuthState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AdminAuthState::from_ref(state);

        let token = bearer_token(&parts.headers).ok_or_else(|| {
            tracing::debug!("Admin access denied: no bearer token");
            AuthError::InvalidOrExpiredSession
        })?;

        let session = auth_state
            .authenticator
            .sessions()
            .get(token)
            .ok_or(AuthError::InvalidOrExpiredSession)?;

        tracing::debug!(client_id = %session.client_id, "Admin access granted");

        Ok(Self { session })
    }
}

/// Token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
