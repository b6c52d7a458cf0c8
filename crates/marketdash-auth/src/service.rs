//! Admin authentication flow.
//!
//! [`AdminAuthenticator`] ties the lockout tracker, secret comparison and
//! session store together. Order matters:
//!
//! 1. expired sessions are swept;
//! 2. a locked-out client is refused before anything else is looked at;
//! 3. a presented session token is validated (never counted as a failure);
//! 4. otherwise the presented secret is checked against the configured one.

use std::fmt;
use std::sync::Arc;

use marketdash_core::SharedClock;
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;
use crate::AuthResult;
use crate::error::AuthError;
use crate::lockout::LockoutTracker;
use crate::secret::{hash_secret, validate_secret};
use crate::session::SessionStore;

/// Body of `POST /api/admin/auth`.
#[derive(Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthRequest {
    #[serde(default)]
    pub session_token: Option<String>,
    #[serde(default)]
    pub secret: Option<String>,
}

impl AuthRequest {
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            session_token: None,
            secret: Some(secret.into()),
        }
    }

    pub fn with_session(token: impl Into<String>) -> Self {
        Self {
            session_token: Some(token.into()),
            secret: None,
        }
    }

    fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref().filter(|t| !t.is_empty())
    }

    fn secret(&self) -> Option<&str> {
        self.secret.as_deref().filter(|s| !s.is_empty())
    }
}

impl fmt::Debug for AuthRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthRequest")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Successful result of [`AdminAuthenticator::authenticate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AuthOutcome {
    /// A secret was accepted and a new session issued.
    #[serde(rename_all = "camelCase")]
    SessionIssued {
        success: bool,
        session_token: String,
        expires_in_millis: u64,
    },
    /// A presented session token is still valid.
    SessionValid { valid: bool },
}

/// Admin authentication service.
pub struct AdminAuthenticator {
    config: AuthConfig,
    lockout: Arc<LockoutTracker>,
    sessions: Arc<SessionStore>,
}

impl AdminAuthenticator {
    pub fn new(config: AuthConfig, clock: SharedClock) -> Self {
        let lockout = Arc::new(LockoutTracker::from_config(&config, Arc::clone(&clock)));
        let sessions = Arc::new(SessionStore::new(clock, config.session_ttl));

        if config.secret().is_none() {
            tracing::warn!("No admin secret configured; admin login will fail until one is set");
        }

        Self {
            config,
            lockout,
            sessions,
        }
    }

    pub fn lockout(&self) -> &Arc<LockoutTracker> {
        &self.lockout
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Run the admin authentication flow for `client_id`.
    pub fn authenticate(
        &self,
        client_id: &str,
        request: &AuthRequest,
    ) -> AuthResult<AuthOutcome> {
        self.sessions.cleanup_sessions();

        if self.lockout.is_locked_out(client_id) {
            tracing::info!(client_id = %client_id, "Admin auth refused: client locked out");
            return Err(AuthError::LockedOut);
        }

        if let Some(token) = request.session_token() {
            return if self.sessions.validate_session(token) {
                Ok(AuthOutcome::SessionValid { valid: true })
            } else {
                tracing::debug!(client_id = %client_id, "Admin session rejected");
                Err(AuthError::InvalidOrExpiredSession)
            };
        }

        let candidate = request
            .secret()
            .ok_or_else(|| AuthError::missing_input("sessionToken or secret is required"))?;

        let Some(expected) = self.config.secret() else {
            tracing::error!("Admin login attempted but no admin secret is configured");
            return Err(AuthError::server_misconfigured("admin secret is not configured"));
        };

        if !validate_secret(candidate, expected) {
            let state = self.lockout.record_failed_attempt(client_id);
            tracing::info!(client_id = %client_id, state = ?state, "Admin auth failed");
            return Err(AuthError::InvalidCredentials);
        }

        self.lockout.clear_failed_attempts(client_id);
        let session_token = self
            .sessions
            .issue_session(client_id, hash_secret(candidate));

        tracing::info!(client_id = %client_id, "Admin authenticated");

        Ok(AuthOutcome::SessionIssued {
            success: true,
            session_token,
            expires_in_millis: self.sessions.ttl().as_millis() as u64,
        })
    }

    /// Drop a session. Unknown tokens are ignored.
    pub fn logout(&self, token: &str) -> bool {
        self.sessions.revoke(token)
    }
}
