//! Admin authentication configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Errors raised while validating [`AuthConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A field holds a value outside its allowed range.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Admin authentication configuration.
///
/// # Example (TOML)
///
/// ```toml
/// [auth]
/// admin_secret = "change-me"
/// max_failed_attempts = 5
/// lockout_duration = "15m"
/// session_ttl = "24h"
/// ```
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Shared secret accepted by the admin login endpoint.
    /// When unset, every secret-based login fails as a server misconfiguration.
    #[serde(skip_serializing)]
    pub admin_secret: Option<String>,

    /// Failed attempts allowed before a client is locked out.
    pub max_failed_attempts: u32,

    /// How long a lockout lasts, counted from the failure that triggered it.
    #[serde(with = "humantime_serde")]
    pub lockout_duration: Duration,

    /// Lifetime of an issued admin session.
    #[serde(with = "humantime_serde")]
    pub session_ttl: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            admin_secret: None,
            max_failed_attempts: 5,
            lockout_duration: Duration::from_secs(15 * 60), // 15 minutes
            session_ttl: Duration::from_secs(24 * 3600),    // 24 hours
        }
    }
}

impl AuthConfig {
    /// Returns the configured secret if it is set and non-empty.
    pub fn secret(&self) -> Option<&str> {
        self.admin_secret.as_deref().filter(|s| !s.is_empty())
    }

    /// Validates the configuration.
    ///
    /// A missing secret is not an error here; it is reported per request.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_failed_attempts == 0 {
            return Err(ConfigError::InvalidValue(
                "max_failed_attempts must be > 0".to_string(),
            ));
        }

        if self.lockout_duration.is_zero() {
            return Err(ConfigError::InvalidValue(
                "lockout_duration must be > 0".to_string(),
            ));
        }

        if self.session_ttl.is_zero() {
            return Err(ConfigError::InvalidValue(
                "session_ttl must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field(
                "admin_secret",
                &self.admin_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("max_failed_attempts", &self.max_failed_attempts)
            .field("lockout_duration", &self.lockout_duration)
            .field("session_ttl", &self.session_ttl)
            .finish()
    }
}
