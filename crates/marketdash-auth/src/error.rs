//! Admin authentication error types.
//!
//! Every variant maps to a stable error code and HTTP status (see
//! [`crate::http::error`]). Messages are deliberately generic: they never say
//! how close a secret was or how long a lockout has left.

/// Errors that can occur while authenticating an admin request.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Too many failed attempts from this client.
    #[error("Too many failed attempts")]
    LockedOut,

    /// The presented secret does not match.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// The presented session token is unknown or expired.
    #[error("Invalid or expired session")]
    InvalidOrExpiredSession,

    /// Neither a session token nor a secret was supplied.
    #[error("Missing input: {message}")]
    MissingInput {
        /// What was missing or malformed.
        message: String,
    },

    /// The server has no admin secret configured.
    #[error("Server misconfigured: {message}")]
    ServerMisconfigured {
        /// Internal description; never sent to the caller.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `MissingInput` error.
    #[must_use]
    pub fn missing_input(message: impl Into<String>) -> Self {
        Self::MissingInput {
            message: message.into(),
        }
    }

    /// Creates a new `ServerMisconfigured` error.
    #[must_use]
    pub fn server_misconfigured(message: impl Into<String>) -> Self {
        Self::ServerMisconfigured {
            message: message.into(),
        }
    }

    /// Stable machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::LockedOut => "locked_out",
            Self::InvalidCredentials => "invalid_credentials",
            Self::InvalidOrExpiredSession => "invalid_or_expired_session",
            Self::MissingInput { .. } => "missing_input",
            Self::ServerMisconfigured { .. } => "server_error",
        }
    }

    /// Returns `true` if this is a client error (4xx category).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        !self.is_server_error()
    }

    /// Returns `true` if this is a server error (5xx category).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::ServerMisconfigured { .. })
    }
}
