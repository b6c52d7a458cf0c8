//! Admin authentication for MarketDash.
//!
//! This crate guards the admin endpoints with a single shared secret:
//!
//! - **Lockout**: per-client failed-attempt counting with a fixed lockout
//!   window ([`lockout`])
//! - **Secret comparison**: constant-time validation ([`secret`])
//! - **Sessions**: random bearer tokens with a fixed lifetime ([`session`])
//! - **Flow**: [`AdminAuthenticator`] combines the three ([`service`])
//! - **HTTP**: axum handlers, error mapping and the [`http::AdminSession`]
//!   extractor ([`http`])
//!
//! Every timestamp comes from an injected [`marketdash_core::Clock`].

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod lockout;
pub mod secret;
pub mod service;
pub mod session;

pub use client::client_identifier;
pub use config::{AuthConfig, ConfigError};
pub use error::AuthError;
pub use lockout::{LockoutRecord, LockoutState, LockoutTracker};
pub use secret::{hash_secret, validate_secret};
pub use service::{AdminAuthenticator, AuthOutcome, AuthRequest};
pub use session::{Session, SessionStore};

/// Result type for admin authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;
