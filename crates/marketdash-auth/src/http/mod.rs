//! HTTP surface for admin authentication.
//!
//! # Available Handlers
//!
//! - [`admin_auth_handler`] - `POST /api/admin/auth`
//! - [`logout_handler`] - `POST /api/admin/logout`
//!
//! Protected routes take an [`AdminSession`] argument.

pub mod error;
pub mod extractor;
pub mod login;

pub use extractor::{AdminSession, bearer_token};
pub use login::{AdminAuthState, admin_auth_handler, logout_handler};
