//! MarketDash API server.
//!
//! Serves cached market data from public crypto APIs and a small admin
//! surface guarded by a shared secret.
//!
//! - [`market`] - `/api/market/{source}` backed by a stale-on-error cache
//! - [`admin`] - protected admin routes
//! - [`housekeeping`] - periodic cleanup task
//! - [`config`] - TOML plus environment configuration

pub mod admin;
pub mod config;
pub mod error;
pub mod handlers;
pub mod housekeeping;
pub mod market;
pub mod middleware;
pub mod observability;
pub mod server;

pub use config::AppConfig;
pub use error::ApiError;
pub use observability::init_tracing;
pub use server::{AppState, MarketdashServer, ServerBuilder, build_app};
