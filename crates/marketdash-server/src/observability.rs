//! Tracing setup for the server binary.
//!
//! A `fmt` layer sits behind a reloadable `EnvFilter`. The process starts at
//! [`DEFAULT_LEVEL`] so configuration loading is already logged, then
//! [`apply_logging_config`] swaps in `logging.level`. `RUST_LOG`, when set,
//! wins over both.

use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

use crate::config::LoggingConfig;

pub const DEFAULT_LEVEL: &str = "info";

static FILTER_HANDLE: OnceLock<reload::Handle<EnvFilter, Registry>> = OnceLock::new();

pub fn init_tracing() {
    let rust_log = std::env::var("RUST_LOG").ok();
    let (filter, handle) = reload::Layer::new(resolve_filter(DEFAULT_LEVEL, rust_log.as_deref()));
    let _ = FILTER_HANDLE.set(handle);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init();
}

/// Switch the active filter to the configured level.
pub fn apply_logging_config(logging: &LoggingConfig) {
    if std::env::var_os("RUST_LOG").is_some() {
        tracing::debug!(level = %logging.level, "RUST_LOG is set, ignoring logging.level");
        return;
    }
    let Some(handle) = FILTER_HANDLE.get() else {
        return;
    };
    if let Err(e) = handle.reload(resolve_filter(&logging.level, None)) {
        tracing::warn!(error = %e, "Could not apply logging.level");
    }
}

/// `RUST_LOG` directives when present and parseable, otherwise `level`.
fn resolve_filter(level: &str, rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_new(level).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LEVEL))
}
