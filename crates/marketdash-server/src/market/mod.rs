//! Market data routes.
//!
//! `GET /api/market/{source}` answers with the upstream's JSON document and an
//! `x-cache` header saying whether it was a fresh hit, a new fetch, or a stale
//! fallback.

pub mod service;
pub mod upstream;

use std::time::Duration;

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderName, HeaderValue},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;

use crate::error::ApiError;
use crate::server::AppState;

pub use service::MarketDataService;
pub use upstream::{HttpUpstream, UpstreamError, UpstreamSource};

/// Header reporting how a market response was resolved.
pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");
/// Header carrying the RFC 3339 time the served document was fetched.
pub const X_CACHE_STORED_AT: HeaderName = HeaderName::from_static("x-cache-stored-at");

/// Freshness class of an upstream. Each class maps to a configurable TTL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheTier {
    /// Fast-moving data such as spot prices.
    Short,
    #[default]
    Medium,
    /// Slow-moving aggregates such as TVL or sentiment.
    Long,
}

impl CacheTier {
    pub const ALL: [CacheTier; 3] = [Self::Short, Self::Medium, Self::Long];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Medium => "medium",
            Self::Long => "long",
        }
    }

    pub fn default_ttl(&self) -> Duration {
        match self {
            Self::Short => Duration::from_secs(60),
            Self::Medium => Duration::from_secs(180),
            Self::Long => Duration::from_secs(300),
        }
    }
}

/// `GET /api/market/{source}`
pub async fn market_handler(
    State(state): State<AppState>,
    Path(source): Path<String>,
) -> Result<Response, ApiError> {
    let cached = state.market.fetch(&source).await?;

    let mut response = Json(cached.value.as_ref()).into_response();
    let headers = response.headers_mut();
    headers.insert(
        X_CACHE,
        HeaderValue::from_static(cached.freshness.as_str()),
    );
    if let Ok(stored_at) = cached.stored_at.format(&Rfc3339)
        && let Ok(value) = HeaderValue::from_str(&stored_at)
    {
        headers.insert(X_CACHE_STORED_AT, value);
    }

    Ok(response)
}
