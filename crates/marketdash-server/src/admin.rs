//! Protected admin routes.

use axum::{Json, extract::State};
use marketdash_auth::http::AdminSession;
use marketdash_cache::CacheStats;
use serde::Serialize;

use crate::server::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub cache: CacheStats,
    pub cache_hit_rate: f64,
    pub cache_capacity: usize,
    pub active_sessions: usize,
    pub lockout_records: usize,
}

/// `GET /api/admin/cache/stats`
pub async fn cache_stats(_admin: AdminSession, State(state): State<AppState>) -> Json<AdminStats> {
    let cache = state.market.cache();
    let stats = cache.stats();
    let authenticator = &state.auth.authenticator;

    Json(AdminStats {
        cache_hit_rate: stats.hit_rate(),
        cache: stats,
        cache_capacity: cache.max_entries(),
        active_sessions: authenticator.sessions().len(),
        lockout_records: authenticator.lockout().len(),
    })
}
