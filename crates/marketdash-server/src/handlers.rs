use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use serde_json::json;

use crate::server::AppState;

#[derive(Serialize)]
pub struct HealthResponse<'a> {
    status: &'a str,
}

pub async fn root(State(state): State<AppState>) -> impl IntoResponse {
    let sources: Vec<&str> = state.market.sources().collect();
    let body = json!({
        "service": "MarketDash API",
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "sources": sources,
    });
    (StatusCode::OK, Json(body))
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let admin = if state.auth.authenticator.config().secret().is_some() {
        "configured"
    } else {
        "unconfigured"
    };
    (
        StatusCode::OK,
        Json(json!({ "status": "ready", "admin": admin })),
    )
}
