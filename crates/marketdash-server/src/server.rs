use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::FromRef,
    middleware,
    routing::{get, post},
};
use marketdash_auth::AdminAuthenticator;
use marketdash_auth::http::{AdminAuthState, admin_auth_handler, logout_handler};
use marketdash_core::{SharedClock, system_clock};
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::housekeeping::Housekeeper;
use crate::market::{self, HttpUpstream, MarketDataService, UpstreamSource};
use crate::middleware::RequestId;
use crate::{admin, config::AppConfig, handlers, middleware as app_middleware};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub market: Arc<MarketDataService>,
    pub auth: AdminAuthState,
}

impl AppState {
    pub fn new(config: AppConfig, clock: SharedClock, upstream: Arc<dyn UpstreamSource>) -> Self {
        let authenticator = Arc::new(AdminAuthenticator::new(
            config.auth.clone(),
            Arc::clone(&clock),
        ));
        let market = Arc::new(MarketDataService::new(
            clock,
            upstream,
            config.upstreams.clone(),
            config.cache.clone(),
        ));

        Self {
            config: Arc::new(config),
            market,
            auth: AdminAuthState::new(authenticator),
        }
    }

    /// Background cleanup wired to this state's stores.
    pub fn housekeeper(&self) -> Housekeeper {
        Housekeeper::new(
            Arc::clone(&self.auth.authenticator),
            Arc::clone(self.market.cache()),
            self.config.cache.stale_retention,
            self.config.housekeeping.interval,
        )
    }
}

impl FromRef<AppState> for AdminAuthState {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

pub fn build_app(state: AppState) -> Router {
    let body_limit = state.config.server.body_limit_bytes;

    Router::new()
        // Health and info endpoints
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        // Market data
        .route("/api/market/{source}", get(market::market_handler))
        // Admin
        .route("/api/admin/auth", post(admin_auth_handler))
        .route("/api/admin/logout", post(logout_handler))
        .route("/api/admin/cache/stats", get(admin::cache_stats))
        .with_state(state)
        // Middleware stack (outermost first): request id -> trace -> cors/compression -> body limit
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(app_middleware::request_id))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(|req: &axum::http::Request<_>| {
                            use tracing::field::Empty;
                            let req_id = req
                                .extensions()
                                .get::<RequestId>()
                                .map(|id| id.as_str().to_string())
                                .unwrap_or_default();
                            tracing::info_span!(
                                "http.request",
                                http.method = %req.method(),
                                http.target = %req.uri(),
                                http.status_code = Empty,
                                request_id = %req_id
                            )
                        })
                        .on_response(
                            |res: &axum::http::Response<_>,
                             latency: std::time::Duration,
                             span: &tracing::Span| {
                                span.record(
                                    "http.status_code",
                                    tracing::field::display(res.status().as_u16()),
                                );
                                tracing::info!(
                                    http.status = %res.status().as_u16(),
                                    elapsed_ms = %latency.as_millis(),
                                    "request handled"
                                );
                            },
                        ),
                )
                .layer(CorsLayer::permissive())
                .layer(CompressionLayer::new())
                .layer(axum::extract::DefaultBodyLimit::max(body_limit)),
        )
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
    clock: SharedClock,
    upstream: Option<Arc<dyn UpstreamSource>>,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
            clock: system_clock(),
            upstream: None,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_upstream(mut self, upstream: Arc<dyn UpstreamSource>) -> Self {
        self.upstream = Some(upstream);
        self
    }

    pub fn build(self) -> anyhow::Result<MarketdashServer> {
        let upstream: Arc<dyn UpstreamSource> = match self.upstream {
            Some(upstream) => upstream,
            None => Arc::new(HttpUpstream::new()?),
        };

        let state = AppState::new(self.config, self.clock, upstream);
        let housekeeper = Arc::new(state.housekeeper());

        Ok(MarketdashServer {
            addr: self.addr,
            app: build_app(state),
            housekeeper,
        })
    }
}

pub struct MarketdashServer {
    addr: SocketAddr,
    app: Router,
    housekeeper: Arc<Housekeeper>,
}

impl MarketdashServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);

        let housekeeping = self.housekeeper.start();

        let served = axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await;

        housekeeping.abort();
        served?;
        Ok(())
    }
}

async fn shutdown_signal() {
    // Wait for Ctrl+C
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
