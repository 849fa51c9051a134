//! threads-relay: stateless forwarding layer between the dashboard and the Threads API.
//!
//! Library crate shared by the binary and the integration tests in `tests/`.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;

pub mod api;
pub mod cli;
pub mod config;
pub mod errors;
pub mod middleware;
pub mod models;
pub mod proxy;

use proxy::upstream::ThreadsClient;

/// Shared application state passed to handlers. Read-only after startup.
pub struct AppState {
    pub config: config::Config,
    pub threads: ThreadsClient,
}

impl AppState {
    pub fn new(config: config::Config) -> anyhow::Result<Self> {
        let threads = ThreadsClient::new(config.threads_api_base.clone())?;
        Ok(Self { config, threads })
    }
}

/// The full HTTP application: health probes, the forwarding API under `/api`,
/// and the response-wide layers.
pub fn build_app(state: Arc<AppState>) -> Router {
    let body_limit = state.config.body_limit_bytes;
    let cors = middleware::cors::dashboard_cors(&state.config.dashboard_origin);

    Router::new()
        // Health endpoints (no auth)
        .route("/healthz", get(|| async { "ok" }))
        .route("/readyz", get(|| async { "ok" }))
        .nest("/api", api::api_router())
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(cors)
        .layer(axum::middleware::from_fn(middleware::headers::request_id))
        .layer(axum::middleware::from_fn(middleware::headers::security_headers))
}
