use std::sync::Arc;

use axum::{
    http::StatusCode,
    routing::{delete, get, post},
    Router,
};

use crate::AppState;

pub mod analytics;
pub mod auth;
pub mod handlers;
pub mod publish;
pub mod settings;

/// Build the forwarding router.
/// Routes are relative: the caller mounts this under `/api`.
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/threads/posts", get(handlers::list_posts))
        .route("/threads/posts/:post_id", delete(handlers::delete_post))
        .route(
            "/threads/posts/:post_id/insights",
            get(handlers::get_insights),
        )
        .route("/threads/posts/:post_id/likes", get(handlers::get_likes))
        .route(
            "/threads/posts/:post_id/replies",
            get(handlers::get_replies),
        )
        .route("/threads/publish", post(publish::publish))
        .route("/threads/reply", post(publish::reply))
        .route("/threads/user", get(handlers::get_user))
        .route("/threads/limits", get(handlers::get_limits))
        .route(
            "/threads/container/:container_id/status",
            get(handlers::get_container_status),
        )
        .route("/threads/test", post(settings::test_connection))
        .route("/threads/analytics", get(analytics::get_analytics))
        .route(
            "/settings",
            get(settings::settings_schema).post(settings::save_settings),
        )
        .fallback(fallback_404)
}

async fn fallback_404() -> StatusCode {
    StatusCode::NOT_FOUND
}
