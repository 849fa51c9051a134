use axum::http::{HeaderName, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::api::auth::ACCOUNT_ID_HEADER;

/// CORS restricted to the dashboard origin, plus localhost for development.
pub fn dashboard_cors(dashboard_origin: &str) -> CorsLayer {
    let dashboard_origin = dashboard_origin.trim_end_matches('/').to_string();
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin, _| {
            let origin_str = origin.to_str().unwrap_or("");
            origin_str == dashboard_origin
                || origin_str.starts_with("http://localhost:")
                || origin_str.starts_with("http://127.0.0.1:")
        }))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            HeaderName::from_static("content-type"),
            HeaderName::from_static("authorization"),
            HeaderName::from_static(ACCOUNT_ID_HEADER),
        ])
        .expose_headers([HeaderName::from_static("x-request-id")])
}
