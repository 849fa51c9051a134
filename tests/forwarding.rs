//! Forwarding contract tests: credential checks, payload re-shaping and error policy,
//! exercised through the full router against a mocked Threads API.

mod common;

use axum::http::StatusCode;
use serde_json::json;
use wiremock::matchers::{bearer_token, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::*;

async fn mount_me(server: &MockServer, id: &str) {
    Mock::given(method("GET"))
        .and(path("/me"))
        .and(query_param("fields", "id"))
        .and(bearer_token(TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": id })))
        .mount(server)
        .await;
}

// ── Missing credential ──────────────────────────────────────

#[tokio::test]
async fn test_every_endpoint_rejects_missing_credential_without_remote_call() {
    let server = MockServer::start().await;
    expect_no_remote_calls(&server).await;
    let app = app_for(&server);

    let requests = vec![
        get_anonymous("/api/threads/posts"),
        get_anonymous("/api/threads/posts/1/insights"),
        get_anonymous("/api/threads/posts/1/likes"),
        get_anonymous("/api/threads/posts/1/replies"),
        get_anonymous("/api/threads/user"),
        get_anonymous("/api/threads/limits"),
        get_anonymous("/api/threads/container/c1/status"),
        get_anonymous("/api/threads/analytics"),
        axum::http::Request::builder()
            .method("DELETE")
            .uri("/api/threads/posts/1")
            .body(axum::body::Body::empty())
            .unwrap(),
        post_raw("/api/threads/publish", r#"{"text":"hi"}"#, false),
        post_raw("/api/threads/reply", r#"{"postId":"1","text":"hi"}"#, false),
        post_raw("/api/threads/test", r#"{}"#, false),
        post_raw("/api/threads/test", r#"{"accessToken":"  "}"#, false),
    ];

    for req in requests {
        let uri = req.uri().to_string();
        let (status, body) = send(app.clone(), req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{} should be 401", uri);
        assert_eq!(
            body["error"],
            relay::errors::MISSING_CREDENTIAL_MESSAGE,
            "{} error body",
            uri
        );
    }
}

#[tokio::test]
async fn test_non_bearer_authorization_is_rejected() {
    let server = MockServer::start().await;
    expect_no_remote_calls(&server).await;

    let req = axum::http::Request::builder()
        .uri("/api/threads/posts")
        .header("authorization", "Basic dXNlcjpwYXNz")
        .body(axum::body::Body::empty())
        .unwrap();
    let (status, _) = send(app_for(&server), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ── Path safety ─────────────────────────────────────────────

#[tokio::test]
async fn test_dot_segment_ids_are_refused_without_remote_call() {
    let server = MockServer::start().await;
    expect_no_remote_calls(&server).await;
    let app = app_for(&server);

    let requests = vec![
        delete("/api/threads/posts/%2E%2E"),
        delete("/api/threads/posts/%2E"),
        get("/api/threads/posts/%2E%2E/insights"),
        get("/api/threads/posts/%2e/likes"),
        get("/api/threads/posts/%2E%2E/replies"),
        get("/api/threads/container/%2E%2E/status"),
    ];

    for req in requests {
        let uri = req.uri().to_string();
        let (status, body) = send(app.clone(), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert!(
            body["error"].as_str().unwrap_or_default().starts_with("invalid id"),
            "{}: {}",
            uri,
            body
        );
    }
}

#[tokio::test]
async fn test_dot_segment_account_id_is_refused() {
    let server = MockServer::start().await;
    expect_no_remote_calls(&server).await;

    let req = axum::http::Request::builder()
        .uri("/api/threads/posts")
        .header("authorization", format!("Bearer {}", TOKEN))
        .header("x-threads-user-id", "..")
        .body(axum::body::Body::empty())
        .unwrap();
    let (status, _) = send(app_for(&server), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ── Posts ───────────────────────────────────────────────────

#[tokio::test]
async fn test_posts_are_reshaped_with_paging() {
    let server = MockServer::start().await;
    mount_me(&server, "42").await;
    Mock::given(method("GET"))
        .and(path("/42/threads"))
        .and(query_param("limit", "25"))
        .and(query_param("fields", relay::models::post::POST_FIELDS))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"id": "p1", "media_type": "TEXT_POST", "text": "first", "like_count": 2},
                {"id": "p2", "media_type": "IMAGE", "media_url": "https://cdn/x.jpg"}
            ],
            "paging": {"cursors": {"before": "b", "after": "a"}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (status, body) = send(app_for(&server), get("/api/threads/posts")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["posts"].as_array().unwrap().len(), 2);
    assert_eq!(body["posts"][0]["text"], "first");
    assert_eq!(body["posts"][1]["media_url"], "https://cdn/x.jpg");
    assert_eq!(body["paging"]["cursors"]["after"], "a");
    assert!(body.get("data").is_none());
}

#[tokio::test]
async fn test_posts_without_paging_omit_the_field() {
    let server = MockServer::start().await;
    mount_me(&server, "42").await;
    Mock::given(method("GET"))
        .and(path("/42/threads"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .mount(&server)
        .await;

    let (status, body) = send(app_for(&server), get("/api/threads/posts")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"posts": []}));
}

#[tokio::test]
async fn test_known_account_id_skips_identity_lookup() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/1789/threads"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [{"id": "p1"}]})))
        .expect(1)
        .mount(&server)
        .await;

    let req = axum::http::Request::builder()
        .uri("/api/threads/posts")
        .header("authorization", format!("Bearer {}", TOKEN))
        .header("x-threads-user-id", "1789")
        .body(axum::body::Body::empty())
        .unwrap();
    let (status, body) = send(app_for(&server), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["posts"][0]["id"], "p1");
}

#[tokio::test]
async fn test_posts_remote_error_message_is_forwarded_as_500() {
    let server = MockServer::start().await;
    mount_me(&server, "42").await;
    Mock::given(method("GET"))
        .and(path("/42/threads"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"message": "Invalid OAuth access token.", "code": 190}
        })))
        .mount(&server)
        .await;

    let (status, body) = send(app_for(&server), get("/api/threads/posts")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Invalid OAuth access token."}));
}

#[tokio::test]
async fn test_posts_unparseable_error_falls_back_to_status_message() {
    let server = MockServer::start().await;
    mount_me(&server, "42").await;
    Mock::given(method("GET"))
        .and(path("/42/threads"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
        .mount(&server)
        .await;

    let (status, body) = send(app_for(&server), get("/api/threads/posts")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to fetch posts (502)");
}

#[tokio::test]
async fn test_identity_failure_stops_before_listing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Session has expired", "code": 190}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/42/threads"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (status, body) = send(app_for(&server), get("/api/threads/posts")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Session has expired");
}

// ── Insights ────────────────────────────────────────────────

#[tokio::test]
async fn test_insights_both_remote_shapes_normalize_identically() {
    let metrics = json!([
        {"name": "views", "period": "lifetime", "values": [{"value": 120}]},
        {"name": "likes", "period": "lifetime", "values": [{"value": 8}]}
    ]);

    let wrapped = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/p1/insights"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": metrics.clone() })))
        .mount(&wrapped)
        .await;

    let bare = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/p1/insights"))
        .respond_with(ResponseTemplate::new(200).set_body_json(metrics.clone()))
        .mount(&bare)
        .await;

    let (s1, b1) = send(app_for(&wrapped), get("/api/threads/posts/p1/insights")).await;
    let (s2, b2) = send(app_for(&bare), get("/api/threads/posts/p1/insights")).await;
    assert_eq!(s1, StatusCode::OK);
    assert_eq!(s2, StatusCode::OK);
    assert_eq!(b1, b2);
    assert_eq!(b1, json!({ "data": metrics }));
}

#[tokio::test]
async fn test_insights_default_and_custom_metrics() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/p1/insights"))
        .and(query_param("metric", "views,likes,comments,quotes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/p1/insights"))
        .and(query_param("metric", "views"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(1)
        .mount(&server)
        .await;

    let app = app_for(&server);
    let (s1, _) = send(app.clone(), get("/api/threads/posts/p1/insights")).await;
    let (s2, _) = send(app, get("/api/threads/posts/p1/insights?metrics=views")).await;
    assert_eq!(s1, StatusCode::OK);
    assert_eq!(s2, StatusCode::OK);
}

#[tokio::test]
async fn test_insights_error_without_message_reports_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/p1/insights"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": {"code": 2}})))
        .mount(&server)
        .await;

    let (status, body) = send(app_for(&server), get("/api/threads/posts/p1/insights")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "2", "data": []}));
}

#[tokio::test]
async fn test_insights_error_mirrors_status_with_empty_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/p1/insights"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {"message": "Application does not have permission for this action", "code": 10}
        })))
        .mount(&server)
        .await;

    let (status, body) = send(app_for(&server), get("/api/threads/posts/p1/insights")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body,
        json!({"error": "Application does not have permission for this action", "data": []})
    );
}

// ── Likes / replies ─────────────────────────────────────────

#[tokio::test]
async fn test_likes_with_total_and_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/p1/likes"))
        .and(query_param("limit", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": "u1", "username": "alice"}, {"id": "u2", "username": "bob"}],
            "paging": {"next": "https://graph/next"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (status, body) = send(app_for(&server), get("/api/threads/posts/p1/likes?limit=10")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["likes"][1]["username"], "bob");
    assert_eq!(body["paging"]["next"], "https://graph/next");
}

#[tokio::test]
async fn test_repeated_query_keys_use_the_first_value() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/p1/likes"))
        .and(query_param("limit", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(1)
        .mount(&server)
        .await;

    let (status, body) = send(app_for(&server), get("/api/threads/posts/p1/likes?limit=5&limit=6")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"likes": [], "total": 0}));
}

#[tokio::test]
async fn test_likes_error_mirrors_status_with_empty_likes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/p1/likes"))
        .respond_with(ResponseTemplate::new(404).set_body_string(""))
        .mount(&server)
        .await;

    let (status, body) = send(app_for(&server), get("/api/threads/posts/p1/likes")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "Failed to fetch likes", "likes": []}));
}

#[tokio::test]
async fn test_replies_use_default_fields_and_normalize_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/p1/replies"))
        .and(query_param("fields", relay::models::post::REPLY_FIELDS))
        .and(query_param("limit", "25"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": "r1", "text": "nice"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/p2/replies"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"message": "Object does not exist"}
        })))
        .mount(&server)
        .await;

    let app = app_for(&server);
    let (status, body) = send(app.clone(), get("/api/threads/posts/p1/replies")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"replies": [{"id": "r1", "text": "nice"}]}));

    let (status, body) = send(app, get("/api/threads/posts/p2/replies")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Object does not exist"}));
}

// ── Delete ──────────────────────────────────────────────────

#[tokio::test]
async fn test_delete_post() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/p1"))
        .and(bearer_token(TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/p2"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"message": "Cannot delete this post"}
        })))
        .mount(&server)
        .await;

    let app = app_for(&server);
    let (status, body) = send(app.clone(), delete("/api/threads/posts/p1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, body) = send(app, delete("/api/threads/posts/p2")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Cannot delete this post");
}

// ── Profile / limits / container ────────────────────────────

#[tokio::test]
async fn test_user_profile_is_passed_through() {
    let server = MockServer::start().await;
    let profile = json!({"id": "42", "username": "relay_user", "threads_biography": "hi"});
    Mock::given(method("GET"))
        .and(path("/me"))
        .and(query_param("fields", "id,username,threads_biography"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let (status, body) = send(
        app_for(&server),
        get("/api/threads/user?fields=id,username,threads_biography"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, profile);
}

#[tokio::test]
async fn test_limits_derive_remaining_posts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me/threads/config"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "config": {"threads_post_cap_quota": 250, "threads_video_post_cap_quota": 100},
            "quota_usage": {"threads_post_cap_quota": 10, "threads_video_post_cap_quota": 0}
        })))
        .mount(&server)
        .await;

    let (status, body) = send(app_for(&server), get("/api/threads/limits")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["remaining_posts"], 240);
    assert_eq!(body["remaining_video_posts"], 100);
    assert_eq!(body["quota"]["threads_post_cap_quota"], 250);
    assert_eq!(body["usage"]["threads_post_cap_quota"], 10);
}

#[tokio::test]
async fn test_limits_with_missing_cap_report_null() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me/threads/config"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let (status, body) = send(app_for(&server), get("/api/threads/limits")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["remaining_posts"].is_null());
    assert_eq!(body["quota"], json!({}));
}

#[tokio::test]
async fn test_container_status_is_passed_through() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/c-77"))
        .and(query_param("fields", "status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "FINISHED", "id": "c-77"})))
        .mount(&server)
        .await;

    let (status, body) = send(app_for(&server), get("/api/threads/container/c-77/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "FINISHED", "id": "c-77"}));
}

// ── Connectivity test ───────────────────────────────────────

#[tokio::test]
async fn test_connection_test_reads_token_from_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .and(query_param("fields", "id,username"))
        .and(bearer_token("THAAbody_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "42", "username": "relay_user"})))
        .expect(1)
        .mount(&server)
        .await;

    let (status, body) = send(
        app_for(&server),
        post_raw("/api/threads/test", r#"{"accessToken":"THAAbody_token"}"#, false),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "userId": "42", "username": "relay_user"}));
}

#[tokio::test]
async fn test_connection_test_mirrors_remote_status_with_details() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"message": "Invalid OAuth access token.", "code": 190}
        })))
        .mount(&server)
        .await;

    let (status, body) = send(
        app_for(&server),
        post_raw("/api/threads/test", r#"{"accessToken":"bad"}"#, false),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"], "Invalid OAuth access token.");
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_connection_test_malformed_body_is_500() {
    let server = MockServer::start().await;
    expect_no_remote_calls(&server).await;

    let (status, body) = send(
        app_for(&server),
        post_raw("/api/threads/test", "{not json", false),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["details"].is_string());
}

// ── Settings / health / headers ─────────────────────────────

#[tokio::test]
async fn test_settings_schema_and_validation() {
    let server = MockServer::start().await;
    expect_no_remote_calls(&server).await;
    let app = app_for(&server);

    let (status, body) = send(app.clone(), get_anonymous("/api/settings")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["schema"]["accessToken"], "string");

    let (status, _) = send(app.clone(), post_raw("/api/settings", r#"{"userId":"42"}"#, false)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        app.clone(),
        post_raw("/api/settings", r#"{"threadsAccessToken":"tok","threadsUserId":"42"}"#, false),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, body) = send(app, post_raw("/api/settings", "nope", false)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "failed to save settings");
}

#[tokio::test]
async fn test_responses_carry_request_id_and_security_headers() {
    use tower::ServiceExt;

    let server = MockServer::start().await;
    let resp = app_for(&server)
        .oneshot(get_anonymous("/healthz"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().get("x-request-id").is_some());
    assert_eq!(resp.headers()["x-content-type-options"], "nosniff");
    assert_eq!(resp.headers()["cache-control"], "no-store");
}

#[tokio::test]
async fn test_unknown_api_route_is_404() {
    let server = MockServer::start().await;
    expect_no_remote_calls(&server).await;

    let (status, _) = send(app_for(&server), get("/api/threads/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
