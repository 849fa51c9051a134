use std::sync::Arc;

use axum::{
    extract::{Path, RawQuery, State},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::errors::{AppError, ForwardExt, Operation};
use crate::models::credential::Credential;
use crate::models::insight::DEFAULT_METRICS;
use crate::models::post::{Post, DEFAULT_PAGE_LIMIT, REPLY_FIELDS};
use crate::models::quota::QuotaSnapshot;
use crate::AppState;

/// Profile fields requested when the caller does not name any.
const DEFAULT_USER_FIELDS: &str = "id,username,threads_profile_picture_url,threads_biography";

// ── Request / Response DTOs ──────────────────────────────────

/// First value of any of `keys` in a raw query string. Repeated keys are not an error;
/// the first occurrence wins.
fn first_param(query: Option<&str>, keys: &[&str]) -> Option<String> {
    url::form_urlencoded::parse(query?.as_bytes())
        .find(|(k, _)| keys.iter().any(|key| *key == *k))
        .map(|(_, v)| v.into_owned())
}

pub struct ListParams {
    pub limit: Option<String>,
    pub fields: Option<String>,
}

impl ListParams {
    pub fn from_query(query: Option<&str>) -> Self {
        Self {
            limit: first_param(query, &["limit"]),
            fields: first_param(query, &["fields"]),
        }
    }

    fn limit(&self) -> u32 {
        self.limit
            .as_deref()
            .and_then(|l| l.trim().parse().ok())
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_PAGE_LIMIT)
    }

    fn fields<'a>(&'a self, default: &'a str) -> &'a str {
        self.fields
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .unwrap_or(default)
    }
}

pub struct InsightParams {
    pub metrics: Option<String>,
}

impl InsightParams {
    pub fn from_query(query: Option<&str>) -> Self {
        Self {
            metrics: first_param(query, &["metrics", "metric"]),
        }
    }
}

#[derive(Serialize)]
pub struct PostsResponse {
    pub posts: Vec<Post>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paging: Option<Value>,
}

#[derive(Serialize)]
pub struct InsightsResponse {
    pub data: Vec<Value>,
}

#[derive(Serialize)]
pub struct LikesResponse {
    pub likes: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paging: Option<Value>,
    pub total: usize,
}

#[derive(Serialize)]
pub struct RepliesResponse {
    pub replies: Vec<Post>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paging: Option<Value>,
}

// ── Handlers ─────────────────────────────────────────────────

/// GET /api/threads/posts: first page of the caller's own posts
#[tracing::instrument(skip_all)]
pub async fn list_posts(
    State(state): State<Arc<AppState>>,
    credential: Credential,
) -> Result<Json<PostsResponse>, AppError> {
    let user_id = state
        .threads
        .resolve_user_id(&credential)
        .await
        .forwarding(Operation::FetchPosts)?;

    let page = state
        .threads
        .list_posts(&credential, &user_id)
        .await
        .forwarding(Operation::FetchPosts)?;

    Ok(Json(PostsResponse {
        posts: page.data,
        paging: page.paging,
    }))
}

/// GET /api/threads/posts/:post_id/insights: per-post metrics
#[tracing::instrument(skip(state, credential, query))]
pub async fn get_insights(
    State(state): State<Arc<AppState>>,
    credential: Credential,
    Path(post_id): Path<String>,
    RawQuery(query): RawQuery,
) -> Result<Json<InsightsResponse>, AppError> {
    let params = InsightParams::from_query(query.as_deref());
    let metrics = params
        .metrics
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or(DEFAULT_METRICS);

    let data = state
        .threads
        .fetch_insights(&credential, &post_id, metrics)
        .await
        .forwarding(Operation::FetchInsights)?;

    Ok(Json(InsightsResponse { data }))
}

/// GET /api/threads/posts/:post_id/likes
#[tracing::instrument(skip(state, credential, query))]
pub async fn get_likes(
    State(state): State<Arc<AppState>>,
    credential: Credential,
    Path(post_id): Path<String>,
    RawQuery(query): RawQuery,
) -> Result<Json<LikesResponse>, AppError> {
    let params = ListParams::from_query(query.as_deref());
    let page = state
        .threads
        .fetch_likes(&credential, &post_id, params.limit())
        .await
        .forwarding(Operation::FetchLikes)?;

    Ok(Json(LikesResponse {
        total: page.data.len(),
        likes: page.data,
        paging: page.paging,
    }))
}

/// GET /api/threads/posts/:post_id/replies
#[tracing::instrument(skip(state, credential, query))]
pub async fn get_replies(
    State(state): State<Arc<AppState>>,
    credential: Credential,
    Path(post_id): Path<String>,
    RawQuery(query): RawQuery,
) -> Result<Json<RepliesResponse>, AppError> {
    let params = ListParams::from_query(query.as_deref());
    let page = state
        .threads
        .fetch_replies(
            &credential,
            &post_id,
            params.fields(REPLY_FIELDS),
            params.limit(),
        )
        .await
        .forwarding(Operation::FetchReplies)?;

    Ok(Json(RepliesResponse {
        replies: page.data,
        paging: page.paging,
    }))
}

/// DELETE /api/threads/posts/:post_id
#[tracing::instrument(skip(state, credential))]
pub async fn delete_post(
    State(state): State<Arc<AppState>>,
    credential: Credential,
    Path(post_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    state
        .threads
        .delete_post(&credential, &post_id)
        .await
        .forwarding(Operation::DeletePost)?;

    tracing::info!("post deleted");
    Ok(Json(json!({ "success": true, "message": "post deleted" })))
}

/// GET /api/threads/user: profile of the token's account, passed through as-is
#[tracing::instrument(skip_all)]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    credential: Credential,
    RawQuery(query): RawQuery,
) -> Result<Json<Value>, AppError> {
    let params = ListParams::from_query(query.as_deref());
    let profile = state
        .threads
        .fetch_user(&credential, params.fields(DEFAULT_USER_FIELDS))
        .await
        .forwarding(Operation::FetchUser)?;

    Ok(Json(profile))
}

/// GET /api/threads/limits: publishing quota with remaining counts
#[tracing::instrument(skip_all)]
pub async fn get_limits(
    State(state): State<Arc<AppState>>,
    credential: Credential,
) -> Result<Json<QuotaSnapshot>, AppError> {
    let snapshot = state
        .threads
        .fetch_quota(&credential)
        .await
        .forwarding(Operation::FetchLimits)?;

    Ok(Json(snapshot))
}

/// GET /api/threads/container/:container_id/status
#[tracing::instrument(skip(state, credential))]
pub async fn get_container_status(
    State(state): State<Arc<AppState>>,
    credential: Credential,
    Path(container_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let status = state
        .threads
        .container_status(&credential, &container_id)
        .await
        .forwarding(Operation::ContainerStatus)?;

    Ok(Json(status))
}
