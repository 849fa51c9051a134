//! HTTP client for the Threads API.
//! Every call carries the caller's credential; nothing is cached or retried.
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::models::analytics::{AnalyticsReport, PostWithInsights};
use crate::models::container::{NewContainer, Published};
use crate::models::credential::Credential;
use crate::models::insight::{self, Insight};
use crate::models::post::{Page, Post, DEFAULT_PAGE_LIMIT, POST_FIELDS};
use crate::models::quota::QuotaSnapshot;
use crate::proxy::transform::{node_url, rewrite_url};

/// Why an upstream call did not produce a usable payload.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The remote answered with a non-2xx status.
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },

    #[error("request to Threads API failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response from Threads API: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Threads API response is missing '{0}'")]
    MissingField(&'static str),

    /// An id that cannot be used as a single path segment; nothing was sent.
    #[error("invalid id '{0}'")]
    InvalidId(String),
}

/// `{ "error": { "message": ..., "code": ... } }`
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<Value>,
    code: Option<Value>,
}

fn error_body(body: &str) -> Option<ErrorBody> {
    let envelope: ErrorEnvelope = serde_json::from_str(body).ok()?;
    envelope.error
}

/// The human-readable message of a remote error body, if it has one.
pub fn remote_message(body: &str) -> Option<String> {
    match error_body(body)?.message? {
        Value::String(s) if !s.trim().is_empty() => Some(s),
        _ => None,
    }
}

/// The numeric (or string) `error.code` of a remote error body.
pub fn remote_code(body: &str) -> Option<String> {
    match error_body(body)?.code? {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.trim().is_empty() => Some(s),
        _ => None,
    }
}

/// Account identity as returned by `/me?fields=id,username`.
#[derive(Debug, Clone, Deserialize)]
pub struct Identity {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
}

fn id_string<'de, D: serde::Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    match Value::deserialize(d)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("invalid id: {}", other))),
    }
}

fn id_of(body: &Value) -> Result<String, RemoteError> {
    match body.get("id") {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(RemoteError::MissingField("id")),
    }
}

pub struct ThreadsClient {
    client: reqwest::Client,
    base: String,
}

impl ThreadsClient {
    pub fn new(base: impl Into<String>) -> anyhow::Result<Self> {
        // No total timeout: a call waits for the remote's own deadline.
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .pool_max_idle_per_host(32)
            .build()?;

        Ok(Self {
            client,
            base: base.into(),
        })
    }

    /// URL of a node under the API root, refusing ids that are not a single path segment.
    fn node(&self, id: &str, suffix: &str) -> Result<String, RemoteError> {
        node_url(&self.base, id, suffix).ok_or_else(|| RemoteError::InvalidId(id.to_string()))
    }

    /// Issue one request and return the decoded JSON body.
    ///
    /// On a non-2xx status the remote error message is extracted when present;
    /// otherwise `fallback` builds one from the status and the remote `error.code`.
    async fn call(
        &self,
        credential: &Credential,
        method: Method,
        url: &str,
        query: &[(&str, String)],
        fallback: impl FnOnce(StatusCode, Option<String>) -> String,
    ) -> Result<Value, RemoteError> {
        tracing::debug!(%method, url, "forwarding to Threads API");

        let resp = self
            .client
            .request(method, url)
            .bearer_auth(credential.token())
            .query(query)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Threads API request failed: {}", e);
                RemoteError::Transport(e)
            })?;

        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            let message = remote_message(&body).unwrap_or_else(|| fallback(status, remote_code(&body)));
            tracing::warn!(status = status.as_u16(), url, "Threads API rejected request: {}", message);
            return Err(RemoteError::Rejected { status, message });
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        credential: &Credential,
        url: &str,
        query: &[(&str, String)],
        fallback: impl FnOnce(StatusCode, Option<String>) -> String,
    ) -> Result<T, RemoteError> {
        let body = self.call(credential, Method::GET, url, query, fallback).await?;
        Ok(serde_json::from_value(body)?)
    }

    /// The caller's account id: taken from the credential when known, otherwise `/me?fields=id`.
    pub async fn resolve_user_id(&self, credential: &Credential) -> Result<String, RemoteError> {
        if let Some(id) = credential.account_id() {
            return Ok(id.to_string());
        }
        let body = self
            .call(
                credential,
                Method::GET,
                &rewrite_url(&self.base, "/me"),
                &[("fields", "id".to_string())],
                |status, _| format!("Failed to get user ID ({})", status.as_u16()),
            )
            .await?;
        id_of(&body)
    }

    /// `/me?fields=id,username`, used to check that a token works at all.
    pub async fn whoami(&self, credential: &Credential) -> Result<Identity, RemoteError> {
        self.get(
            credential,
            &rewrite_url(&self.base, "/me"),
            &[("fields", "id,username".to_string())],
            |status, _| {
                status
                    .canonical_reason()
                    .unwrap_or("Failed to fetch user")
                    .to_string()
            },
        )
        .await
    }

    pub async fn fetch_user(&self, credential: &Credential, fields: &str) -> Result<Value, RemoteError> {
        self.call(
            credential,
            Method::GET,
            &rewrite_url(&self.base, "/me"),
            &[("fields", fields.to_string())],
            |_, _| "Failed to fetch user".to_string(),
        )
        .await
    }

    pub async fn list_posts(&self, credential: &Credential, user_id: &str) -> Result<Page<Post>, RemoteError> {
        self.get(
            credential,
            &self.node(user_id, "/threads")?,
            &[
                ("fields", POST_FIELDS.to_string()),
                ("limit", DEFAULT_PAGE_LIMIT.to_string()),
            ],
            |status, _| format!("Failed to fetch posts ({})", status.as_u16()),
        )
        .await
    }

    /// Insights of one post, with either remote response shape flattened to the metric array.
    pub async fn fetch_insights(
        &self,
        credential: &Credential,
        post_id: &str,
        metrics: &str,
    ) -> Result<Vec<Value>, RemoteError> {
        let body = self
            .call(
                credential,
                Method::GET,
                &self.node(post_id, "/insights")?,
                &[("metric", metrics.to_string())],
                |_, code| code.unwrap_or_else(|| "Failed to fetch insights".to_string()),
            )
            .await?;
        Ok(insight::normalize(body))
    }

    pub async fn fetch_likes(
        &self,
        credential: &Credential,
        post_id: &str,
        limit: u32,
    ) -> Result<Page<Value>, RemoteError> {
        self.get(
            credential,
            &self.node(post_id, "/likes")?,
            &[("limit", limit.to_string())],
            |_, _| "Failed to fetch likes".to_string(),
        )
        .await
    }

    pub async fn fetch_replies(
        &self,
        credential: &Credential,
        post_id: &str,
        fields: &str,
        limit: u32,
    ) -> Result<Page<Post>, RemoteError> {
        self.get(
            credential,
            &self.node(post_id, "/replies")?,
            &[("fields", fields.to_string()), ("limit", limit.to_string())],
            |_, _| "Failed to fetch replies".to_string(),
        )
        .await
    }

    pub async fn delete_post(&self, credential: &Credential, post_id: &str) -> Result<(), RemoteError> {
        self.call(
            credential,
            Method::DELETE,
            &self.node(post_id, "")?,
            &[],
            |_, _| "Failed to delete post".to_string(),
        )
        .await?;
        Ok(())
    }

    pub async fn fetch_quota(&self, credential: &Credential) -> Result<QuotaSnapshot, RemoteError> {
        let body = self
            .call(
                credential,
                Method::GET,
                &rewrite_url(&self.base, "/me/threads/config"),
                &[],
                |_, _| "Failed to fetch limits".to_string(),
            )
            .await?;
        Ok(QuotaSnapshot::from_remote(&body))
    }

    pub async fn container_status(&self, credential: &Credential, container_id: &str) -> Result<Value, RemoteError> {
        self.call(
            credential,
            Method::GET,
            &self.node(container_id, "")?,
            &[("fields", "status".to_string())],
            |_, _| "Failed to fetch container status".to_string(),
        )
        .await
    }

    /// Step 1 of publishing: create the draft and return its id.
    pub async fn create_container(
        &self,
        credential: &Credential,
        user_id: &str,
        container: &NewContainer,
    ) -> Result<String, RemoteError> {
        let query = container.query_pairs()?;
        let body = self
            .call(
                credential,
                Method::POST,
                &self.node(user_id, "/threads")?,
                &query,
                |_, _| "Failed to create container".to_string(),
            )
            .await?;
        id_of(&body)
    }

    /// Step 2 of publishing: `POST /{owner}/threads_publish?creation_id=...`.
    pub async fn publish_container(
        &self,
        credential: &Credential,
        owner_id: &str,
        container_id: &str,
        fallback: &'static str,
    ) -> Result<String, RemoteError> {
        let body = self
            .call(
                credential,
                Method::POST,
                &self.node(owner_id, "/threads_publish")?,
                &[("creation_id", container_id.to_string())],
                |_, _| fallback.to_string(),
            )
            .await?;
        id_of(&body)
    }

    /// Create then publish. The second call is only made once the first succeeded; if it
    /// fails the draft is left behind on the remote side.
    pub async fn publish(
        &self,
        credential: &Credential,
        user_id: &str,
        container: &NewContainer,
    ) -> Result<Published, RemoteError> {
        let container_id = self.create_container(credential, user_id, container).await?;
        tracing::info!(container_id = %container_id, media_type = container.media_type().as_str(), "container created");

        let post_id = self
            .publish_container(credential, user_id, &container_id, "Failed to publish")
            .await?;
        tracing::info!(post_id = %post_id, "post published");

        Ok(Published {
            post_id,
            container_id,
        })
    }

    /// Reply to a post: text container under `/{post}/reply`, published under its own id.
    /// Returns the reply container id.
    pub async fn reply(&self, credential: &Credential, post_id: &str, text: &str) -> Result<String, RemoteError> {
        let body = self
            .call(
                credential,
                Method::POST,
                &self.node(post_id, "/reply")?,
                &[("media_type", "TEXT".to_string()), ("text", text.to_string())],
                |_, _| "Failed to create reply container".to_string(),
            )
            .await?;
        let container_id = id_of(&body)?;

        self.publish_container(credential, &container_id, &container_id, "Failed to publish reply")
            .await?;
        tracing::info!(post_id, reply_id = %container_id, "reply published");

        Ok(container_id)
    }

    /// One page of posts, each merged with its insights.
    ///
    /// Insights are fetched one post at a time. A post whose insights cannot be fetched
    /// is kept with zeroed metrics instead of failing the batch.
    pub async fn collect_analytics(&self, credential: &Credential) -> Result<AnalyticsReport, RemoteError> {
        let user_id = self.resolve_user_id(credential).await?;
        let page = self.list_posts(credential, &user_id).await?;

        let mut merged = Vec::with_capacity(page.data.len());
        for post in page.data {
            let insights = match self
                .fetch_insights(credential, &post.id, insight::DEFAULT_METRICS)
                .await
                .and_then(|items| Ok(serde_json::from_value::<Vec<Insight>>(Value::Array(items))?))
            {
                Ok(items) => Some(items),
                Err(e) => {
                    tracing::warn!(post_id = %post.id, "insights unavailable, counting as zero: {}", e);
                    None
                }
            };
            merged.push(PostWithInsights::new(post, insights));
        }

        Ok(AnalyticsReport::build(merged))
    }
}
