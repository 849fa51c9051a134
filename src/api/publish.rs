use std::sync::Arc;

use axum::{body::Bytes, extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, ForwardExt, Operation};
use crate::models::container::{Attachment, NewContainer, CAROUSEL_MAX_ITEMS, CAROUSEL_MIN_ITEMS};
use crate::models::credential::Credential;
use crate::models::post::MediaType;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub image_urls: Vec<String>,
    #[serde(default)]
    pub media_type: Option<MediaType>,
}

fn non_empty(s: &Option<String>) -> Option<String> {
    s.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl PublishRequest {
    /// The explicit media type, or the one implied by whichever media field is filled.
    pub fn resolved_media_type(&self) -> MediaType {
        if let Some(mt) = self.media_type {
            return mt;
        }
        if !self.image_urls.is_empty() {
            MediaType::Carousel
        } else if non_empty(&self.image_url).is_some() {
            MediaType::Image
        } else if non_empty(&self.video_url).is_some() {
            MediaType::Video
        } else {
            MediaType::Text
        }
    }

    /// Validate locally and build the container, before anything reaches the remote.
    /// A request that cannot be sent is reported like any other publish failure: 500 with the reason.
    pub fn into_container(self) -> Result<NewContainer, AppError> {
        let media_type = self.resolved_media_type();
        let text = self.text.filter(|t| !t.trim().is_empty());

        let attachment = match media_type {
            MediaType::Text => {
                if text.is_none() {
                    return Err(AppError::rejected_locally(Operation::Publish, "text is required for a text post"));
                }
                Attachment::None
            }
            MediaType::Image => Attachment::Image(
                non_empty(&self.image_url)
                    .ok_or_else(|| AppError::rejected_locally(Operation::Publish, "imageUrl is required for an image post"))?,
            ),
            MediaType::Video => Attachment::Video(
                non_empty(&self.video_url)
                    .ok_or_else(|| AppError::rejected_locally(Operation::Publish, "videoUrl is required for a video post"))?,
            ),
            MediaType::Carousel => {
                let urls: Vec<String> = self
                    .image_urls
                    .iter()
                    .map(|u| u.trim())
                    .filter(|u| !u.is_empty())
                    .map(str::to_string)
                    .collect();
                if urls.len() < CAROUSEL_MIN_ITEMS || urls.len() > CAROUSEL_MAX_ITEMS {
                    return Err(AppError::rejected_locally(
                        Operation::Publish,
                        format!(
                            "a carousel needs between {} and {} imageUrls, got {}",
                            CAROUSEL_MIN_ITEMS,
                            CAROUSEL_MAX_ITEMS,
                            urls.len()
                        ),
                    ));
                }
                Attachment::Carousel(urls)
            }
        };

        Ok(NewContainer { text, attachment })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishResponse {
    pub success: bool,
    pub post_id: String,
    pub container_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyRequest {
    #[serde(default)]
    pub post_id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyResponse {
    pub success: bool,
    pub reply_id: String,
}

/// POST /api/threads/publish: create a container, then publish it
#[tracing::instrument(skip_all)]
pub async fn publish(
    State(state): State<Arc<AppState>>,
    credential: Credential,
    body: Bytes,
) -> Result<Json<PublishResponse>, AppError> {
    let request: PublishRequest =
        serde_json::from_slice(&body).map_err(|e| AppError::local(Operation::Publish, e))?;
    let container = request.into_container()?;

    let user_id = state
        .threads
        .resolve_user_id(&credential)
        .await
        .forwarding(Operation::Publish)?;

    let published = state
        .threads
        .publish(&credential, &user_id, &container)
        .await
        .forwarding(Operation::Publish)?;

    Ok(Json(PublishResponse {
        success: true,
        post_id: published.post_id,
        container_id: published.container_id,
    }))
}

/// POST /api/threads/reply: reply to a post with text
#[tracing::instrument(skip_all)]
pub async fn reply(
    State(state): State<Arc<AppState>>,
    credential: Credential,
    body: Bytes,
) -> Result<Json<ReplyResponse>, AppError> {
    let request: ReplyRequest =
        serde_json::from_slice(&body).map_err(|e| AppError::local(Operation::Reply, e))?;

    let (post_id, text) = match (non_empty(&request.post_id), non_empty(&request.text)) {
        (Some(p), Some(t)) => (p, t),
        _ => return Err(AppError::InvalidRequest("postId and text are required".into())),
    };

    let reply_id = state
        .threads
        .reply(&credential, &post_id, &text)
        .await
        .forwarding(Operation::Reply)?;

    Ok(Json(ReplyResponse {
        success: true,
        reply_id,
    }))
}
