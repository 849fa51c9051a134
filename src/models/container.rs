use serde::{Deserialize, Serialize};

use super::post::MediaType;

/// Platform bounds on the number of carousel children.
pub const CAROUSEL_MIN_ITEMS: usize = 2;
pub const CAROUSEL_MAX_ITEMS: usize = 20;

/// Lifecycle of a remote draft. The remote reports upper-case names;
/// lower-case spellings are accepted as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContainerState {
    #[serde(alias = "pending")]
    Pending,
    #[serde(alias = "in_progress")]
    InProgress,
    #[serde(alias = "finished")]
    Finished,
    #[serde(alias = "error")]
    Error,
    #[serde(alias = "published")]
    Published,
    #[serde(alias = "expired")]
    Expired,
}

/// Media attached to a new container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attachment {
    None,
    Image(String),
    Video(String),
    Carousel(Vec<String>),
}

/// Everything needed for the container-creation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContainer {
    pub text: Option<String>,
    pub attachment: Attachment,
}

#[derive(Serialize)]
struct CarouselChild<'a> {
    media_type: &'static str,
    image_url: &'a str,
}

impl NewContainer {
    pub fn media_type(&self) -> MediaType {
        match self.attachment {
            Attachment::None => MediaType::Text,
            Attachment::Image(_) => MediaType::Image,
            Attachment::Video(_) => MediaType::Video,
            Attachment::Carousel(_) => MediaType::Carousel,
        }
    }

    /// Query parameters of `POST /{user}/threads`, in the order they are sent.
    pub fn query_pairs(&self) -> Result<Vec<(&'static str, String)>, serde_json::Error> {
        let mut pairs = vec![("media_type", self.media_type().as_str().to_string())];

        if let Some(text) = self.text.as_deref().filter(|t| !t.is_empty()) {
            pairs.push(("text", text.to_string()));
        }

        match &self.attachment {
            Attachment::None => {}
            Attachment::Image(url) => pairs.push(("image_url", url.clone())),
            Attachment::Video(url) => pairs.push(("video_url", url.clone())),
            Attachment::Carousel(urls) => {
                let children: Vec<CarouselChild<'_>> = urls
                    .iter()
                    .map(|url| CarouselChild {
                        media_type: MediaType::Image.as_str(),
                        image_url: url,
                    })
                    .collect();
                pairs.push(("children", serde_json::to_string(&children)?));
            }
        }

        Ok(pairs)
    }
}

/// Outcome of a successful two-step publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub post_id: String,
    pub container_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_container_pairs() {
        let pairs = NewContainer {
            text: Some("hello".into()),
            attachment: Attachment::None,
        }
        .query_pairs()
        .unwrap();
        assert_eq!(
            pairs,
            vec![("media_type", "TEXT".to_string()), ("text", "hello".to_string())]
        );
    }

    #[test]
    fn test_empty_text_is_not_sent() {
        let c = NewContainer {
            text: Some(String::new()),
            attachment: Attachment::Image("https://cdn.example/a.jpg".into()),
        };
        let pairs = c.query_pairs().unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[1], ("image_url", "https://cdn.example/a.jpg".to_string()));
    }

    #[test]
    fn test_carousel_children_keep_order() {
        let c = NewContainer {
            text: None,
            attachment: Attachment::Carousel(vec!["u1".into(), "u2".into()]),
        };
        let pairs = c.query_pairs().unwrap();
        assert_eq!(pairs[0], ("media_type", "CAROUSEL".to_string()));
        let children: serde_json::Value = serde_json::from_str(&pairs[1].1).unwrap();
        assert_eq!(
            children,
            serde_json::json!([
                {"media_type": "IMAGE", "image_url": "u1"},
                {"media_type": "IMAGE", "image_url": "u2"}
            ])
        );
    }

    #[test]
    fn test_container_state_accepts_both_spellings() {
        let upper: ContainerState = serde_json::from_str("\"IN_PROGRESS\"").unwrap();
        let lower: ContainerState = serde_json::from_str("\"in_progress\"").unwrap();
        assert_eq!(upper, ContainerState::InProgress);
        assert_eq!(lower, upper);
    }
}
