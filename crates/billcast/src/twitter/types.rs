//! Outbound post types.

use serde::{Deserialize, Serialize};

/// A post to publish on X.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    /// Post text.
    pub text: String,
    /// Previously uploaded media to attach.
    pub media_ids: Option<Vec<String>>,
    /// ID of a post to quote.
    pub quote_tweet_id: Option<String>,
}

impl Post {
    /// A plain text post.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            media_ids: None,
            quote_tweet_id: None,
        }
    }

    /// Attach uploaded media.
    #[must_use]
    pub fn with_media(mut self, media_ids: Vec<String>) -> Self {
        self.media_ids = if media_ids.is_empty() {
            None
        } else {
            Some(media_ids)
        };
        self
    }

    /// Quote another post.
    #[must_use]
    pub fn with_quote(mut self, tweet_id: impl Into<String>) -> Self {
        self.quote_tweet_id = Some(tweet_id.into());
        self
    }

    /// Text with newlines escaped, for single-line log output.
    #[must_use]
    pub fn log_text(&self) -> String {
        self.text.replace('\n', "\\n")
    }
}

/// Request body for `POST /2/tweets`.
#[derive(Debug, Serialize)]
pub(crate) struct CreatePostRequest<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    media: Option<MediaRequest<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    quote_tweet_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct MediaRequest<'a> {
    media_ids: &'a [String],
}

impl<'a> From<&'a Post> for CreatePostRequest<'a> {
    fn from(post: &'a Post) -> Self {
        Self {
            text: &post.text,
            media: post
                .media_ids
                .as_deref()
                .map(|media_ids| MediaRequest { media_ids }),
            quote_tweet_id: post.quote_tweet_id.as_deref(),
        }
    }
}

/// Response of `POST /1.1/media/upload.json`; only the id is used.
#[derive(Debug, Deserialize)]
pub(crate) struct MediaUploadResponse {
    pub(crate) media_id_string: String,
}

/// Request body for `POST /1.1/media/metadata/create.json`.
#[derive(Debug, Serialize)]
pub(crate) struct MediaMetadataRequest<'a> {
    media_id: &'a str,
    alt_text: AltText<'a>,
}

#[derive(Debug, Serialize)]
struct AltText<'a> {
    text: &'a str,
}

impl<'a> MediaMetadataRequest<'a> {
    pub(crate) fn new(media_id: &'a str, alt_text: &'a str) -> Self {
        Self {
            media_id,
            alt_text: AltText { text: alt_text },
        }
    }
}
