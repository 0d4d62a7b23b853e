//! X v2 posting client.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::header::AUTHORIZATION;
use std::time::Duration;

use super::oauth::OAuth1Signer;
use super::types::{CreatePostRequest, MediaMetadataRequest, MediaUploadResponse, Post};
use super::Publisher;
use crate::config::Config;
use crate::error::PublishError;

/// Publishes posts through `POST /2/tweets` with user-context OAuth1.
///
/// Images go through the v1.1 upload host first; the returned media id is
/// then attached with [`Post::with_media`].
pub struct TwitterClient {
    client: reqwest::Client,
    endpoint: String,
    upload_endpoint: String,
    metadata_endpoint: String,
    signer: OAuth1Signer,
}

impl TwitterClient {
    /// Create a client from the relay configuration.
    pub fn new(config: &Config) -> Result<Self, PublishError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("billcast/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let signer = OAuth1Signer::new(
            config.twitter.api_key.clone(),
            config.twitter.api_key_secret.clone(),
            config.twitter.access_token.clone(),
            config.twitter.access_token_secret.clone(),
        );

        let upload_base = config.twitter_upload_url.trim_end_matches('/');
        Ok(Self {
            client,
            endpoint: format!("{}/2/tweets", config.twitter_base_url.trim_end_matches('/')),
            upload_endpoint: format!("{upload_base}/1.1/media/upload.json"),
            metadata_endpoint: format!("{upload_base}/1.1/media/metadata/create.json"),
            signer,
        })
    }

    /// Send one post, propagating every failure.
    pub async fn try_publish(&self, post: &Post) -> Result<(), PublishError> {
        let authorization = self.signer.authorization("POST", &self.endpoint)?;

        let response = self
            .client
            .post(&self.endpoint)
            .header(AUTHORIZATION, authorization)
            .json(&CreatePostRequest::from(post))
            .send()
            .await?;

        ensure_success(response).await?;
        Ok(())
    }

    /// Upload image bytes, returning the media id.
    pub async fn try_upload_media(&self, media: &[u8]) -> Result<String, PublishError> {
        let media_data = STANDARD.encode(media);
        let form = [("media_data", media_data.as_str())];
        // Form fields are covered by the OAuth1 signature
        let authorization = self
            .signer
            .authorization_with("POST", &self.upload_endpoint, &form)?;

        let response = self
            .client
            .post(&self.upload_endpoint)
            .header(AUTHORIZATION, authorization)
            .form(&form)
            .send()
            .await?;

        let uploaded: MediaUploadResponse = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(|e| PublishError::UnexpectedResponse(e.to_string()))?;

        tracing::debug!(media_id = %uploaded.media_id_string, bytes = media.len(), "Uploaded media");
        Ok(uploaded.media_id_string)
    }

    /// Attach alt text to previously uploaded media.
    pub async fn try_set_alt_text(&self, media_id: &str, alt_text: &str) -> Result<(), PublishError> {
        let authorization = self.signer.authorization("POST", &self.metadata_endpoint)?;

        let response = self
            .client
            .post(&self.metadata_endpoint)
            .header(AUTHORIZATION, authorization)
            .json(&MediaMetadataRequest::new(media_id, alt_text))
            .send()
            .await?;

        ensure_success(response).await?;
        Ok(())
    }

    /// Upload an image and set its alt text.
    ///
    /// Returns the media id only when both steps succeed; failures are logged.
    pub async fn upload_media_with_alt_text(&self, media: &[u8], alt_text: &str) -> Option<String> {
        let media_id = match self.try_upload_media(media).await {
            Ok(media_id) => media_id,
            Err(e) => {
                tracing::error!(error = %e, bytes = media.len(), "Failed to upload media");
                return None;
            }
        };

        match self.try_set_alt_text(&media_id, alt_text).await {
            Ok(()) => Some(media_id),
            Err(e) => {
                tracing::error!(error = %e, media_id = %media_id, alt_text, "Failed to set alt text");
                None
            }
        }
    }
}

/// Pass 2xx responses through; turn anything else into [`PublishError::Rejected`].
async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, PublishError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => {
            tracing::debug!(error = %e, "Could not read rejection body");
            String::new()
        }
    };

    Err(PublishError::Rejected {
        status: status.as_u16(),
        reason: status.canonical_reason().unwrap_or("unknown").to_string(),
        body,
    })
}

#[async_trait]
impl Publisher for TwitterClient {
    async fn publish(&self, post: &Post) -> bool {
        match self.try_publish(post).await {
            Ok(()) => {
                tracing::info!(text = %post.log_text(), "Posted");
                true
            }
            Err(e) => {
                tracing::error!(error = %e, text = %post.log_text(), "Failed to post");
                false
            }
        }
    }
}
