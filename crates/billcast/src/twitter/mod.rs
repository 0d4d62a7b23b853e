//! X (Twitter) publishing.
//!
//! Posts are sent through the v2 API, signed with OAuth 1.0a user context.

mod client;
pub mod oauth;
mod types;

pub use client::TwitterClient;
pub use oauth::OAuth1Signer;
pub use types::Post;

use async_trait::async_trait;

/// Sends posts to a social feed.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish `post`, returning whether the service accepted it.
    ///
    /// Never fails: errors are logged and reported as `false`.
    async fn publish(&self, post: &Post) -> bool;
}
