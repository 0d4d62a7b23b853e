//! congress.gov bill source.
//!
//! Provides the bill data model and a client for the `/v3/bill` listing.

mod client;
mod types;

pub use client::CongressClient;
pub use types::{Bill, LatestAction};

#[cfg(test)]
pub(crate) use types::sample_bill;

use async_trait::async_trait;

use crate::store::Watermark;

/// A source of newly updated bills.
#[async_trait]
pub trait BillSource: Send + Sync {
    /// Fetch the newest page of bills updated after `after`.
    ///
    /// Never fails: any error is logged and yields an empty batch.
    async fn fetch(&self, after: Option<&Watermark>) -> Vec<Bill>;
}
