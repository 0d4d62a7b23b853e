//! Congress bill relay.
//!
//! This crate provides:
//! - Polling of the congress.gov `/v3/bill` listing for recently updated bills
//! - Formatting of each bill into a length-bounded post
//! - Publishing to X through the v2 API with OAuth 1.0a signing
//! - A file-backed watermark and retry queue so restarts neither repost nor
//!   lose bills

pub mod config;
pub mod congress;
pub mod error;
pub mod format;
pub mod pipeline;
pub mod runner;
pub mod store;
pub mod twitter;

// Re-export main types
pub use config::Config;
pub use congress::{Bill, BillSource, CongressClient, LatestAction};
pub use error::{FetchError, PublishError, StoreError};
pub use pipeline::{CycleReport, Pipeline, PipelineConfig};
pub use runner::Runner;
pub use store::{RetryQueue, Watermark, WatermarkStore};
pub use twitter::{Post, Publisher, TwitterClient};
