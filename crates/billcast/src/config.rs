//! Relay configuration.

use anyhow::{Context, Result};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default directory for the watermark and retry queue files.
pub const DEFAULT_DATA_DIR: &str = ".data";

/// Default seconds between poll cycles.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// Default age, in days, after which a bill's latest action is not posted.
pub const DEFAULT_STALE_DAYS: i64 = 3;

/// Bills requested per fetch.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Default per-request HTTP timeout.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// congress.gov API root.
pub const DEFAULT_CONGRESS_API_URL: &str = "https://api.congress.gov";

/// X API root.
pub const DEFAULT_TWITTER_API_URL: &str = "https://api.twitter.com";

/// X media upload root.
pub const DEFAULT_TWITTER_UPLOAD_URL: &str = "https://upload.twitter.com";

/// OAuth1 user-context credentials for X.
#[derive(Clone)]
pub struct TwitterCredentials {
    /// Consumer (API) key.
    pub api_key: String,
    /// Consumer (API) key secret.
    pub api_key_secret: String,
    /// User access token.
    pub access_token: String,
    /// User access token secret.
    pub access_token_secret: String,
}

impl fmt::Debug for TwitterCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TwitterCredentials")
            .field("api_key", &"***")
            .field("api_key_secret", &"***")
            .field("access_token", &"***")
            .field("access_token_secret", &"***")
            .finish()
    }
}

/// Everything the relay needs, built once at startup.
#[derive(Clone)]
pub struct Config {
    /// congress.gov API key.
    pub congress_token: String,
    /// X credentials.
    pub twitter: TwitterCredentials,
    /// Directory holding relay state.
    pub data_dir: PathBuf,
    /// Time between poll cycles.
    pub poll_interval: Duration,
    /// Bills whose latest action is older than this are skipped.
    pub stale_after: chrono::Duration,
    /// Bills requested per fetch.
    pub page_size: usize,
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
    /// congress.gov API root.
    pub congress_base_url: String,
    /// X API root.
    pub twitter_base_url: String,
    /// X media upload root.
    pub twitter_upload_url: String,
    /// Cap on the retry queue; oldest entries are dropped past it.
    pub max_retry_queue: Option<usize>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("congress_token", &"***")
            .field("twitter", &self.twitter)
            .field("data_dir", &self.data_dir)
            .field("poll_interval", &self.poll_interval)
            .field("stale_after", &self.stale_after)
            .field("page_size", &self.page_size)
            .field("request_timeout", &self.request_timeout)
            .field("congress_base_url", &self.congress_base_url)
            .field("twitter_base_url", &self.twitter_base_url)
            .field("twitter_upload_url", &self.twitter_upload_url)
            .field("max_retry_queue", &self.max_retry_queue)
            .finish()
    }
}

impl Config {
    /// Create configuration from environment variables.
    ///
    /// # Required Environment Variables
    /// - `CONGRESS_TOKEN`: congress.gov API key
    /// - `TWITTER_API_KEY`, `TWITTER_API_KEY_SECRET`: consumer credentials
    /// - `TWITTER_ACCESS_TOKEN`, `TWITTER_ACCESS_TOKEN_SECRET`: user credentials
    ///
    /// # Optional Environment Variables
    /// - `BILLCAST_DATA_DIR`: state directory (default: .data)
    /// - `BILLCAST_POLL_INTERVAL_SECS`: seconds between cycles (default: 10)
    /// - `BILLCAST_STALE_DAYS`: skip actions older than this (default: 3)
    /// - `BILLCAST_REQUEST_TIMEOUT_SECS`: HTTP timeout (default: 30)
    /// - `BILLCAST_MAX_RETRY_QUEUE`: retry queue cap (default: unbounded)
    /// - `CONGRESS_API_URL`, `TWITTER_API_URL`, `TWITTER_UPLOAD_URL`: API roots
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Create configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("{name} environment variable not set"))
        };

        let congress_token = required("CONGRESS_TOKEN")?;
        let twitter = TwitterCredentials {
            api_key: required("TWITTER_API_KEY")?,
            api_key_secret: required("TWITTER_API_KEY_SECRET")?,
            access_token: required("TWITTER_ACCESS_TOKEN")?,
            access_token_secret: required("TWITTER_ACCESS_TOKEN_SECRET")?,
        };

        let data_dir = lookup("BILLCAST_DATA_DIR")
            .filter(|v| !v.trim().is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_DATA_DIR), PathBuf::from);

        let poll_interval = Duration::from_secs(
            parse_var(&lookup, "BILLCAST_POLL_INTERVAL_SECS")
                .filter(|secs: &u64| *secs > 0)
                .unwrap_or(DEFAULT_POLL_INTERVAL_SECS),
        );

        let stale_after = chrono::Duration::days(
            parse_var(&lookup, "BILLCAST_STALE_DAYS")
                .filter(|days: &i64| *days >= 0)
                .unwrap_or(DEFAULT_STALE_DAYS),
        );

        let request_timeout = Duration::from_secs(
            parse_var(&lookup, "BILLCAST_REQUEST_TIMEOUT_SECS")
                .filter(|secs: &u64| *secs > 0)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        );

        let max_retry_queue =
            parse_var(&lookup, "BILLCAST_MAX_RETRY_QUEUE").filter(|cap: &usize| *cap > 0);

        Ok(Self {
            congress_token,
            twitter,
            data_dir,
            poll_interval,
            stale_after,
            page_size: DEFAULT_PAGE_SIZE,
            request_timeout,
            congress_base_url: lookup("CONGRESS_API_URL")
                .unwrap_or_else(|| DEFAULT_CONGRESS_API_URL.to_string()),
            twitter_base_url: lookup("TWITTER_API_URL")
                .unwrap_or_else(|| DEFAULT_TWITTER_API_URL.to_string()),
            twitter_upload_url: lookup("TWITTER_UPLOAD_URL")
                .unwrap_or_else(|| DEFAULT_TWITTER_UPLOAD_URL.to_string()),
            max_retry_queue,
        })
    }

    /// Path of the watermark file.
    #[must_use]
    pub fn watermark_path(&self) -> PathBuf {
        self.data_dir.join(crate::store::WATERMARK_FILE)
    }

    /// Path of the retry queue file.
    #[must_use]
    pub fn retry_queue_path(&self) -> PathBuf {
        self.data_dir.join(crate::store::RETRY_QUEUE_FILE)
    }
}

/// Parse an optional variable, treating unparseable values as unset.
fn parse_var<T, F>(lookup: &F, name: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(name).and_then(|v| v.trim().parse().ok())
}
