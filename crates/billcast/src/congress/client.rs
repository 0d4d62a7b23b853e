//! congress.gov `/bill` client.

use async_trait::async_trait;
use std::time::Duration;

use super::types::{Bill, BillsPage};
use super::BillSource;
use crate::config::Config;
use crate::error::FetchError;
use crate::store::Watermark;

/// Fetches recently updated bills from the congress.gov v3 API.
pub struct CongressClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    page_size: usize,
}

impl CongressClient {
    /// Create a client from the relay configuration.
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("billcast/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: config.congress_base_url.trim_end_matches('/').to_string(),
            api_key: config.congress_token.clone(),
            page_size: config.page_size,
        })
    }

    /// Fetch one page of bills, propagating every failure.
    pub async fn try_fetch(&self, after: Option<&Watermark>) -> Result<Vec<Bill>, FetchError> {
        let url = format!("{}/v3/bill", self.base_url);
        let limit = self.page_size.to_string();

        let mut query: Vec<(&str, &str)> = vec![
            ("api_key", self.api_key.as_str()),
            ("format", "json"),
            ("limit", limit.as_str()),
        ];
        if let Some(watermark) = after {
            query.push(("fromDateTime", watermark.as_str()));
        }

        tracing::info!(
            url = %url,
            from = ?after.map(Watermark::as_str),
            limit = self.page_size,
            "Fetching bills"
        );

        // reqwest errors carry the request URL, which includes the api key
        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("unknown").to_string(),
            });
        }

        let body = response.text().await.map_err(reqwest::Error::without_url)?;
        parse_bills(&body)
    }
}

#[async_trait]
impl BillSource for CongressClient {
    async fn fetch(&self, after: Option<&Watermark>) -> Vec<Bill> {
        match self.try_fetch(after).await {
            Ok(bills) => {
                tracing::debug!(count = bills.len(), "Fetched bills");
                bills
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to fetch bills");
                Vec::new()
            }
        }
    }
}

/// Parse a `/bill` response body, skipping entries that don't look like bills.
pub(crate) fn parse_bills(body: &str) -> Result<Vec<Bill>, FetchError> {
    let page: BillsPage =
        serde_json::from_str(body).map_err(|e| FetchError::Malformed(e.to_string()))?;

    let mut bills = Vec::with_capacity(page.bills.len());
    for (index, raw) in page.bills.into_iter().enumerate() {
        match serde_json::from_value::<Bill>(raw) {
            Ok(bill) => bills.push(bill),
            Err(e) => {
                tracing::warn!(index, error = %e, "Skipping malformed bill");
            }
        }
    }

    Ok(bills)
}
