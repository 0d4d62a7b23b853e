//! Relay pipeline - one fetch, publish, retry and persist pass.

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{Config, DEFAULT_DATA_DIR, DEFAULT_STALE_DAYS};
use crate::congress::{Bill, BillSource};
use crate::format::format_post;
use crate::store::{RetryQueue, Watermark, WatermarkStore, RETRY_QUEUE_FILE, WATERMARK_FILE};
use crate::twitter::Publisher;

/// Configuration for the relay pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Watermark file path.
    pub watermark_path: PathBuf,
    /// Retry queue file path.
    pub retry_queue_path: PathBuf,
    /// Bills whose latest action is older than this are not posted.
    pub stale_after: chrono::Duration,
    /// Cap on the retry queue, if any.
    pub max_retry_queue: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let data_dir = PathBuf::from(DEFAULT_DATA_DIR);
        Self {
            watermark_path: data_dir.join(WATERMARK_FILE),
            retry_queue_path: data_dir.join(RETRY_QUEUE_FILE),
            stale_after: chrono::Duration::days(DEFAULT_STALE_DAYS),
            max_retry_queue: None,
        }
    }
}

impl From<&Config> for PipelineConfig {
    fn from(config: &Config) -> Self {
        Self {
            watermark_path: config.watermark_path(),
            retry_queue_path: config.retry_queue_path(),
            stale_after: config.stale_after,
            max_retry_queue: config.max_retry_queue,
        }
    }
}

/// Result of a single poll cycle.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Bills returned by the fetch.
    pub fetched: usize,
    /// Fetched bills not newer than the loaded watermark.
    pub already_seen: usize,
    /// Fetched bills skipped for being stale.
    pub stale: usize,
    /// Fetched bills posted on the first attempt.
    pub published: usize,
    /// Fetched bills whose first attempt failed.
    pub failed: usize,
    /// Queued bills attempted again.
    pub retried: usize,
    /// Queued bills posted on retry.
    pub recovered: usize,
    /// Bills left in the retry queue.
    pub pending: usize,
    /// Bills dropped because the retry queue was full.
    pub dropped: usize,
    /// Watermark in effect after the cycle.
    pub watermark: Option<Watermark>,
    /// State persistence errors.
    pub errors: Vec<String>,
}

/// Relay pipeline orchestrator.
pub struct Pipeline {
    config: PipelineConfig,
    source: Arc<dyn BillSource>,
    publisher: Arc<dyn Publisher>,
    watermark: WatermarkStore,
    retry_queue: RetryQueue,
}

impl Pipeline {
    /// Create a new pipeline.
    #[must_use]
    pub fn new(
        config: PipelineConfig,
        source: Arc<dyn BillSource>,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        let watermark = WatermarkStore::new(config.watermark_path.clone());
        let retry_queue = RetryQueue::new(config.retry_queue_path.clone());
        Self {
            config,
            source,
            publisher,
            watermark,
            retry_queue,
        }
    }

    /// Run a single poll cycle.
    pub async fn poll_cycle(&self) -> CycleReport {
        self.poll_cycle_at(Utc::now()).await
    }

    /// Run a single poll cycle, judging staleness against `now`.
    ///
    /// Every bill gets at most one publish attempt per cycle: bills that fail
    /// here for the first time are queued and retried from the next cycle on.
    pub async fn poll_cycle_at(&self, now: DateTime<Utc>) -> CycleReport {
        let mut report = CycleReport::default();

        tracing::info!("Starting poll cycle");

        let current = self.watermark.load();
        tracing::debug!(watermark = ?current.as_ref().map(Watermark::as_str), "Loaded watermark");

        let bills = self.source.fetch(current.as_ref()).await;
        report.fetched = bills.len();

        // congress.gov lists newest first
        let newest = bills
            .first()
            .map(|bill| bill.update_date_including_text.clone());

        let mut failed_this_round = Vec::new();
        match newest {
            None => {
                tracing::info!("No new bills");
                report.watermark = current;
            }
            Some(newest) => {
                for bill in bills {
                    if is_already_seen(&bill, current.as_ref()) {
                        tracing::info!(
                            bill = %bill.key(),
                            updated = %bill.update_date_including_text,
                            "Skipping bill at or before the watermark"
                        );
                        report.already_seen += 1;
                        continue;
                    }

                    if bill.is_stale(now, self.config.stale_after) {
                        tracing::info!(
                            bill = %bill.key(),
                            action_date = %bill.latest_action.action_date,
                            "Skipping stale bill"
                        );
                        report.stale += 1;
                        continue;
                    }

                    if self.publish(&bill).await {
                        report.published += 1;
                    } else {
                        report.failed += 1;
                        failed_this_round.push(bill);
                    }
                }

                report.watermark = self.advance_watermark(current, &newest, &mut report);
            }
        }

        let carried = self.retry_queue.load();
        if !carried.is_empty() {
            tracing::info!(count = carried.len(), "Retrying previously failed bills");
        }

        let mut still_failed = Vec::new();
        for bill in carried {
            report.retried += 1;
            if self.publish(&bill).await {
                report.recovered += 1;
            } else {
                still_failed.push(bill);
            }
        }
        still_failed.extend(failed_this_round);

        report.dropped = self.enforce_cap(&mut still_failed);
        report.pending = still_failed.len();

        if let Err(e) = self.retry_queue.save(&still_failed) {
            tracing::error!(error = %e, pending = still_failed.len(), "Failed to save retry queue");
            report.errors.push(format!("retry queue: {e}"));
        }

        tracing::info!(
            fetched = report.fetched,
            already_seen = report.already_seen,
            stale = report.stale,
            published = report.published,
            failed = report.failed,
            retried = report.retried,
            recovered = report.recovered,
            pending = report.pending,
            watermark = ?report.watermark.as_ref().map(Watermark::as_str),
            "Poll cycle complete"
        );

        report
    }

    /// Format and publish one bill.
    async fn publish(&self, bill: &Bill) -> bool {
        let post = format_post(bill);
        tracing::debug!(bill = %bill.key(), "Publishing bill");
        self.publisher.publish(&post).await
    }

    /// Persist the newest bill's timestamp as the watermark, unless it would
    /// move the watermark backwards or isn't a timestamp.
    fn advance_watermark(
        &self,
        current: Option<Watermark>,
        newest: &str,
        report: &mut CycleReport,
    ) -> Option<Watermark> {
        let Some(next) = Watermark::parse(newest) else {
            tracing::warn!(value = %newest, "Newest bill has no usable update timestamp, keeping watermark");
            return current;
        };

        if let Some(current) = current {
            if next < current {
                tracing::warn!(
                    current = %current,
                    newest = %next,
                    "Batch is older than the watermark, keeping watermark"
                );
                return Some(current);
            }
        }

        if let Err(e) = self.watermark.save(&next) {
            tracing::error!(error = %e, watermark = %next, "Failed to save watermark");
            report.errors.push(format!("watermark: {e}"));
        }

        Some(next)
    }

    /// Drop the oldest entries beyond the configured cap.
    fn enforce_cap(&self, queue: &mut Vec<Bill>) -> usize {
        let Some(cap) = self.config.max_retry_queue else {
            return 0;
        };
        if queue.len() <= cap {
            return 0;
        }

        let excess = queue.len() - cap;
        for bill in queue.drain(..excess) {
            tracing::error!(
                bill = %bill.key(),
                title = %bill.title,
                cap,
                "Retry queue full, dropping bill"
            );
        }
        excess
    }
}

/// Whether `bill` was last updated at or before `watermark`.
///
/// Bills with an unparseable update time are never treated as seen.
fn is_already_seen(bill: &Bill, watermark: Option<&Watermark>) -> bool {
    match (watermark, Watermark::parse(&bill.update_date_including_text)) {
        (Some(watermark), Some(updated)) => updated.at() <= watermark.at(),
        _ => false,
    }
}
