//! Multi-cycle tests for the relay pipeline.
//!
//! Each test drives several poll cycles against scripted in-memory
//! collaborators and checks the state left on disk between cycles.

use async_trait::async_trait;
use billcast::congress::{Bill, BillSource, LatestAction};
use billcast::pipeline::{Pipeline, PipelineConfig};
use billcast::store::{RetryQueue, Watermark, WatermarkStore, RETRY_QUEUE_FILE, WATERMARK_FILE};
use billcast::twitter::{Post, Publisher};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};

// =============================================================================
// Scripted collaborators
// =============================================================================

/// Returns one scripted batch per fetch, then empty batches.
#[derive(Default)]
struct ScriptedSource {
    batches: Mutex<VecDeque<Vec<Bill>>>,
    seen: Mutex<Vec<Option<String>>>,
}

impl ScriptedSource {
    fn new(batches: Vec<Vec<Bill>>) -> Self {
        Self {
            batches: Mutex::new(batches.into()),
            seen: Mutex::default(),
        }
    }

    fn watermarks_seen(&self) -> Vec<Option<String>> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl BillSource for ScriptedSource {
    async fn fetch(&self, after: Option<&Watermark>) -> Vec<Bill> {
        self.seen
            .lock()
            .unwrap()
            .push(after.map(|w| w.as_str().to_string()));
        self.batches.lock().unwrap().pop_front().unwrap_or_default()
    }
}

/// Rejects each post a configured number of times before accepting it.
#[derive(Default)]
struct FlakyPublisher {
    failures_left: Mutex<HashMap<String, usize>>,
    attempts: Mutex<Vec<String>>,
}

impl FlakyPublisher {
    fn failing(text: &str, times: usize) -> Self {
        let publisher = Self::default();
        publisher
            .failures_left
            .lock()
            .unwrap()
            .insert(text.to_string(), times);
        publisher
    }

    fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Publisher for FlakyPublisher {
    async fn publish(&self, post: &Post) -> bool {
        self.attempts.lock().unwrap().push(post.text.clone());
        let mut failures = self.failures_left.lock().unwrap();
        match failures.get_mut(&post.text) {
            Some(left) if *left > 0 => {
                *left -= 1;
                false
            }
            _ => true,
        }
    }
}

fn bill(number: u32, updated: &str) -> Bill {
    Bill {
        congress: 118,
        origin_chamber: "Senate".to_string(),
        number: number.to_string(),
        title: format!("Act {number}"),
        latest_action: LatestAction {
            text: "Received in the Senate.".to_string(),
            action_date: Utc::now().date_naive(),
        },
        update_date_including_text: updated.to_string(),
    }
}

fn config_in(dir: &Path) -> PipelineConfig {
    PipelineConfig {
        watermark_path: dir.join(WATERMARK_FILE),
        retry_queue_path: dir.join(RETRY_QUEUE_FILE),
        ..PipelineConfig::default()
    }
}

fn text_of(bill: &Bill) -> String {
    billcast::format::format(bill)
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_failed_bill_converges_after_k_failures() {
    const FAILURES: usize = 3;

    let dir = tempfile::tempdir().unwrap();
    let target = bill(1, "2024-03-01T12:00:00Z");
    let source = Arc::new(ScriptedSource::new(vec![vec![target.clone()]]));
    let publisher = Arc::new(FlakyPublisher::failing(&text_of(&target), FAILURES));
    let pipeline = Pipeline::new(config_in(dir.path()), source, publisher.clone());
    let queue = RetryQueue::new(dir.path().join(RETRY_QUEUE_FILE));

    // One attempt per cycle: the first in the fetch pass, the rest as retries
    for cycle in 1..=FAILURES {
        let report = pipeline.poll_cycle().await;
        assert_eq!(report.pending, 1, "cycle {cycle}");
        assert_eq!(queue.load(), vec![target.clone()], "cycle {cycle}");
        assert_eq!(publisher.attempts().len(), cycle);
    }

    let report = pipeline.poll_cycle().await;
    assert_eq!(report.recovered, 1);
    assert_eq!(report.pending, 0);
    assert!(queue.load().is_empty());
    assert_eq!(publisher.attempts().len(), FAILURES + 1);

    // Nothing left to do
    pipeline.poll_cycle().await;
    assert_eq!(publisher.attempts().len(), FAILURES + 1);
}

#[tokio::test]
async fn test_watermark_is_forwarded_and_monotonic() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(ScriptedSource::new(vec![
        vec![bill(2, "2024-03-02T00:00:00Z"), bill(1, "2024-03-01T00:00:00Z")],
        // Upstream replays an older page
        vec![bill(1, "2024-03-01T00:00:00Z")],
        vec![bill(3, "2024-03-03T08:30:00-05:00")],
    ]));
    let publisher = Arc::new(FlakyPublisher::default());
    let pipeline = Pipeline::new(config_in(dir.path()), source.clone(), publisher);
    let store = WatermarkStore::new(dir.path().join(WATERMARK_FILE));

    let mut previous: Option<DateTime<Utc>> = None;
    for _ in 0..4 {
        pipeline.poll_cycle().await;
        let current = store.load().unwrap().at();
        if let Some(previous) = previous {
            assert!(current >= previous, "{current} < {previous}");
        }
        previous = Some(current);
    }

    assert_eq!(store.load().unwrap().as_str(), "2024-03-03T08:30:00-05:00");
    assert_eq!(
        source.watermarks_seen(),
        vec![
            None,
            Some("2024-03-02T00:00:00Z".to_string()),
            Some("2024-03-02T00:00:00Z".to_string()),
            Some("2024-03-03T08:30:00-05:00".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_restart_resumes_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let failing = bill(5, "2024-03-05T00:00:00Z");

    {
        let source = Arc::new(ScriptedSource::new(vec![vec![failing.clone()]]));
        let publisher = Arc::new(FlakyPublisher::failing(&text_of(&failing), 1));
        let pipeline = Pipeline::new(config_in(dir.path()), source, publisher);
        pipeline.poll_cycle().await;
    }

    // A fresh process sees the stored watermark and the queued bill
    let source = Arc::new(ScriptedSource::new(Vec::new()));
    let publisher = Arc::new(FlakyPublisher::default());
    let pipeline = Pipeline::new(config_in(dir.path()), source.clone(), publisher.clone());
    let report = pipeline.poll_cycle().await;

    assert_eq!(
        source.watermarks_seen(),
        vec![Some("2024-03-05T00:00:00Z".to_string())]
    );
    assert_eq!(report.recovered, 1);
    assert_eq!(publisher.attempts(), vec![text_of(&failing)]);
}

#[tokio::test]
async fn test_new_failures_queue_behind_carried_ones() {
    let dir = tempfile::tempdir().unwrap();
    let first = bill(1, "2024-03-01T00:00:00Z");
    let second = bill(2, "2024-03-02T00:00:00Z");

    let source = Arc::new(ScriptedSource::new(vec![
        vec![first.clone()],
        vec![second.clone()],
    ]));
    let publisher = Arc::new(FlakyPublisher::default());
    publisher
        .failures_left
        .lock()
        .unwrap()
        .extend([(text_of(&first), 5), (text_of(&second), 5)]);
    let pipeline = Pipeline::new(config_in(dir.path()), source, publisher);

    pipeline.poll_cycle().await;
    pipeline.poll_cycle().await;

    let queue = RetryQueue::new(dir.path().join(RETRY_QUEUE_FILE)).load();
    assert_eq!(queue, vec![first, second]);
}

#[tokio::test]
async fn test_bill_replayed_at_watermark_is_published_once() {
    let dir = tempfile::tempdir().unwrap();
    let newest = bill(9, "2024-01-01T00:00:00Z");
    // Upstream includes the bill matching `fromDateTime` on every later page
    let source = Arc::new(ScriptedSource::new(vec![vec![newest.clone()]; 4]));
    let publisher = Arc::new(FlakyPublisher::default());
    let pipeline = Pipeline::new(config_in(dir.path()), source, publisher.clone());

    for _ in 0..4 {
        pipeline.poll_cycle().await;
    }

    assert_eq!(publisher.attempts(), vec![text_of(&newest)]);
    assert!(RetryQueue::new(dir.path().join(RETRY_QUEUE_FILE))
        .load()
        .is_empty());
}
