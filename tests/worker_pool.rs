use async_trait::async_trait;
use chrono::Utc;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;
use url::Url;

use feedcapture::capture::CapturedItem;
use feedcapture::pipeline::{ItemHandler, PoolConfig, WorkContext, WorkerPool};
use feedcapture::ratelimit::{ApiGate, ApiKeyPool, RateLimiter};

fn items(n: usize) -> Arc<[CapturedItem]> {
    (0..n)
        .map(|i| CapturedItem {
            identifier: format!("{i}"),
            raw_markup: String::new(),
            raw_text: format!("post number {i}"),
            source_url: Url::parse(&format!("https://x.com/u/status/{i}")).unwrap(),
            auxiliary: Default::default(),
            captured_at: Utc::now(),
            media_path: None,
        })
        .collect()
}

/// Simulates a reply generator: slow, keyed, order-insensitive.
#[derive(Default)]
struct DraftReplyHandler {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    keys_used: Mutex<Vec<String>>,
}

#[async_trait]
impl ItemHandler for DraftReplyHandler {
    type Output = String;

    async fn handle(&self, item: &CapturedItem, ctx: &WorkContext) -> anyhow::Result<String> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        // Later items finish first
        let delay = 100 - item.identifier.parse::<u64>()? * 10;
        tokio::time::sleep(Duration::from_millis(delay)).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if let Some(key) = &ctx.api_key {
            self.keys_used.lock().unwrap().push(key.clone());
        }
        Ok(format!("reply to {}", item.identifier))
    }

    fn name(&self) -> &'static str {
        "draft_reply"
    }
}

#[tokio::test(start_paused = true)]
async fn test_outcomes_keep_input_order_under_concurrency() {
    let handler = Arc::new(DraftReplyHandler::default());
    let pool = WorkerPool::new(PoolConfig {
        concurrency: 3,
        ..Default::default()
    });

    let outcomes = pool.process(items(6), handler.clone()).await;

    let ids: Vec<_> = outcomes.iter().map(|o| o.identifier.as_str()).collect();
    assert_eq!(ids, vec!["0", "1", "2", "3", "4", "5"]);
    assert_eq!(outcomes[4].result.as_deref(), Ok("reply to 4"));
    assert!(handler.peak.load(Ordering::SeqCst) <= 3);
    assert!(handler.peak.load(Ordering::SeqCst) >= 2);
}

#[tokio::test(start_paused = true)]
async fn test_gate_hands_out_keys_and_tracks_calls() {
    let gate = Arc::new(ApiGate::new(
        ApiKeyPool::new(["key-a", "key-b"]),
        RateLimiter::per_minute(3),
    ));
    let handler = Arc::new(DraftReplyHandler::default());
    let pool = WorkerPool::new(PoolConfig {
        concurrency: 2,
        ..Default::default()
    })
    .with_gate(gate.clone());

    let outcomes = pool.process(items(6), handler.clone()).await;

    assert!(outcomes.iter().all(|o| o.is_ok()));

    let keys = handler.keys_used.lock().unwrap().clone();
    assert_eq!(keys.len(), 6);
    assert_eq!(keys.iter().filter(|k| *k == "key-a").count(), 3);
    assert_eq!(keys.iter().filter(|k| *k == "key-b").count(), 3);

    let stats = gate.tracker().snapshot();
    assert_eq!(stats["key-a"].succeeded, 3);
    assert_eq!(stats["key-b"].succeeded, 3);
    assert_eq!(stats["key-a"].throttled, 0);
}

#[tokio::test(start_paused = true)]
async fn test_gate_without_keys_fails_every_item() {
    let gate = Arc::new(ApiGate::new(
        ApiKeyPool::new(Vec::<String>::new()),
        RateLimiter::per_minute(10),
    ));
    let pool = WorkerPool::new(PoolConfig::default()).with_gate(gate);

    let outcomes = pool
        .process(items(2), Arc::new(DraftReplyHandler::default()))
        .await;

    assert!(outcomes.iter().all(|o| o.attempts == 0));
    assert!(
        outcomes
            .iter()
            .all(|o| o.result.as_ref().unwrap_err() == "no api keys configured")
    );
}
