use std::{sync::Arc, time::Duration};
use tokio::{sync::Semaphore, time::sleep};
use tracing::{Instrument, debug, error, info, info_span, instrument, warn};

use crate::capture::types::CapturedItem;
use crate::pipeline::{ItemHandler, WorkContext, calculate_backoff_delay};
use crate::ratelimit::ApiGate;

/// Worker pool configuration
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub concurrency: usize,
    pub max_attempts: u32,
    pub base_backoff: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            max_attempts: 3,
            base_backoff: Duration::from_millis(500),
        }
    }
}

/// Result for one item. Outcomes come back in the same order as the input.
#[derive(Debug)]
pub struct ItemOutcome<T> {
    pub identifier: String,
    pub attempts: u32,
    pub result: Result<T, String>,
}

impl<T> ItemOutcome<T> {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Fixed-size pool that runs a handler over an already captured sequence.
pub struct WorkerPool {
    config: PoolConfig,
    gate: Option<Arc<ApiGate>>,
}

impl WorkerPool {
    pub fn new(config: PoolConfig) -> Self {
        Self { config, gate: None }
    }

    pub fn with_gate(mut self, gate: Arc<ApiGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    #[instrument(skip_all, fields(handler = handler.name(), items = items.len()))]
    pub async fn process<H: ItemHandler>(
        &self,
        items: Arc<[CapturedItem]>,
        handler: Arc<H>,
    ) -> Vec<ItemOutcome<H::Output>> {
        info!(
            "Processing {} items with concurrency {}",
            items.len(),
            self.config.concurrency
        );

        // Semaphore to limit concurrent item processing
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut handles = Vec::with_capacity(items.len());

        for index in 0..items.len() {
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                error!("Worker semaphore closed, stopping dispatch");
                break;
            };
            let items = items.clone();
            let handler = handler.clone();
            let gate = self.gate.clone();
            let config = self.config.clone();
            let identifier = items[index].identifier.clone();

            handles.push(tokio::spawn(
                async move {
                    let _permit = permit; // Hold permit until the item completes
                    Self::run_item(&items[index], handler.as_ref(), gate.as_deref(), &config)
                        .await
                }
                .instrument(info_span!("item", identifier = %identifier)),
            ));
        }

        let mut outcomes = Vec::with_capacity(items.len());
        for (index, handle) in handles.into_iter().enumerate() {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("Worker task for {} failed: {}", items[index].identifier, e);
                    ItemOutcome {
                        identifier: items[index].identifier.clone(),
                        attempts: 0,
                        result: Err(format!("worker task failed: {e}")),
                    }
                }
            };
            outcomes.push(outcome);
        }

        let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
        info!(
            "Processed {} items, {} failed",
            outcomes.len(),
            failed
        );
        outcomes
    }

    async fn run_item<H: ItemHandler>(
        item: &CapturedItem,
        handler: &H,
        gate: Option<&ApiGate>,
        config: &PoolConfig,
    ) -> ItemOutcome<H::Output> {
        let mut attempt = 0;

        loop {
            attempt += 1;

            let api_key = match gate {
                Some(gate) => match gate.acquire().await {
                    Ok(key) => Some(key),
                    Err(e) => {
                        error!("No api key available for {}: {}", item.identifier, e);
                        return ItemOutcome {
                            identifier: item.identifier.clone(),
                            attempts: attempt - 1,
                            result: Err(e.to_string()),
                        };
                    }
                },
                None => None,
            };

            let ctx = WorkContext {
                attempt,
                api_key: api_key.clone(),
            };

            match handler.handle(item, &ctx).await {
                Ok(output) => {
                    if let (Some(gate), Some(key)) = (gate, &api_key) {
                        gate.record_success(key);
                    }
                    debug!("Item {} handled on attempt {}", item.identifier, attempt);
                    return ItemOutcome {
                        identifier: item.identifier.clone(),
                        attempts: attempt,
                        result: Ok(output),
                    };
                }
                Err(e) => {
                    if let (Some(gate), Some(key)) = (gate, &api_key) {
                        gate.record_failure(key);
                    }

                    if attempt >= config.max_attempts || !handler.is_retryable(&e) {
                        error!(
                            "Item {} permanently failed after {} attempts: {:#}",
                            item.identifier, attempt, e
                        );
                        return ItemOutcome {
                            identifier: item.identifier.clone(),
                            attempts: attempt,
                            result: Err(format!("{e:#}")),
                        };
                    }

                    let delay = calculate_backoff_delay(attempt - 1, config.base_backoff);
                    warn!(
                        "Item {} failed (attempt {}/{}), retrying in {:?}: {:#}",
                        item.identifier, attempt, config.max_attempts, delay, e
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use url::Url;

    fn item(id: &str) -> CapturedItem {
        CapturedItem {
            identifier: id.to_string(),
            raw_markup: String::new(),
            raw_text: format!("text {id}"),
            source_url: Url::parse("https://feed.test/").unwrap(),
            auxiliary: Default::default(),
            captured_at: Utc::now(),
            media_path: None,
        }
    }

    struct FlakyHandler {
        calls: AtomicU32,
        fail_first: u32,
    }

    #[async_trait]
    impl ItemHandler for FlakyHandler {
        type Output = u32;

        async fn handle(&self, _item: &CapturedItem, ctx: &WorkContext) -> anyhow::Result<u32> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.fail_first {
                anyhow::bail!("transient failure {call}");
            }
            Ok(ctx.attempt)
        }

        fn name(&self) -> &'static str {
            "flaky"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_success() {
        let pool = WorkerPool::new(PoolConfig {
            concurrency: 1,
            ..Default::default()
        });
        let handler = Arc::new(FlakyHandler {
            calls: AtomicU32::new(0),
            fail_first: 2,
        });

        let outcomes = pool.process(Arc::from(vec![item("a")]), handler).await;

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].attempts, 3);
        assert_eq!(outcomes[0].result.as_ref().ok(), Some(&3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let pool = WorkerPool::new(PoolConfig {
            concurrency: 1,
            max_attempts: 2,
            ..Default::default()
        });
        let handler = Arc::new(FlakyHandler {
            calls: AtomicU32::new(0),
            fail_first: u32::MAX,
        });

        let outcomes = pool.process(Arc::from(vec![item("a")]), handler.clone()).await;

        assert_eq!(outcomes[0].attempts, 2);
        assert!(outcomes[0].result.as_ref().unwrap_err().contains("transient failure 2"));
        assert_eq!(handler.calls.load(Ordering::SeqCst), 2);
    }
}
