use anyhow::{Context, Result};
use feedcapture::{
    capture::{CaptureLoop, SnapshotDriver},
    config::Config,
    media::MediaDownloader,
    pipeline::{MediaDownloadHandler, WorkerPool},
    ratelimit::{ApiGate, ApiKeyPool, RateLimiter},
    sink::append_json_array,
};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let subscriber =
        tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env());
    if std::env::var("LOG_FORMAT").is_ok_and(|f| f == "json") {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    // Load configuration
    let config = Config::from_env()?;
    let platform = config.platform();
    info!(
        "Replaying {} feed from {}",
        platform,
        config.snapshot_dir().display()
    );

    let mut driver = SnapshotDriver::from_dir(config.snapshot_dir(), platform.block_selector())
        .with_context(|| format!("loading snapshots from {}", config.snapshot_dir().display()))?;

    let extractor = platform.extractor(config.base_url().cloned());
    let engine = CaptureLoop::new(extractor, config.capture_settings());
    let report = engine.capture(&mut driver).await;

    if report.is_partial() {
        warn!(
            "Capture ended early ({:?}), keeping {} items",
            report.stop_reason,
            report.items.len()
        );
    }
    if let Some(url) = &report.resume_url {
        info!("Resume from {}", url);
    }

    let mut items = report.into_items();

    if let Some(media_dir) = config.media_dir() {
        let handler = Arc::new(MediaDownloadHandler::new(MediaDownloader::new(media_dir)?));
        let mut pool = WorkerPool::new(config.pool_config());
        let gate = if config.api_keys().is_empty() {
            None
        } else {
            let gate = Arc::new(ApiGate::new(
                ApiKeyPool::new(config.api_keys().iter().cloned()),
                RateLimiter::per_minute(config.api_calls_per_minute()),
            ));
            pool = pool.with_gate(gate.clone());
            Some(gate)
        };

        let outcomes = pool.process(Arc::from(items.clone()), handler).await;
        for (item, outcome) in items.iter_mut().zip(outcomes) {
            if let Ok(Some(path)) = outcome.result {
                item.media_path = Some(path);
            }
        }

        if let Some(gate) = gate {
            for (key, stats) in gate.tracker().snapshot() {
                info!(
                    "key {}: {} ok, {} failed, {} throttled",
                    mask_key(&key),
                    stats.succeeded,
                    stats.failed,
                    stats.throttled
                );
            }
        }
    }

    let appended = append_json_array(config.output_path(), &items).await?;
    info!(
        "Captured {} items, {} new in {}",
        items.len(),
        appended,
        config.output_path().display()
    );

    Ok(())
}

fn mask_key(key: &str) -> String {
    let tail: String = key.chars().skip(key.chars().count().saturating_sub(4)).collect();
    format!("...{tail}")
}
