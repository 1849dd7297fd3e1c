use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use url::Url;
use uuid::Uuid;

/// One content block as currently materialized in the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedBlock {
    pub markup: String,
    pub text: String,
}

impl RenderedBlock {
    pub fn new(markup: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            markup: markup.into(),
            text: text.into(),
        }
    }
}

/// Platform-specific extras attached opportunistically by extractors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Auxiliary {
    pub profile_image_url: Option<Url>,
    pub media_url: Option<Url>,
    pub counters: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedItem {
    pub identifier: String,
    pub raw_markup: String,
    pub raw_text: String,
    pub source_url: Url,
    pub auxiliary: Auxiliary,
    pub captured_at: DateTime<Utc>,
    /// Set by the media download pass, never by the capture loop.
    pub media_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    BudgetReached,
    Stalled,
    DriverFault(String),
}

/// Result of one capture run. Partial results are valid output.
#[derive(Debug, Clone)]
pub struct CaptureReport {
    pub run_id: Uuid,
    pub items: Vec<CapturedItem>,
    pub stop_reason: StopReason,
    pub passes: u32,
    pub forced_jumps: u32,
    pub resume_url: Option<Url>,
}

impl CaptureReport {
    pub fn identifiers(&self) -> Vec<&str> {
        self.items.iter().map(|i| i.identifier.as_str()).collect()
    }

    pub fn is_partial(&self) -> bool {
        matches!(self.stop_reason, StopReason::DriverFault(_))
    }

    pub fn into_items(self) -> Vec<CapturedItem> {
        self.items
    }
}
