use async_trait::async_trait;

use crate::capture::types::CapturedItem;

/// Per-attempt information handed to a handler.
#[derive(Debug, Clone, Default)]
pub struct WorkContext {
    /// Starts at 1.
    pub attempt: u32,
    /// Key granted by the pool's gate, when one is configured.
    pub api_key: Option<String>,
}

/// Work applied to each captured item after the capture run has finished.
#[async_trait]
pub trait ItemHandler: Send + Sync + 'static {
    type Output: Send + 'static;

    async fn handle(&self, item: &CapturedItem, ctx: &WorkContext) -> anyhow::Result<Self::Output>;

    fn name(&self) -> &'static str;

    /// Whether a failed attempt is worth repeating.
    fn is_retryable(&self, _err: &anyhow::Error) -> bool {
        true
    }
}
