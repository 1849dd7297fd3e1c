use async_trait::async_trait;
use url::Url;

use crate::capture::{errors::DriverError, types::RenderedBlock};

/// Page capability consumed by the capture loop.
///
/// Implemented by whatever owns the browser session. A session is not
/// reentrant, so the loop holds the driver by `&mut` for the whole run.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScrollDriver: Send {
    /// Content blocks currently rendered, in DOM order.
    async fn enumerate_visible_items(&mut self) -> Result<Vec<RenderedBlock>, DriverError>;

    /// Scroll forward by `fraction_of_viewport` viewport heights.
    async fn advance(&mut self, fraction_of_viewport: f64) -> Result<(), DriverError>;

    async fn current_location(&self) -> Result<Url, DriverError>;
}
