use async_trait::async_trait;
use std::path::PathBuf;
use tracing::info;

use crate::capture::types::CapturedItem;
use crate::media::{MediaDownloader, MediaError};
use crate::pipeline::{ItemHandler, WorkContext};

/// Attaches local media files to captured items.
#[derive(Clone)]
pub struct MediaDownloadHandler {
    downloader: MediaDownloader,
}

impl MediaDownloadHandler {
    pub fn new(downloader: MediaDownloader) -> Self {
        Self { downloader }
    }
}

#[async_trait]
impl ItemHandler for MediaDownloadHandler {
    type Output = Option<PathBuf>;

    async fn handle(
        &self,
        item: &CapturedItem,
        _ctx: &WorkContext,
    ) -> anyhow::Result<Option<PathBuf>> {
        let path = self.downloader.download(item).await?;
        if let Some(path) = &path {
            info!("Downloaded media for {} to {}", item.identifier, path.display());
        }
        Ok(path)
    }

    fn name(&self) -> &'static str {
        "media_download"
    }

    fn is_retryable(&self, err: &anyhow::Error) -> bool {
        err.downcast_ref::<MediaError>()
            .is_none_or(MediaError::should_retry)
    }
}
