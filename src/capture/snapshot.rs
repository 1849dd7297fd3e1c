use async_trait::async_trait;
use scraper::{Html, Selector};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, instrument};
use url::Url;

use crate::capture::{driver::ScrollDriver, errors::DriverError, types::RenderedBlock};

static CANONICAL_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("link[rel='canonical'], meta[property='og:url']").unwrap()
});

/// One saved rendering of the feed at a given scroll depth.
#[derive(Debug, Clone)]
pub struct Frame {
    pub url: Url,
    pub html: String,
}

/// Replays saved feed renderings as if scrolling a live page.
///
/// Each frame covers one viewport height; scroll position accumulates the
/// requested fractions and the visible frame is `floor(position)`, clamped to
/// the last frame so an exhausted feed keeps showing its tail.
pub struct SnapshotDriver {
    frames: Vec<Frame>,
    block_selector: Selector,
    position: f64,
}

impl SnapshotDriver {
    pub fn new(frames: Vec<Frame>, block_selector: Selector) -> Self {
        Self {
            frames,
            block_selector,
            position: 0.0,
        }
    }

    /// Load every `*.html` file in `dir`, ordered by file name.
    #[instrument(skip(block_selector), fields(dir = %dir.display()))]
    pub fn from_dir(dir: &Path, block_selector: Selector) -> Result<Self, DriverError> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "html"))
            .collect();
        paths.sort();

        let mut frames = Vec::with_capacity(paths.len());
        for path in paths {
            let html = std::fs::read_to_string(&path)?;
            let url = match canonical_url(&html) {
                Some(url) => url,
                None => file_url(&path)?,
            };
            frames.push(Frame { url, html });
        }

        debug!("Loaded {} snapshot frames", frames.len());
        Ok(Self::new(frames, block_selector))
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    fn current_frame(&self) -> Option<&Frame> {
        let last = self.frames.len().checked_sub(1)?;
        let index = (self.position.max(0.0).floor() as usize).min(last);
        self.frames.get(index)
    }
}

#[async_trait]
impl ScrollDriver for SnapshotDriver {
    async fn enumerate_visible_items(&mut self) -> Result<Vec<RenderedBlock>, DriverError> {
        let Some(frame) = self.current_frame() else {
            return Ok(Vec::new());
        };
        Ok(collect_blocks(&frame.html, &self.block_selector))
    }

    async fn advance(&mut self, fraction_of_viewport: f64) -> Result<(), DriverError> {
        if !fraction_of_viewport.is_finite() || fraction_of_viewport < 0.0 {
            return Err(DriverError::Script(format!(
                "invalid scroll fraction {fraction_of_viewport}"
            )));
        }
        self.position += fraction_of_viewport;
        Ok(())
    }

    async fn current_location(&self) -> Result<Url, DriverError> {
        self.current_frame()
            .map(|frame| frame.url.clone())
            .ok_or_else(|| DriverError::SessionLost("no frames loaded".to_string()))
    }
}

fn collect_blocks(html: &str, selector: &Selector) -> Vec<RenderedBlock> {
    let document = Html::parse_document(html);
    document
        .select(selector)
        .map(|element| RenderedBlock {
            markup: element.html(),
            text: element.text().collect::<Vec<_>>().join(" "),
        })
        .collect()
}

fn canonical_url(html: &str) -> Option<Url> {
    let document = Html::parse_document(html);
    let element = document.select(&CANONICAL_SELECTOR).next()?;
    let href = element
        .value()
        .attr("href")
        .or_else(|| element.value().attr("content"))?;
    Url::parse(href).ok()
}

fn file_url(path: &Path) -> Result<Url, DriverError> {
    let absolute = std::fs::canonicalize(path)?;
    Url::from_file_path(&absolute)
        .map_err(|_| DriverError::Script(format!("not a file path: {}", absolute.display())))
}
