#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use url::Url;

use feedcapture::capture::{DriverError, RenderedBlock, ScrollDriver};

/// Markup for one timeline entry with the given status id.
pub fn tweet(id: &str) -> RenderedBlock {
    RenderedBlock::new(
        format!(
            r#"<article data-testid="tweet"><a href="/someone/status/{id}"><time>now</time></a><div data-testid="tweetText">post {id}</div></article>"#
        ),
        format!("post {id}"),
    )
}

/// Entry still rendering: no permalink yet.
pub fn skeleton() -> RenderedBlock {
    RenderedBlock::new(r#"<article data-testid="tweet"><div class="placeholder"></div></article>"#, "")
}

pub fn tweets(ids: &[&str]) -> Vec<RenderedBlock> {
    ids.iter().map(|id| tweet(id)).collect()
}

/// Test double that plays back one scripted batch per enumerate call.
///
/// Once the script runs out every enumerate returns nothing. A hidden script
/// can be attached that replaces the visible one as soon as an advance of at
/// least `threshold` viewports is issued.
pub struct ScriptedDriver {
    script: VecDeque<Vec<RenderedBlock>>,
    hidden: Option<(f64, VecDeque<Vec<RenderedBlock>>)>,
    fail_on_advance: Option<usize>,
    pub advances: Vec<f64>,
    pub enumerations: usize,
    location: Url,
}

impl ScriptedDriver {
    pub fn new(passes: Vec<Vec<RenderedBlock>>) -> Self {
        Self {
            script: passes.into(),
            hidden: None,
            fail_on_advance: None,
            advances: Vec::new(),
            enumerations: 0,
            location: Url::parse("https://x.com/home").unwrap(),
        }
    }

    pub fn unlocked_by_jump(mut self, threshold: f64, passes: Vec<Vec<RenderedBlock>>) -> Self {
        self.hidden = Some((threshold, passes.into()));
        self
    }

    /// Fail the `n`th advance (1-based) as if the browser session died.
    pub fn failing_on_advance(mut self, n: usize) -> Self {
        self.fail_on_advance = Some(n);
        self
    }
}

#[async_trait]
impl ScrollDriver for ScriptedDriver {
    async fn enumerate_visible_items(&mut self) -> Result<Vec<RenderedBlock>, DriverError> {
        self.enumerations += 1;
        Ok(self.script.pop_front().unwrap_or_default())
    }

    async fn advance(&mut self, fraction_of_viewport: f64) -> Result<(), DriverError> {
        self.advances.push(fraction_of_viewport);
        if self.fail_on_advance == Some(self.advances.len()) {
            return Err(DriverError::SessionLost("chrome not reachable".to_string()));
        }

        let unlocked =
            matches!(&self.hidden, Some((threshold, _)) if fraction_of_viewport >= *threshold);
        if unlocked && let Some((_, passes)) = self.hidden.take() {
            self.script = passes;
        }
        Ok(())
    }

    async fn current_location(&self) -> Result<Url, DriverError> {
        Ok(self.location.clone())
    }
}
