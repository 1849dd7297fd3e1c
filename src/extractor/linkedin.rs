use scraper::{Html, Selector};
use std::sync::LazyLock;
use url::Url;

use crate::capture::types::{Auxiliary, CapturedItem, RenderedBlock};
use crate::extractor::{ItemExtractor, PermalinkExtractor, parse_count, parse_identifier};

const ACTIVITY_SEGMENT: &str = "urn:li:activity:";

static URN_HOLDER: LazyLock<Selector> = LazyLock::new(|| Selector::parse("[data-urn]").unwrap());
static ACTIVITY_ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href*='urn:li:activity:']").unwrap());
static AVATAR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img.update-components-actor__avatar-image").unwrap());
static REACTIONS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".social-details-social-counts__reactions-count").unwrap());

/// Feed updates, keyed by activity id.
#[derive(Debug, Clone)]
pub struct LinkedInExtractor {
    permalink: PermalinkExtractor,
}

impl LinkedInExtractor {
    pub fn new() -> Self {
        Self::with_base(Url::parse("https://www.linkedin.com/").unwrap())
    }

    pub fn with_base(base: Url) -> Self {
        Self {
            permalink: PermalinkExtractor::new(ACTIVITY_ANCHOR.clone(), [ACTIVITY_SEGMENT], base),
        }
    }

    /// Update containers carry the urn directly; the anchor is a fallback.
    fn locate(&self, fragment: &Html) -> Option<(String, Url)> {
        let root = fragment.root_element();
        let from_urn = root
            .select(&URN_HOLDER)
            .filter_map(|el| el.value().attr("data-urn"))
            .find_map(|urn| parse_identifier(urn, ACTIVITY_SEGMENT));

        match from_urn {
            Some(identifier) => {
                let href = format!("/feed/update/{ACTIVITY_SEGMENT}{identifier}/");
                let url = self.permalink.base().join(&href).ok()?;
                Some((identifier, url))
            }
            None => self.permalink.locate(root),
        }
    }

    fn auxiliary(&self, fragment: &Html) -> Auxiliary {
        let root = fragment.root_element();
        let mut auxiliary = Auxiliary {
            profile_image_url: root
                .select(&AVATAR)
                .filter_map(|img| img.value().attr("src"))
                .find_map(|src| self.permalink.resolve_asset(src)),
            ..Default::default()
        };

        if let Some(count) = root
            .select(&REACTIONS)
            .next()
            .and_then(|el| parse_count(&el.text().collect::<String>()))
        {
            auxiliary.counters.insert("reactions".to_string(), count);
        }
        auxiliary
    }
}

impl Default for LinkedInExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ItemExtractor for LinkedInExtractor {
    fn extract(&self, block: &RenderedBlock) -> Option<CapturedItem> {
        let fragment = Html::parse_fragment(&block.markup);
        let (identifier, url) = self.locate(&fragment)?;
        let auxiliary = self.auxiliary(&fragment);
        Some(
            self.permalink
                .build_item(block, &fragment, identifier, url, auxiliary),
        )
    }
}
