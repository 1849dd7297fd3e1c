use chrono::Utc;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::capture::types::{Auxiliary, CapturedItem, RenderedBlock};
use crate::extractor::{ItemExtractor, normalize_whitespace, parse_identifier};

/// Finds the first anchor whose href contains one of `segments` and derives
/// the identifier from it. Platform extractors wrap this and add extras.
#[derive(Debug, Clone)]
pub struct PermalinkExtractor {
    anchor: Selector,
    segments: Vec<String>,
    base: Url,
}

impl PermalinkExtractor {
    pub fn new<I, S>(anchor: Selector, segments: I, base: Url) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            anchor,
            segments: segments.into_iter().map(Into::into).collect(),
            base,
        }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Resolve `href` against the base and parse an identifier out of it.
    /// The returned permalink has its query and fragment stripped.
    pub fn resolve(&self, href: &str) -> Option<(String, Url)> {
        let mut url = self.base.join(href.trim()).ok()?;
        let identifier = self
            .segments
            .iter()
            .find_map(|segment| parse_identifier(url.path(), segment))?;
        url.set_query(None);
        url.set_fragment(None);
        Some((identifier, url))
    }

    pub fn locate(&self, root: ElementRef<'_>) -> Option<(String, Url)> {
        root.select(&self.anchor)
            .filter_map(|a| a.value().attr("href"))
            .find_map(|href| self.resolve(href))
    }

    /// Resolve a possibly relative media/image reference.
    pub fn resolve_asset(&self, src: &str) -> Option<Url> {
        let src = src.trim();
        if src.is_empty() || src.starts_with("data:") {
            return None;
        }
        self.base.join(src).ok()
    }

    pub fn build_item(
        &self,
        block: &RenderedBlock,
        fragment: &Html,
        identifier: String,
        source_url: Url,
        auxiliary: Auxiliary,
    ) -> CapturedItem {
        let text = if block.text.trim().is_empty() {
            fragment.root_element().text().collect::<Vec<_>>().join(" ")
        } else {
            block.text.clone()
        };

        CapturedItem {
            identifier,
            raw_markup: block.markup.clone(),
            raw_text: normalize_whitespace(&text),
            source_url,
            auxiliary,
            captured_at: Utc::now(),
            media_path: None,
        }
    }
}

impl ItemExtractor for PermalinkExtractor {
    fn extract(&self, block: &RenderedBlock) -> Option<CapturedItem> {
        let fragment = Html::parse_fragment(&block.markup);
        let (identifier, url) = self.locate(fragment.root_element())?;
        Some(self.build_item(block, &fragment, identifier, url, Auxiliary::default()))
    }
}
