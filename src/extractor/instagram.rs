use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;
use url::Url;

use crate::capture::types::{Auxiliary, CapturedItem, RenderedBlock};
use crate::extractor::{ItemExtractor, PermalinkExtractor};

static ANCHOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());
static VIDEO: LazyLock<Selector> = LazyLock::new(|| Selector::parse("video[src]").unwrap());
static IMAGE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img[src]").unwrap());
static PROFILE_IMAGE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img[alt*='profile picture']").unwrap());

static LIKES_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d[\d,]*)\s+likes?\b").unwrap());
static COMMENTS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d[\d,]*)\s+comments?\b").unwrap());

/// Posts and reels, keyed by shortcode.
#[derive(Debug, Clone)]
pub struct InstagramExtractor {
    permalink: PermalinkExtractor,
}

impl InstagramExtractor {
    pub fn new() -> Self {
        Self::with_base(Url::parse("https://www.instagram.com/").unwrap())
    }

    pub fn with_base(base: Url) -> Self {
        Self {
            permalink: PermalinkExtractor::new(ANCHOR.clone(), ["/reel/", "/reels/", "/p/"], base),
        }
    }

    fn auxiliary(&self, fragment: &Html, text: &str) -> Auxiliary {
        let root = fragment.root_element();

        let profile_image_url = root
            .select(&PROFILE_IMAGE)
            .filter_map(|img| img.value().attr("src"))
            .find_map(|src| self.permalink.resolve_asset(src));

        let media_url = root
            .select(&VIDEO)
            .chain(
                root.select(&IMAGE)
                    .filter(|img| !img.value().attr("alt").unwrap_or_default().contains("profile picture")),
            )
            .filter_map(|el| el.value().attr("src"))
            .find_map(|src| self.permalink.resolve_asset(src));

        let mut auxiliary = Auxiliary {
            profile_image_url,
            media_url,
            ..Default::default()
        };
        for (name, regex) in [("likes", &*LIKES_REGEX), ("comments", &*COMMENTS_REGEX)] {
            if let Some(count) = regex
                .captures(text)
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().replace(',', "").parse().ok())
            {
                auxiliary.counters.insert(name.to_string(), count);
            }
        }
        auxiliary
    }
}

impl Default for InstagramExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ItemExtractor for InstagramExtractor {
    fn extract(&self, block: &RenderedBlock) -> Option<CapturedItem> {
        let fragment = Html::parse_fragment(&block.markup);
        let (identifier, url) = self.permalink.locate(fragment.root_element())?;

        let mut item = self
            .permalink
            .build_item(block, &fragment, identifier, url, Auxiliary::default());
        item.auxiliary = self.auxiliary(&fragment, &item.raw_text);
        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_reel_shortcode_and_video() {
        let block = RenderedBlock::new(
            r#"<article>
                 <img alt="chef.ana's profile picture" src="https://cdn.ig.test/ana.jpg">
                 <a href="/reel/C8xYz_1/?igsh=abc">watch</a>
                 <video src="https://cdn.ig.test/v/C8xYz_1.mp4"></video>
                 <span>2,310 likes</span><span>45 comments</span>
               </article>"#,
            "",
        );

        let item = InstagramExtractor::new().extract(&block).unwrap();
        assert_eq!(item.identifier, "C8xYz_1");
        assert_eq!(
            item.source_url.as_str(),
            "https://www.instagram.com/reel/C8xYz_1/"
        );
        assert_eq!(
            item.auxiliary.media_url.unwrap().as_str(),
            "https://cdn.ig.test/v/C8xYz_1.mp4"
        );
        assert_eq!(
            item.auxiliary.profile_image_url.unwrap().as_str(),
            "https://cdn.ig.test/ana.jpg"
        );
        assert_eq!(item.auxiliary.counters.get("likes"), Some(&2310));
        assert_eq!(item.auxiliary.counters.get("comments"), Some(&45));
    }

    #[test]
    fn test_post_image_used_when_no_video() {
        let block = RenderedBlock::new(
            r#"<article><a href="https://www.instagram.com/p/Bq9/">post</a><img src="/media/bq9.jpg"></article>"#,
            "",
        );
        let item = InstagramExtractor::new().extract(&block).unwrap();
        assert_eq!(item.identifier, "Bq9");
        assert_eq!(
            item.auxiliary.media_url.unwrap().as_str(),
            "https://www.instagram.com/media/bq9.jpg"
        );
        assert!(item.auxiliary.counters.is_empty());
    }

    #[test]
    fn test_reels_tab_link() {
        let block = RenderedBlock::new(r#"<div><a href="/reels/DAbc/">r</a></div>"#, "");
        let item = InstagramExtractor::new().extract(&block).unwrap();
        assert_eq!(item.identifier, "DAbc");
    }

    #[test]
    fn test_profile_link_only_is_skipped() {
        let block = RenderedBlock::new(r#"<article><a href="/chef.ana/">chef.ana</a></article>"#, "");
        assert!(InstagramExtractor::new().extract(&block).is_none());
    }
}
