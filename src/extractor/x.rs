use scraper::{Html, Selector};
use std::sync::LazyLock;
use url::Url;

use crate::capture::types::{Auxiliary, CapturedItem, RenderedBlock};
use crate::extractor::{ItemExtractor, PermalinkExtractor, parse_count};

static STATUS_ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href*='/status/']").unwrap());
static TIME: LazyLock<Selector> = LazyLock::new(|| Selector::parse("time").unwrap());
static PROFILE_IMAGE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img[src*='profile_images']").unwrap());
static COUNTERS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("[data-testid='reply'], [data-testid='retweet'], [data-testid='like']")
        .unwrap()
});

/// Tweets on an X timeline, keyed by status id.
#[derive(Debug, Clone)]
pub struct XStatusExtractor {
    permalink: PermalinkExtractor,
}

impl XStatusExtractor {
    pub fn new() -> Self {
        Self::with_base(Url::parse("https://x.com/").unwrap())
    }

    pub fn with_base(base: Url) -> Self {
        Self {
            permalink: PermalinkExtractor::new(STATUS_ANCHOR.clone(), ["/status/"], base),
        }
    }

    fn auxiliary(&self, fragment: &Html) -> Auxiliary {
        let root = fragment.root_element();
        let mut auxiliary = Auxiliary {
            profile_image_url: root
                .select(&PROFILE_IMAGE)
                .filter_map(|img| img.value().attr("src"))
                .find_map(|src| self.permalink.resolve_asset(src)),
            ..Default::default()
        };

        for element in root.select(&COUNTERS) {
            let name = match element.value().attr("data-testid") {
                Some("reply") => "replies",
                Some("retweet") => "reposts",
                Some("like") => "likes",
                _ => continue,
            };
            if let Some(count) = element.value().attr("aria-label").and_then(parse_count) {
                auxiliary.counters.insert(name.to_string(), count);
            }
        }

        auxiliary
    }
}

impl Default for XStatusExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ItemExtractor for XStatusExtractor {
    fn extract(&self, block: &RenderedBlock) -> Option<CapturedItem> {
        let fragment = Html::parse_fragment(&block.markup);
        let root = fragment.root_element();

        // The timestamp link is the tweet's own permalink; other status links
        // in the block belong to quoted tweets.
        let located = root
            .select(&STATUS_ANCHOR)
            .filter(|a| a.select(&TIME).next().is_some())
            .filter_map(|a| a.value().attr("href"))
            .find_map(|href| self.permalink.resolve(href))
            .or_else(|| self.permalink.locate(root))?;

        let (identifier, url) = located;
        let auxiliary = self.auxiliary(&fragment);
        Some(
            self.permalink
                .build_item(block, &fragment, identifier, url, auxiliary),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWEET: &str = r#"
        <article data-testid="tweet">
          <img src="https://pbs.twimg.com/profile_images/1/avatar_normal.jpg">
          <a href="/ferris/status/1790000000000000001?s=20"><time datetime="2024-05-13T10:00:00Z">May 13</time></a>
          <div data-testid="tweetText">Shipping a new crate today</div>
          <div role="link"><a href="/other/status/1700000000000000000">quoted</a></div>
          <button data-testid="reply" aria-label="12 Replies. Reply"></button>
          <button data-testid="retweet" aria-label="3 reposts. Repost"></button>
          <button data-testid="like" aria-label="1,204 Likes. Like"></button>
        </article>"#;

    #[test]
    fn test_extracts_status_id_from_timestamp_link() {
        let item = XStatusExtractor::new()
            .extract(&RenderedBlock::new(TWEET, ""))
            .unwrap();

        assert_eq!(item.identifier, "1790000000000000001");
        assert_eq!(
            item.source_url.as_str(),
            "https://x.com/ferris/status/1790000000000000001"
        );
        assert!(item.raw_text.contains("Shipping a new crate today"));
    }

    #[test]
    fn test_extracts_profile_image_and_counters() {
        let item = XStatusExtractor::new()
            .extract(&RenderedBlock::new(TWEET, ""))
            .unwrap();

        assert_eq!(
            item.auxiliary.profile_image_url.unwrap().as_str(),
            "https://pbs.twimg.com/profile_images/1/avatar_normal.jpg"
        );
        assert_eq!(item.auxiliary.counters.get("replies"), Some(&12));
        assert_eq!(item.auxiliary.counters.get("reposts"), Some(&3));
        assert_eq!(item.auxiliary.counters.get("likes"), Some(&1204));
    }

    #[test]
    fn test_falls_back_to_first_status_link() {
        let block = RenderedBlock::new(
            r#"<article><a href="https://x.com/a/status/55/">link</a></article>"#,
            "",
        );
        let item = XStatusExtractor::new().extract(&block).unwrap();
        assert_eq!(item.identifier, "55");
        assert!(item.auxiliary.counters.is_empty());
        assert!(item.auxiliary.profile_image_url.is_none());
    }

    #[test]
    fn test_promoted_block_without_status_is_skipped() {
        let block = RenderedBlock::new(
            r#"<article><a href="https://ads.example.com/landing">Promoted</a></article>"#,
            "Promoted",
        );
        assert!(XStatusExtractor::new().extract(&block).is_none());
    }
}
