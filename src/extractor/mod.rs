pub mod instagram;
pub mod linkedin;
pub mod permalink;
pub mod x;

pub use instagram::InstagramExtractor;
pub use linkedin::LinkedInExtractor;
pub use permalink::PermalinkExtractor;
pub use x::XStatusExtractor;

use regex::Regex;
use scraper::Selector;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr, sync::LazyLock};
use url::Url;

use crate::capture::types::{CapturedItem, RenderedBlock};

static SPACE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]+").unwrap());
static NEWLINE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\n+").unwrap());
static LEADING_COUNT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d[\d,]*)").unwrap());

/// Turns one rendered block into a captured item.
///
/// `None` means the block carries no parsable permalink yet, which is routine
/// while a feed is still rendering.
pub trait ItemExtractor: Send + Sync {
    fn extract(&self, block: &RenderedBlock) -> Option<CapturedItem>;
}

impl<T: ItemExtractor + ?Sized> ItemExtractor for Box<T> {
    fn extract(&self, block: &RenderedBlock) -> Option<CapturedItem> {
        (**self).extract(block)
    }
}

/// Take the path component that follows `segment`, stopping at `/`, `?` or `#`.
pub fn parse_identifier(permalink: &str, segment: &str) -> Option<String> {
    let (_, rest) = permalink.split_once(segment)?;
    let identifier: String = rest
        .chars()
        .take_while(|c| !matches!(c, '/' | '?' | '#'))
        .collect();
    let identifier = identifier.trim();

    if identifier.is_empty() {
        None
    } else {
        Some(identifier.to_string())
    }
}

/// Leading integer of a label such as `"1,234 Likes. Like"`.
pub fn parse_count(label: &str) -> Option<u64> {
    let captures = LEADING_COUNT_REGEX.captures(label)?;
    captures.get(1)?.as_str().replace(',', "").parse().ok()
}

pub fn normalize_whitespace(text: &str) -> String {
    let text = text.trim();
    let spaced = SPACE_REGEX.replace_all(text, " ");
    NEWLINE_REGEX.replace_all(&spaced, "\n\n").to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    X,
    Instagram,
    LinkedIn,
}

impl Platform {
    /// Selector matching one feed entry on the platform's timeline.
    pub fn block_selector(&self) -> Selector {
        let css = match self {
            Self::X => "article[data-testid='tweet']",
            Self::Instagram => "article",
            Self::LinkedIn => "div[data-urn]",
        };
        Selector::parse(css).unwrap()
    }

    pub fn default_base_url(&self) -> Url {
        let base = match self {
            Self::X => "https://x.com/",
            Self::Instagram => "https://www.instagram.com/",
            Self::LinkedIn => "https://www.linkedin.com/",
        };
        Url::parse(base).unwrap()
    }

    pub fn extractor(&self, base: Option<Url>) -> Box<dyn ItemExtractor> {
        let base = base.unwrap_or_else(|| self.default_base_url());
        match self {
            Self::X => Box::new(XStatusExtractor::with_base(base)),
            Self::Instagram => Box::new(InstagramExtractor::with_base(base)),
            Self::LinkedIn => Box::new(LinkedInExtractor::with_base(base)),
        }
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "x" | "twitter" => Ok(Self::X),
            "instagram" | "ig" => Ok(Self::Instagram),
            "linkedin" => Ok(Self::LinkedIn),
            other => Err(format!("unknown platform '{other}'")),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::X => "x",
            Self::Instagram => "instagram",
            Self::LinkedIn => "linkedin",
        };
        f.write_str(name)
    }
}
