use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use url::Url;

use crate::capture::types::CapturedItem;
use crate::sink::language::detect_language;

/// Flat JSON shape written to the array file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRecord {
    pub identifier: String,
    pub raw_text: String,
    pub source_url: Url,
    pub captured_at: DateTime<Utc>,
    /// md5 of the captured markup
    pub checksum: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image_url: Option<Url>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<Url>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub counters: BTreeMap<String, u64>,
}

impl From<&CapturedItem> for ItemRecord {
    fn from(item: &CapturedItem) -> Self {
        Self {
            identifier: item.identifier.clone(),
            raw_text: item.raw_text.clone(),
            source_url: item.source_url.clone(),
            captured_at: item.captured_at,
            checksum: format!("{:x}", md5::compute(item.raw_markup.as_bytes())),
            language: detect_language(&item.raw_text),
            profile_image_url: item.auxiliary.profile_image_url.clone(),
            media_url: item.auxiliary.media_url.clone(),
            media_path: item.media_path.clone(),
            counters: item.auxiliary.counters.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::types::Auxiliary;

    #[test]
    fn test_record_serializes_camel_case_and_skips_empty() {
        let item = CapturedItem {
            identifier: "42".to_string(),
            raw_markup: "<article>hi</article>".to_string(),
            raw_text: "hi".to_string(),
            source_url: Url::parse("https://x.com/a/status/42").unwrap(),
            auxiliary: Auxiliary::default(),
            captured_at: Utc::now(),
            media_path: None,
        };

        let value = serde_json::to_value(ItemRecord::from(&item)).unwrap();
        assert_eq!(value["identifier"], "42");
        assert_eq!(value["rawText"], "hi");
        assert_eq!(value["sourceUrl"], "https://x.com/a/status/42");
        assert_eq!(
            value["checksum"],
            format!("{:x}", md5::compute("<article>hi</article>"))
        );
        assert!(value.get("language").is_none());
        assert!(value.get("counters").is_none());
        assert!(value.get("mediaPath").is_none());
    }
}
