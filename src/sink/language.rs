use regex::Regex;
use std::sync::LazyLock;
use whatlang::{Lang, detect};

const MIN_CONFIDENCE: f64 = 0.25;
const MIN_TEXT_LENGTH: usize = 40;

/// Links, @handles and #tags carry no language signal.
static FEED_MARKUP_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+|www\.\S+|[@#][\w.]+").unwrap());

/// Language of a post's prose, ignoring links, mentions and hashtags.
pub fn detect_language(text: &str) -> Option<String> {
    let prose = FEED_MARKUP_REGEX.replace_all(text, " ");
    let prose = prose.split_whitespace().collect::<Vec<_>>().join(" ");

    // Short posts give unreliable guesses
    if prose.len() < MIN_TEXT_LENGTH {
        return None;
    }

    if let Some(info) = detect(&prose)
        && info.confidence() >= MIN_CONFIDENCE
    {
        return Some(lang_to_code(info.lang()));
    }

    None
}

fn lang_to_code(lang: Lang) -> String {
    match lang {
        Lang::Eng => "en".to_string(),
        Lang::Spa => "es".to_string(),
        Lang::Por => "pt".to_string(),
        Lang::Fra => "fr".to_string(),
        Lang::Deu => "de".to_string(),
        Lang::Ita => "it".to_string(),
        Lang::Jpn => "ja".to_string(),
        Lang::Kor => "ko".to_string(),
        Lang::Cmn => "zh".to_string(),
        Lang::Hin => "hi".to_string(),
        Lang::Ara => "ar".to_string(),
        Lang::Rus => "ru".to_string(),
        Lang::Tur => "tr".to_string(),
        _ => lang.code().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_english_post() {
        let text = "Just shipped the new release of our scheduler, thanks to everyone who tested it this week.";
        assert_eq!(detect_language(text), Some("en".to_string()));
    }

    #[test]
    fn test_detect_spanish_post() {
        let text = "Hoy publicamos la nueva versión del programa, gracias a todos los que lo probaron esta semana.";
        assert_eq!(detect_language(text), Some("es".to_string()));
    }

    #[test]
    fn test_short_post_returns_none() {
        assert_eq!(detect_language("gm"), None);
    }

    #[test]
    fn test_mentions_and_links_do_not_count_as_text() {
        let text = "gm @rustlang @tokio_rs https://t.co/AbCdEfGhIjKl #rustlang #opensource";
        assert_eq!(detect_language(text), None);
    }

    #[test]
    fn test_detects_prose_around_mentions() {
        let text = "@ferris thanks for the review, the new release of our scheduler ships this week https://t.co/xyz #rust";
        assert_eq!(detect_language(text), Some("en".to_string()));
    }
}
