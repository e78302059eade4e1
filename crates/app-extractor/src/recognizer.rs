use once_cell::sync::Lazy;
use regex::Regex;

static POST_URL_MATCH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)https?://(?:www\.|m\.)?instagram\.com/(?:[A-Za-z0-9_.]+/)?(?:p|reels?|tv)/(?P<shortcode>[A-Za-z0-9_-]+)[^\s<>]*",
    )
    .expect("Invalid regex")
});

static TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', ')', ']', '}', '"', '\''];

/// Finds post links in text and pulls the shortcode out of them
#[derive(Debug, Default, Clone, Copy)]
pub struct UrlRecognizer;

impl UrlRecognizer {
    /// Every post URL in `text`, de-duplicated, in the order they first appear
    #[must_use]
    pub fn find_all(text: &str) -> Vec<String> {
        let mut urls: Vec<String> = Vec::new();

        for m in POST_URL_MATCH.find_iter(text) {
            let url = m.as_str().trim_end_matches(TRAILING_PUNCTUATION).to_string();

            if !urls.contains(&url) {
                urls.push(url);
            }
        }

        urls
    }

    #[must_use]
    pub fn shortcode_of(url: &str) -> Option<String> {
        POST_URL_MATCH
            .captures(url.trim())
            .and_then(|x| x.name("shortcode"))
            .map(|x| x.as_str().to_string())
    }

    #[must_use]
    pub fn is_post_url(url: &str) -> bool {
        Self::shortcode_of(url).is_some()
    }
}
