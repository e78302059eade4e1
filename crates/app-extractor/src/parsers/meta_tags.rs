use once_cell::sync::Lazy;
use regex::Regex;

use super::html::unescape_html;
use crate::{
    error::{ExtractError, ExtractResult},
    media::Media,
};

/// Size tokens the CDN puts in thumbnail URLs
const LOW_RES_TOKENS: &[&str] = &["150x150", "240x240", "320x320", "480x480", "640x640"];

/// Four dot-separated crop coordinates, optionally behind a `c`, not glued to
/// a preceding word or number
static CROP_MATCH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[^0-9A-Za-z.])c?\d+\.\d+\.\d+\.\d+").expect("Invalid regex")
});

static META_TAG_MATCH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<meta\s[^>]*>").expect("Invalid regex"));

static ATTRIBUTE_MATCH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)([a-z:_-]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("Invalid regex")
});

/// Value of the `content` attribute of the meta tag whose `property` (or
/// `name`) is `key`. Attributes may come in any order.
#[must_use]
pub fn meta_content(html: &str, key: &str) -> Option<String> {
    META_TAG_MATCH.find_iter(html).find_map(|tag| {
        let mut property = None;
        let mut content = None;

        for attr in ATTRIBUTE_MATCH.captures_iter(tag.as_str()) {
            let value = attr.get(2).or_else(|| attr.get(3)).map(|x| x.as_str());

            match attr.get(1).map(|x| x.as_str().to_ascii_lowercase()).as_deref() {
                Some("property" | "name") => property = value,
                Some("content") => content = value,
                _ => {}
            }
        }

        if property? != key {
            return None;
        }

        content.map(unescape_html).filter(|x| !x.is_empty())
    })
}

/// Whether an image URL points at a thumbnail or a cropped variant
#[must_use]
pub fn is_low_resolution_url(url: &str) -> bool {
    LOW_RES_TOKENS.iter().any(|x| url.contains(x)) || CROP_MATCH.is_match(url)
}

/// Last resort: the Open Graph tags every post page carries
pub fn parse_meta_tags(html: &str, shortcode: &str) -> ExtractResult<Media> {
    let display_url = meta_content(html, "og:image");
    let video_url = meta_content(html, "og:video")
        .or_else(|| meta_content(html, "og:video:secure_url"));

    if display_url.is_none() && video_url.is_none() {
        return Err(ExtractError::malformed("page has no og:image or og:video tag"));
    }

    let display_url = display_url.unwrap_or_default();
    let is_video = video_url.is_some();

    Ok(Media {
        is_low_resolution: is_low_resolution_url(&display_url),
        caption: meta_content(html, "og:description"),
        display_url,
        video_url,
        ..Media::new(shortcode)
    }
    .with_kind_from(is_video))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaKind;

    #[test]
    fn reads_tags_in_either_attribute_order() {
        let html = r#"<head>
            <meta content="https://cdn.fbcdn.net/full.jpg?a=1&amp;b=2" property="og:image" />
            <meta property='og:description' content='A &quot;nice&quot; post'>
        </head>"#;

        let media = parse_meta_tags(html, "META").expect("parses");

        assert_eq!(media.kind, MediaKind::Image);
        assert_eq!(media.display_url, "https://cdn.fbcdn.net/full.jpg?a=1&b=2");
        assert_eq!(media.caption.as_deref(), Some("A \"nice\" post"));
        assert!(!media.is_low_resolution);
        assert_eq!(media.shortcode, "META");
    }

    #[test]
    fn video_tag_makes_a_video() {
        let html = r#"<meta property="og:image" content="https://cdn/poster.jpg">
            <meta property="og:video" content="https://cdn/clip.mp4">"#;

        let media = parse_meta_tags(html, "V").expect("parses");

        assert_eq!(media.kind, MediaKind::Video);
        assert_eq!(media.video_url.as_deref(), Some("https://cdn/clip.mp4"));
    }

    #[test]
    fn flags_thumbnails_and_crops() {
        assert!(is_low_resolution_url("https://cdn/s640x640/a.jpg"));
        assert!(is_low_resolution_url("https://cdn/a.jpg?stp=c0.135.1080.1080a_dst"));
        assert!(is_low_resolution_url("https://cdn/150x150/a.jpg"));
        assert!(!is_low_resolution_url("https://cdn/p1080x1080/a.jpg"));
        assert!(!is_low_resolution_url("https://cdn/abc1.2.3/a.jpg"));
        assert!(!is_low_resolution_url("https://cdn/v1.2.3.4/a.jpg"));

        let html = r#"<meta property="og:image" content="https://cdn/s320x320/a.jpg">"#;
        assert!(parse_meta_tags(html, "X").expect("parses").is_low_resolution);
    }

    #[test]
    fn crop_after_underscore_in_stp_is_flagged() {
        let url = "https://cdn.fbcdn.net/v/t51/1_n.jpg?stp=dst-jpg_e35_c0.135.1080.1080a&_nc_ht=x";

        assert!(is_low_resolution_url(url));

        let html = format!(r#"<meta property="og:image" content="{url}">"#);
        assert!(parse_meta_tags(&html, "X").expect("parses").is_low_resolution);
    }

    #[test]
    fn missing_tags_are_malformed() {
        let html = r#"<meta property="og:title" content="Instagram">"#;

        assert!(matches!(
            parse_meta_tags(html, "X"),
            Err(ExtractError::MalformedResponse(_))
        ));
    }
}
