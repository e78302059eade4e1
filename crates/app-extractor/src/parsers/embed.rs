use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, trace};

use super::html::{text_content, unescape_html, unescape_url};
use crate::{
    error::{ExtractError, ExtractResult},
    media::{CarouselItem, Media, MediaKind},
};

/// Present in the embed page when the owner turned embedding off
pub const EMBED_DISABLED_MARKER: &str = "EmbedIsBroken";

/// Marks the full resolution variant of a CDN image
const HIGH_RES_TOKEN: &str = "1080";

static DISPLAY_URL_MATCH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"display_url\\*"\s*:\s*\\*"((?:[^"\\]|\\[^"])+)"#).expect("Invalid regex")
});

static VIDEO_URL_MATCH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"video_url\\*"\s*:\s*\\*"((?:[^"\\]|\\[^"])+)"#).expect("Invalid regex")
});

static SRCSET_MATCH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\ssrcset\s*=\s*"([^"]+)""#).expect("Invalid regex"));

static SRC_MATCHES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r#"(?i)<img[^>]*class\s*=\s*"[^"]*EmbeddedMediaImage[^"]*"[^>]*\ssrc\s*=\s*"([^"]+)""#,
        r#"(?i)<img[^>]*\ssrc\s*=\s*"([^"]+)"[^>]*class\s*=\s*"[^"]*EmbeddedMediaImage"#,
        r#"(?i)<img[^>]*\ssrc\s*=\s*'([^']+)'[^>]*class\s*=\s*'[^']*EmbeddedMediaImage"#,
        r#"(?i)<img[^>]*\ssrc\s*=\s*"(https?://[^"]*(?:cdninstagram\.com|fbcdn\.net)[^"]*)""#,
    ]
    .iter()
    .map(|x| Regex::new(x).expect("Invalid regex"))
    .collect()
});

static CDN_IMAGE_MATCH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"https?:(?:\\*/){2}[^"'\s<>]*?(?:cdninstagram\.com|fbcdn\.net)[^"'\s<>]*?\.(?:jpe?g|png|webp|heic)(?:\?[^"'\s<>]*)?"#,
    )
    .expect("Invalid regex")
});

static CAPTION_MATCH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<div\s+class\s*=\s*"Caption"[^>]*>(.*?)<div\s+class\s*=\s*"CaptionComments""#)
        .expect("Invalid regex")
});

static OWNER_MATCH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)class\s*=\s*"UsernameText"[^>]*>\s*([^<\s]+)\s*<"#).expect("Invalid regex")
});

static BASENAME_MATCH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+)_n\.[A-Za-z0-9]+$").expect("Invalid regex"));

/// File name of an image URL without the `_n.<ext>` suffix the CDN adds.
///
/// Different resolutions of the same image share this.
#[must_use]
pub fn image_basename(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let file = path.rsplit('/').next().unwrap_or(path);

    BASENAME_MATCH
        .captures(file)
        .and_then(|x| x.get(1))
        .map_or(file, |x| x.as_str())
        .to_string()
}

/// Every `display_url` in the inline JSON, one per image, preferring the
/// full resolution variant when an image shows up more than once
fn embedded_display_urls(html: &str) -> Vec<String> {
    let mut kept: Vec<(String, String)> = Vec::new();

    for url in DISPLAY_URL_MATCH
        .captures_iter(html)
        .filter_map(|x| x.get(1))
        .map(|x| unescape_url(x.as_str()))
        .filter(|x| !x.is_empty())
    {
        let basename = image_basename(&url);

        match kept.iter_mut().find(|(b, _)| *b == basename) {
            Some((_, existing)) => {
                if !existing.contains(HIGH_RES_TOKEN) && url.contains(HIGH_RES_TOKEN) {
                    trace!(?existing, replacement = ?url, "Preferring high resolution variant");
                    *existing = url;
                }
            }
            None => kept.push((basename, url)),
        }
    }

    kept.into_iter().map(|(_, url)| url).collect()
}

fn srcset_url(html: &str) -> Option<String> {
    SRCSET_MATCH
        .captures_iter(html)
        .filter_map(|x| x.get(1))
        .flat_map(|x| x.as_str().split(','))
        .filter_map(|entry| {
            let mut parts = entry.split_whitespace();
            let url = parts.next()?;
            let width = parts
                .next()
                .and_then(|x| x.trim_end_matches(['w', 'W']).parse::<u32>().ok())
                .unwrap_or_default();

            Some((url, width))
        })
        .max_by_key(|(_, width)| *width)
        .map(|(url, _)| unescape_html(url))
}

fn src_url(html: &str) -> Option<String> {
    SRC_MATCHES
        .iter()
        .find_map(|x| x.captures(html).and_then(|x| x.get(1)))
        .map(|x| unescape_html(x.as_str()))
}

fn cdn_image_url(html: &str) -> Option<String> {
    CDN_IMAGE_MATCH
        .find(html)
        .map(|x| unescape_url(x.as_str()))
}

fn single_display_url(html: &str) -> Option<String> {
    srcset_url(html)
        .or_else(|| src_url(html))
        .or_else(|| cdn_image_url(html))
}

fn video_url(html: &str) -> Option<String> {
    VIDEO_URL_MATCH
        .captures(html)
        .and_then(|x| x.get(1))
        .map(|x| unescape_url(x.as_str()))
        .filter(|x| !x.is_empty())
}

fn caption(html: &str) -> Option<String> {
    CAPTION_MATCH
        .captures(html)
        .and_then(|x| x.get(1))
        .map(|x| text_content(x.as_str()))
        .filter(|x| !x.is_empty())
}

fn owner_handle(html: &str) -> Option<String> {
    OWNER_MATCH
        .captures(html)
        .and_then(|x| x.get(1))
        .map(|x| unescape_html(x.as_str()))
}

/// Parse the `/embed/captioned/` page of a post
pub fn parse_embed_html(html: &str, shortcode: &str) -> ExtractResult<Media> {
    if html.contains(EMBED_DISABLED_MARKER) {
        return Err(ExtractError::EmbedDisabled);
    }

    if shortcode.is_empty() {
        return Err(ExtractError::malformed("embed page needs a shortcode"));
    }

    let media = Media {
        caption: caption(html),
        owner_handle: owner_handle(html),
        ..Media::new(shortcode)
    };

    let display_urls = embedded_display_urls(html);
    debug!(count = display_urls.len(), "Found display urls in embed page");

    if display_urls.len() > 1 {
        let items = display_urls
            .into_iter()
            .filter_map(CarouselItem::image)
            .collect::<Vec<_>>();

        return Ok(Media {
            display_url: items
                .first()
                .map(|x| x.display_url.clone())
                .unwrap_or_default(),
            kind: MediaKind::Carousel,
            items,
            ..media
        });
    }

    let video_url = video_url(html);
    let display_url = single_display_url(html).or_else(|| display_urls.into_iter().next());

    if display_url.is_none() && video_url.is_none() {
        return Err(ExtractError::malformed(
            "embed page has neither an image nor a video",
        ));
    }

    let is_video = video_url.is_some();

    Ok(Media {
        display_url: display_url.unwrap_or_default(),
        video_url,
        ..media
    }
    .with_kind_from(is_video))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::ItemKind;

    const CDN: &str = "https:\\/\\/scontent.cdninstagram.com\\/v\\/t51.2885-15";

    #[test]
    fn basename_strips_size_suffix() {
        assert_eq!(
            image_basename("https://scontent.cdninstagram.com/v/t51/12345_678_n.jpg?stp=dst-jpg_e35"),
            "12345_678"
        );
        assert_eq!(image_basename("https://cdn/plain.webp"), "plain.webp");
    }

    #[test]
    fn duplicate_basenames_collapse_to_high_res_carousel() {
        let html = format!(
            r#"<script>window.__data = "{{\"display_url\":\"{CDN}\/A_n.jpg?stp=dst-jpg_s640x640\",
            \"display_url\":\"{CDN}\/B_n.jpg?stp=dst-jpg_p1080x1080\",
            \"display_url\":\"{CDN}\/A_n.jpg?stp=dst-jpg_p1080x1080&x=1\"}}";</script>"#
        );

        let media = parse_embed_html(&html, "CAR").expect("parses");

        assert_eq!(media.kind, MediaKind::Carousel);
        assert_eq!(media.items.len(), 2);
        assert_eq!(
            media.items[0].display_url,
            "https://scontent.cdninstagram.com/v/t51.2885-15/A_n.jpg?stp=dst-jpg_p1080x1080&x=1"
        );
        assert!(media.items[1].display_url.contains("/B_n.jpg"));
        assert!(media.items.iter().all(|x| x.kind == ItemKind::Image));
        assert_eq!(media.display_url, media.items[0].display_url);
    }

    #[test]
    fn first_variant_is_kept_when_it_already_has_high_res() {
        let html = r#""display_url":"https://cdn.cdninstagram.com/A_n.jpg?p1080x1080"
            "display_url":"https://cdn.cdninstagram.com/A_n.jpg?other1080""#;

        let media = parse_embed_html(html, "X").expect("parses");

        assert_eq!(media.kind, MediaKind::Image);
        assert_eq!(media.display_url, "https://cdn.cdninstagram.com/A_n.jpg?p1080x1080");
    }

    #[test]
    fn srcset_picks_widest_entry() {
        let html = r#"<div class="Embed"><img class="EmbeddedMediaImage" alt="x"
            src="https://scontent.cdninstagram.com/small.jpg"
            srcset="https://scontent.cdninstagram.com/640.jpg 640w,https://scontent.cdninstagram.com/1080.jpg?a=1&amp;b=2 1080w,https://scontent.cdninstagram.com/750.jpg 750w" />
            <div class="Caption"><a class="CaptionUsername">someone</a> nice  <br/>day<div class="CaptionComments"></div></div>
            <span class="UsernameText">someone</span></div>"#;

        let media = parse_embed_html(html, "IMG").expect("parses");

        assert_eq!(media.kind, MediaKind::Image);
        assert_eq!(media.display_url, "https://scontent.cdninstagram.com/1080.jpg?a=1&b=2");
        assert_eq!(media.caption.as_deref(), Some("someone nice day"));
        assert_eq!(media.owner_handle.as_deref(), Some("someone"));
        assert_eq!(media.shortcode, "IMG");
    }

    #[test]
    fn src_attribute_in_either_order() {
        let html_a = r#"<img class="EmbeddedMediaImage" src="https://x.fbcdn.net/a.jpg">"#;
        let html_b = r#"<img src="https://example.org/b.jpg" class="EmbeddedMediaImage">"#;

        assert_eq!(
            parse_embed_html(html_a, "A").expect("parses").display_url,
            "https://x.fbcdn.net/a.jpg"
        );
        assert_eq!(
            parse_embed_html(html_b, "B").expect("parses").display_url,
            "https://example.org/b.jpg"
        );
    }

    #[test]
    fn bare_cdn_url_is_last_resort() {
        let html = r#"<script>var s = "https:\/\/scontent-xy.cdninstagram.com\/v\/pic_n.webp?efg=1";</script>"#;

        let media = parse_embed_html(html, "CDN").expect("parses");

        assert_eq!(
            media.display_url,
            "https://scontent-xy.cdninstagram.com/v/pic_n.webp?efg=1"
        );
    }

    #[test]
    fn video_is_detected() {
        let html = r#"<img class="EmbeddedMediaImage" src="https://x.fbcdn.net/poster.jpg">
            <script>{"video_url":"https:\/\/x.fbcdn.net\/clip.mp4?a=1&b=2"}</script>"#;

        let media = parse_embed_html(html, "VID").expect("parses");

        assert_eq!(media.kind, MediaKind::Video);
        assert_eq!(media.video_url.as_deref(), Some("https://x.fbcdn.net/clip.mp4?a=1&b=2"));
        assert_eq!(media.display_url, "https://x.fbcdn.net/poster.jpg");
    }

    #[test]
    fn disabled_marker_wins_over_content() {
        let with_content = format!(
            r#"<div class="EmbedIsBroken"></div><img class="EmbeddedMediaImage" src="https://x.fbcdn.net/a.jpg">{}"#,
            r#""display_url":"https://x.fbcdn.net/A_n.jpg","display_url":"https://x.fbcdn.net/B_n.jpg""#
        );

        assert!(matches!(
            parse_embed_html(&with_content, "X"),
            Err(ExtractError::EmbedDisabled)
        ));
        assert!(matches!(
            parse_embed_html("<p>EmbedIsBroken</p>", "X"),
            Err(ExtractError::EmbedDisabled)
        ));
    }

    #[test]
    fn nothing_found_is_malformed() {
        assert!(matches!(
            parse_embed_html("<html><body>Hello</body></html>", "X"),
            Err(ExtractError::MalformedResponse(_))
        ));
    }
}
