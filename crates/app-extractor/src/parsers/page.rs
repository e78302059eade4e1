use serde_json::Value;
use tracing::{debug, trace};

use super::{
    html::{json_object_at, script_bodies},
    meta_tags::parse_meta_tags,
    response::parse_response,
};
use crate::{error::ExtractResult, media::Media};

const SHARED_DATA_MARKER: &str = "window._sharedData";
const ADDITIONAL_DATA_MARKER: &str = "window.__additionalDataLoaded(";

/// The first JSON object after `marker` in any script of the page
fn inline_json(scripts: &[String], marker: &str) -> Option<Value> {
    scripts.iter().find_map(|script| {
        let marker_at = script.find(marker)?;
        let start = marker_at + script[marker_at..].find('{')?;
        let object = json_object_at(script, start)?;

        match serde_json::from_str(object) {
            Ok(x) => Some(x),
            Err(e) => {
                trace!(?e, marker, "Inline JSON did not parse");
                None
            }
        }
    })
}

/// Scrape a full post page: shared data blob, then additional data blob,
/// then the Open Graph tags
pub fn parse_page_html(html: &str, shortcode: &str) -> ExtractResult<Media> {
    let scripts = script_bodies(html);

    for marker in [SHARED_DATA_MARKER, ADDITIONAL_DATA_MARKER] {
        let Some(doc) = inline_json(&scripts, marker) else {
            continue;
        };

        match parse_response(&doc, shortcode) {
            Ok(media) => {
                debug!(marker, "Parsed inline page data");
                return Ok(media);
            }
            Err(e) => {
                debug!(?e, marker, "Inline page data unusable");
            }
        }
    }

    parse_meta_tags(html, shortcode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::ExtractError, media::MediaKind};

    #[test]
    fn prefers_shared_data() {
        let html = r#"<html><head>
            <meta property="og:image" content="https://cdn/s150x150/low.jpg">
            <script type="text/javascript">window._sharedData = {"entry_data":{"PostPage":[{"graphql":{"shortcode_media":{"shortcode":"SD","display_url":"https://cdn/full.jpg","caption":"{not a brace}"}}}]}};</script>
            </head></html>"#;

        let media = parse_page_html(html, "SD").expect("parses");

        assert_eq!(media.display_url, "https://cdn/full.jpg");
        assert!(!media.is_low_resolution);
    }

    #[test]
    fn falls_back_to_additional_data() {
        let html = r#"<html><body>
            <script>window._sharedData = {"config":{"viewer":null}};</script>
            <script>window.__additionalDataLoaded('/p/AD/',{"items":[{"code":"AD","media_type":2,"image_versions2":{"candidates":[{"url":"https://cdn/poster.jpg","width":640}]},"video_versions":[{"url":"https://cdn/v.mp4","width":720}]}]});</script>
            </body></html>"#;

        let media = parse_page_html(html, "AD").expect("parses");

        assert_eq!(media.kind, MediaKind::Video);
        assert_eq!(media.video_url.as_deref(), Some("https://cdn/v.mp4"));
    }

    #[test]
    fn falls_back_to_meta_tags() {
        let html = r#"<html><head>
            <meta property="og:image" content="https://cdn/s640x640/low.jpg">
            <script>window._sharedData = {broken json};</script>
            </head></html>"#;

        let media = parse_page_html(html, "MT").expect("parses");

        assert_eq!(media.display_url, "https://cdn/s640x640/low.jpg");
        assert!(media.is_low_resolution);
    }

    #[test]
    fn login_wall_is_malformed() {
        assert!(matches!(
            parse_page_html("<html><body>Log in to continue</body></html>", "X"),
            Err(ExtractError::MalformedResponse(_))
        ));
    }
}
