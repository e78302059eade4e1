use serde_json::Value;
use tracing::trace;

use crate::{
    error::{ExtractError, ExtractResult},
    media::{CarouselItem, Media, MediaKind},
};

fn str_field<'a>(node: &'a Value, key: &str) -> Option<&'a str> {
    node.get(key)
        .and_then(Value::as_str)
        .filter(|x| !x.is_empty())
}

fn str_at<'a>(node: &'a Value, pointer: &str) -> Option<&'a str> {
    node.pointer(pointer)
        .and_then(Value::as_str)
        .filter(|x| !x.is_empty())
}

/// URL of the widest entry of a `[{url, width, height}]` list
fn widest_candidate(list: Option<&Value>) -> Option<String> {
    list.and_then(Value::as_array)?
        .iter()
        .filter_map(|x| str_field(x, "url").map(|url| (url, x.get("width").and_then(Value::as_u64))))
        .max_by_key(|(_, width)| width.unwrap_or_default())
        .map(|(url, _)| url.to_string())
}

fn display_url(node: &Value) -> Option<String> {
    str_field(node, "display_url")
        .map(ToString::to_string)
        .or_else(|| widest_candidate(node.pointer("/image_versions2/candidates")))
        .or_else(|| {
            node.get("display_resources")
                .and_then(Value::as_array)
                .and_then(|x| x.last())
                .and_then(|x| str_field(x, "src"))
                .map(ToString::to_string)
        })
}

fn video_url(node: &Value) -> Option<String> {
    str_field(node, "video_url")
        .map(ToString::to_string)
        .or_else(|| widest_candidate(node.get("video_versions")))
}

fn is_video(node: &Value, has_video_url: bool) -> bool {
    if let Some(x) = node.get("is_video").and_then(Value::as_bool) {
        return x;
    }

    match node.get("media_type") {
        Some(Value::Number(n)) => n.as_u64() == Some(2),
        Some(Value::String(s)) => s == "2",
        _ => has_video_url,
    }
}

fn caption(node: &Value) -> Option<String> {
    str_at(node, "/edge_media_to_caption/edges/0/node/text")
        .or_else(|| str_at(node, "/caption/text"))
        .map(ToString::to_string)
}

fn timestamp(node: &Value) -> Option<i64> {
    node.get("taken_at_timestamp")
        .or_else(|| node.get("taken_at"))
        .and_then(Value::as_i64)
}

fn owner_handle(node: &Value) -> Option<String> {
    str_at(node, "/owner/username")
        .or_else(|| str_at(node, "/user/username"))
        .map(ToString::to_string)
}

fn thumbnail_url(node: &Value) -> Option<String> {
    str_field(node, "thumbnail_src")
        .or_else(|| str_field(node, "thumbnail_url"))
        .map(ToString::to_string)
}

/// A video child must come with its video, the poster alone is not the item
fn carousel_item(node: &Value) -> ExtractResult<Option<CarouselItem>> {
    let Some(display_url) = display_url(node) else {
        return Ok(None);
    };
    let video_url = video_url(node);

    if is_video(node, video_url.is_some()) {
        if video_url.is_none() {
            return Err(ExtractError::NoPlayableSource);
        }

        return Ok(CarouselItem::new(display_url, video_url));
    }

    Ok(CarouselItem::image(display_url))
}

/// Children of a sidecar (GraphQL) or carousel (API) post.
///
/// Children without a display URL are left out.
fn carousel_items(node: &Value) -> ExtractResult<Vec<CarouselItem>> {
    let graph_children = node
        .pointer("/edge_sidecar_to_children/edges")
        .and_then(Value::as_array)
        .filter(|x| !x.is_empty())
        .map(|edges| edges.iter().filter_map(|x| x.get("node")).collect::<Vec<_>>());

    let children = graph_children.unwrap_or_else(|| {
        node.get("carousel_media")
            .and_then(Value::as_array)
            .map(|x| x.iter().collect())
            .unwrap_or_default()
    });

    let mut items = Vec::with_capacity(children.len());
    for child in children {
        if let Some(item) = carousel_item(child)? {
            items.push(item);
        }
    }

    trace!(count = items.len(), "Parsed carousel items");

    Ok(items)
}

/// Turn one media node (GraphQL `shortcode_media` or an API `items[]` entry)
/// into a [`Media`].
///
/// Missing fields fall back to defaults. It fails when there is no shortcode
/// in the node and `fallback_shortcode` is empty, and when a carousel child is
/// a video without a video URL.
pub fn parse_media_object(node: &Value, fallback_shortcode: &str) -> ExtractResult<Media> {
    let shortcode = str_field(node, "shortcode")
        .or_else(|| str_field(node, "code"))
        .or_else(|| Some(fallback_shortcode).filter(|x| !x.is_empty()))
        .ok_or_else(|| ExtractError::malformed("media object without a shortcode"))?;

    let video_url = video_url(node);
    let is_video = is_video(node, video_url.is_some());

    let media = Media {
        display_url: display_url(node).unwrap_or_default(),
        thumbnail_url: thumbnail_url(node),
        video_url,
        caption: caption(node),
        timestamp: timestamp(node),
        owner_handle: owner_handle(node),
        items: carousel_items(node)?,
        ..Media::new(shortcode)
    };

    let mut media = media.with_kind_from(is_video);

    if media.kind != MediaKind::Video {
        media.video_url = None;
    }

    Ok(media)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::media::ItemKind;

    #[test]
    fn graphql_image() {
        let node = json!({
            "__typename": "XDTGraphImage",
            "shortcode": "ABC",
            "display_url": "https://cdn/abc.jpg",
            "is_video": false,
            "taken_at_timestamp": 1_700_000_000,
            "owner": { "username": "someone" },
            "edge_media_to_caption": { "edges": [{ "node": { "text": "hello" } }] },
        });

        let media = parse_media_object(&node, "").expect("parses");

        assert_eq!(media.shortcode, "ABC");
        assert_eq!(media.kind, MediaKind::Image);
        assert_eq!(media.display_url, "https://cdn/abc.jpg");
        assert_eq!(media.caption.as_deref(), Some("hello"));
        assert_eq!(media.timestamp, Some(1_700_000_000));
        assert_eq!(media.owner_handle.as_deref(), Some("someone"));
        assert!(media.video_url.is_none());
        assert!(!media.is_low_resolution);
    }

    #[test]
    fn api_video_picks_widest_versions() {
        let node = json!({
            "code": "VID",
            "media_type": 2,
            "taken_at": 1_600_000_000,
            "user": { "username": "maker" },
            "caption": { "text": "flat caption" },
            "image_versions2": { "candidates": [
                { "url": "https://cdn/v-320.jpg", "width": 320 },
                { "url": "https://cdn/v-1080.jpg", "width": 1080 },
            ]},
            "video_versions": [
                { "url": "https://cdn/v-480.mp4", "width": 480 },
                { "url": "https://cdn/v-720.mp4", "width": 720 },
                { "url": "https://cdn/v-640.mp4", "width": 640 },
            ],
        });

        let media = parse_media_object(&node, "ignored").expect("parses");

        assert_eq!(media.shortcode, "VID");
        assert_eq!(media.kind, MediaKind::Video);
        assert_eq!(media.display_url, "https://cdn/v-1080.jpg");
        assert_eq!(media.video_url.as_deref(), Some("https://cdn/v-720.mp4"));
        assert_eq!(media.caption.as_deref(), Some("flat caption"));
        assert_eq!(media.owner_handle.as_deref(), Some("maker"));
    }

    #[test]
    fn widest_candidate_wins_in_any_order() {
        let urls = [
            ("https://cdn/320.jpg", 320),
            ("https://cdn/750.jpg", 750),
            ("https://cdn/1080.jpg", 1080),
        ];
        let orders = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];

        for order in orders {
            let candidates = order
                .iter()
                .map(|i| json!({ "url": urls[*i].0, "width": urls[*i].1 }))
                .collect::<Vec<_>>();
            let node = json!({ "image_versions2": { "candidates": candidates } });

            let media = parse_media_object(&node, "X").expect("parses");

            assert_eq!(media.display_url, "https://cdn/1080.jpg", "order {order:?}");
        }
    }

    #[test]
    fn display_resources_uses_last_entry() {
        let node = json!({
            "display_resources": [
                { "src": "https://cdn/640.jpg", "config_width": 640 },
                { "src": "https://cdn/1080.jpg", "config_width": 1080 },
            ],
        });

        let media = parse_media_object(&node, "X").expect("parses");

        assert_eq!(media.display_url, "https://cdn/1080.jpg");
    }

    #[test]
    fn media_type_as_string_marks_video() {
        let node = json!({ "media_type": "2", "video_url": "https://cdn/a.mp4" });

        let media = parse_media_object(&node, "X").expect("parses");

        assert_eq!(media.kind, MediaKind::Video);
    }

    #[test]
    fn missing_display_sources_give_empty_url() {
        for node in [
            json!({}),
            json!({ "display_url": "" }),
            json!({ "image_versions2": { "candidates": [] } }),
            json!({ "display_resources": "nope", "video_versions": 3 }),
            json!({ "caption": null, "owner": [] }),
        ] {
            let media = parse_media_object(&node, "X").expect("never fails with a shortcode");

            assert_eq!(media.display_url, "", "{node}");
            assert_eq!(media.kind, MediaKind::Image);
        }
    }

    #[test]
    fn no_shortcode_anywhere_is_malformed() {
        let res = parse_media_object(&json!({ "display_url": "https://cdn/a.jpg" }), "");

        assert!(matches!(res, Err(ExtractError::MalformedResponse(_))));
    }

    #[test]
    fn sidecar_items_without_display_url_are_dropped() {
        for edge_count in 2..6_usize {
            let edges = (0..edge_count)
                .map(|i| {
                    if i % 3 == 1 {
                        json!({ "node": { "is_video": false } })
                    } else {
                        json!({ "node": { "display_url": format!("https://cdn/{i}.jpg"), "is_video": false } })
                    }
                })
                .collect::<Vec<_>>();
            let expected = (0..edge_count).filter(|i| i % 3 != 1).count();
            let node = json!({
                "shortcode": "SIDE",
                "display_url": "https://cdn/cover.jpg",
                "edge_sidecar_to_children": { "edges": edges },
            });

            let media = parse_media_object(&node, "").expect("parses");

            assert_eq!(media.kind, MediaKind::Carousel);
            assert_eq!(media.items.len(), expected);
        }
    }

    #[test]
    fn sidecar_video_children_keep_their_video() {
        let node = json!({
            "shortcode": "SIDE",
            "edge_sidecar_to_children": { "edges": [
                { "node": { "display_url": "https://cdn/1.jpg", "is_video": false } },
                { "node": { "display_url": "https://cdn/2.jpg", "is_video": true, "video_url": "https://cdn/2.mp4" } },
            ]},
        });

        let media = parse_media_object(&node, "").expect("parses");

        assert_eq!(media.items[0].kind, ItemKind::Image);
        assert_eq!(media.items[1].kind, ItemKind::Video);
        assert_eq!(media.items[1].download_url(), "https://cdn/2.mp4");
        assert!(media.video_url.is_none());
    }

    #[test]
    fn sidecar_video_child_without_source_is_not_an_image() {
        for child in [
            json!({ "display_url": "https://cdn/2.jpg", "is_video": true }),
            json!({ "display_url": "https://cdn/2.jpg", "media_type": 2 }),
        ] {
            let node = json!({
                "shortcode": "SIDE",
                "edge_sidecar_to_children": { "edges": [
                    { "node": { "display_url": "https://cdn/1.jpg", "is_video": false } },
                    { "node": child },
                ]},
            });

            assert!(matches!(
                parse_media_object(&node, ""),
                Err(ExtractError::NoPlayableSource)
            ));
        }
    }

    #[test]
    fn api_carousel_media_uses_candidate_rules() {
        let node = json!({
            "code": "CAR",
            "media_type": 8,
            "carousel_media": [
                { "media_type": 1, "image_versions2": { "candidates": [
                    { "url": "https://cdn/a-150.jpg", "width": 150 },
                    { "url": "https://cdn/a-1440.jpg", "width": 1440 },
                ]}},
                { "media_type": 2,
                  "image_versions2": { "candidates": [{ "url": "https://cdn/b.jpg", "width": 640 }] },
                  "video_versions": [{ "url": "https://cdn/b.mp4", "width": 640 }] },
                { "media_type": 1 },
            ],
        });

        let media = parse_media_object(&node, "").expect("parses");

        assert_eq!(media.kind, MediaKind::Carousel);
        assert_eq!(media.items.len(), 2);
        assert_eq!(media.items[0].display_url, "https://cdn/a-1440.jpg");
        assert_eq!(media.items[1].video_url.as_deref(), Some("https://cdn/b.mp4"));
    }
}
