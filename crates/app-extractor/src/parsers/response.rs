use serde_json::Value;
use tracing::debug;

use super::media_object::parse_media_object;
use crate::{
    error::{ExtractError, ExtractResult},
    media::Media,
};

/// The JSON documents the different endpoints answer with
#[derive(Debug, Clone, Copy)]
pub enum ResponseShape<'a> {
    /// `{"items": [..]}` from the private API and `?__a=1` page fetches
    ApiItems(&'a Value),
    /// `{"data": {"xdt_shortcode_media": ..}}` from the current GraphQL endpoint
    XdtShortcodeMedia(&'a Value),
    /// `{"data": {"shortcode_media": ..}}` from the query-hash GraphQL endpoint
    ShortcodeMedia(&'a Value),
    /// `{"graphql": {"shortcode_media": ..}}` from older page payloads
    GraphqlPage(&'a Value),
    /// The `window._sharedData` blob embedded in post pages
    SharedData(&'a Value),
}

impl<'a> ResponseShape<'a> {
    #[must_use]
    pub fn detect(doc: &'a Value) -> Option<Self> {
        if doc.get("items").is_some_and(Value::is_array) {
            Some(Self::ApiItems(doc))
        } else if doc.pointer("/data/xdt_shortcode_media").is_some() {
            Some(Self::XdtShortcodeMedia(doc))
        } else if doc.pointer("/data/shortcode_media").is_some() {
            Some(Self::ShortcodeMedia(doc))
        } else if doc.pointer("/graphql/shortcode_media").is_some() {
            Some(Self::GraphqlPage(doc))
        } else if doc.pointer("/entry_data/PostPage").is_some() {
            Some(Self::SharedData(doc))
        } else {
            None
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ApiItems(_) => "api items",
            Self::XdtShortcodeMedia(_) => "xdt shortcode media",
            Self::ShortcodeMedia(_) => "shortcode media",
            Self::GraphqlPage(_) => "graphql page",
            Self::SharedData(_) => "shared data",
        }
    }

    pub fn parse(self, shortcode: &str) -> ExtractResult<Media> {
        match self {
            Self::ApiItems(doc) => parse_api_items(doc, shortcode),
            Self::XdtShortcodeMedia(doc) => {
                parse_graphql_node(doc.pointer("/data/xdt_shortcode_media"), shortcode)
            }
            Self::ShortcodeMedia(doc) => {
                parse_graphql_node(doc.pointer("/data/shortcode_media"), shortcode)
            }
            Self::GraphqlPage(doc) => {
                parse_graphql_node(doc.pointer("/graphql/shortcode_media"), shortcode)
            }
            Self::SharedData(doc) => parse_shared_data(doc, shortcode),
        }
    }
}

fn media_node(node: Option<&Value>) -> ExtractResult<&Value> {
    node.filter(|x| x.is_object())
        .ok_or_else(|| ExtractError::malformed("response does not contain the post"))
}

fn parse_api_items(doc: &Value, shortcode: &str) -> ExtractResult<Media> {
    let item = media_node(doc.pointer("/items/0"))?;

    parse_media_object(item, shortcode)
}

fn parse_graphql_node(node: Option<&Value>, shortcode: &str) -> ExtractResult<Media> {
    parse_media_object(media_node(node)?, shortcode)
}

fn parse_shared_data(doc: &Value, shortcode: &str) -> ExtractResult<Media> {
    let page = doc.pointer("/entry_data/PostPage/0");

    let node = page
        .and_then(|x| x.pointer("/graphql/shortcode_media"))
        .or_else(|| page.and_then(|x| x.pointer("/items/0")));

    parse_media_object(media_node(node)?, shortcode)
}

/// Whether a JSON document is the site telling us to log in
#[must_use]
pub fn is_login_required(doc: &Value) -> bool {
    if doc.get("require_login").and_then(Value::as_bool) == Some(true) {
        return true;
    }

    matches!(
        doc.get("message").and_then(Value::as_str),
        Some("login_required" | "checkpoint_required" | "challenge_required")
    )
}

/// Parse any of the known JSON response shapes
pub fn parse_response(doc: &Value, shortcode: &str) -> ExtractResult<Media> {
    if is_login_required(doc) {
        return Err(ExtractError::auth_required("response asks to log in"));
    }

    let shape = ResponseShape::detect(doc)
        .ok_or_else(|| ExtractError::malformed("unrecognised response shape"))?;

    debug!(shape = shape.name(), "Detected response shape");

    shape.parse(shortcode)
}
