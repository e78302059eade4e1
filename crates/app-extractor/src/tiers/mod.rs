use std::fmt::{Debug, Display};

use http::StatusCode;
use serde_json::Value;
use tracing::trace;

use crate::{
    common::{
        credentials::Credentials,
        request::{FetchRequest, FetchResponse, Transport},
    },
    error::{ExtractError, ExtractResult},
    media::Media,
    parsers::response::is_login_required,
};

mod api_media_info;
mod embed;
mod graphql;
mod page_scrape;
mod web_info;

pub use api_media_info::ApiMediaInfo;
pub use embed::EmbedPage;
pub use graphql::GraphqlQuery;
pub use page_scrape::PageScrape;
pub use web_info::AuthenticatedPage;

pub const DEFAULT_WEB_BASE_URL: &str = "https://www.instagram.com";
pub const DEFAULT_API_BASE_URL: &str = "https://i.instagram.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TierId {
    ApiMediaInfo,
    AuthenticatedPage,
    AuthenticatedGraphql,
    PublicGraphql,
    EmbedPage,
    PageScrape,
}

impl Display for TierId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::ApiMediaInfo => "api-media-info",
            Self::AuthenticatedPage => "authenticated-page",
            Self::AuthenticatedGraphql => "authenticated-graphql",
            Self::PublicGraphql => "public-graphql",
            Self::EmbedPage => "embed-page",
            Self::PageScrape => "page-scrape",
        };

        write!(f, "{name}")
    }
}

/// What the chain does after a tier failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    Next,
    /// Jump ahead to the given tier, skipping everything in between
    SkipTo(TierId),
}

/// Base URLs of the site, overridable for tests and mirrors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub web_base: String,
    pub api_base: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::new(DEFAULT_WEB_BASE_URL, DEFAULT_API_BASE_URL)
    }
}

impl Endpoints {
    #[must_use]
    pub fn new(web_base: &str, api_base: &str) -> Self {
        Self {
            web_base: web_base.trim_end_matches('/').to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    #[must_use]
    pub fn post_page(&self, shortcode: &str) -> String {
        format!("{}/p/{}/", self.web_base, shortcode)
    }

    #[must_use]
    pub fn post_info(&self, shortcode: &str) -> String {
        format!("{}/p/{}/?__a=1&__d=dis", self.web_base, shortcode)
    }

    #[must_use]
    pub fn embed_page(&self, shortcode: &str) -> String {
        format!("{}/p/{}/embed/captioned/", self.web_base, shortcode)
    }

    #[must_use]
    pub fn graphql(&self) -> String {
        format!("{}/graphql/query/", self.web_base)
    }

    #[must_use]
    pub fn media_info(&self, media_id: u128) -> String {
        format!("{}/api/v1/media/{}/info/", self.api_base, media_id)
    }
}

/// Everything a tier gets to work with for one resolve call
#[derive(Clone, Copy)]
pub struct TierContext<'a> {
    pub shortcode: &'a str,
    pub credentials: Option<&'a Credentials>,
    pub transport: &'a dyn Transport,
    pub endpoints: &'a Endpoints,
}

impl Debug for TierContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TierContext")
            .field("shortcode", &self.shortcode)
            .field("authenticated", &self.credentials.is_some())
            .finish_non_exhaustive()
    }
}

impl<'a> TierContext<'a> {
    pub fn require_credentials(&self) -> ExtractResult<&'a Credentials> {
        self.credentials
            .ok_or_else(|| ExtractError::auth_required("tier needs a logged in session"))
    }

    /// Send the request and turn error statuses into errors
    pub async fn fetch(&self, request: FetchRequest) -> ExtractResult<FetchResponse> {
        trace!(url = ?request.url, method = ?request.method, "Sending tier request");

        let response = self.transport.fetch(request).await?;
        trace!(status = ?response.status, len = response.body.len(), "Got tier response");

        check_status(&response)?;

        Ok(response)
    }
}

/// One strategy of the resolution chain
#[async_trait::async_trait]
pub trait Tier: Debug + Send + Sync {
    fn id(&self) -> TierId;

    async fn attempt(&self, ctx: &TierContext<'_>) -> ExtractResult<Media>;

    fn fallback(&self, _error: &ExtractError) -> Fallback {
        Fallback::Next
    }
}

pub fn check_status(response: &FetchResponse) -> ExtractResult<()> {
    match response.status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ExtractError::auth_required(
            format!("server answered {}", response.status),
        )),
        status if !status.is_success() => Err(ExtractError::Http { status }),
        _ => Ok(()),
    }
}

fn looks_like_html(body: &[u8]) -> bool {
    let start = body
        .iter()
        .position(|x| !x.is_ascii_whitespace())
        .unwrap_or(body.len());
    let head = &body[start..body.len().min(start + 16)];
    let head = String::from_utf8_lossy(head).to_ascii_lowercase();

    head.starts_with("<!doctype") || head.starts_with("<html")
}

/// The body as JSON, refusing HTML pages and login walls
pub fn expect_json(response: &FetchResponse) -> ExtractResult<Value> {
    if looks_like_html(&response.body) {
        return Err(ExtractError::malformed("expected JSON, got an HTML page"));
    }

    let doc: Value = response
        .json()
        .map_err(|e| ExtractError::malformed(format!("invalid JSON: {e}")))?;

    if is_login_required(&doc) {
        return Err(ExtractError::auth_required("response asks to log in"));
    }

    Ok(doc)
}

/// The tiers used when a valid session is available, in order
#[must_use]
pub fn authenticated_tiers() -> Vec<Box<dyn Tier>> {
    vec![
        Box::new(ApiMediaInfo),
        Box::new(AuthenticatedPage),
        Box::new(GraphqlQuery::authenticated()),
    ]
}

/// The tiers that work without a session, in order
#[must_use]
pub fn public_tiers() -> Vec<Box<dyn Tier>> {
    vec![
        Box::new(GraphqlQuery::public()),
        Box::new(EmbedPage),
        Box::new(PageScrape),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_trim_trailing_slash() {
        let endpoints = Endpoints::new("http://localhost:1234/", "http://api.local//");

        assert_eq!(endpoints.post_page("abc"), "http://localhost:1234/p/abc/");
        assert_eq!(
            endpoints.embed_page("abc"),
            "http://localhost:1234/p/abc/embed/captioned/"
        );
        assert_eq!(
            endpoints.media_info(42),
            "http://api.local/api/v1/media/42/info/"
        );
    }

    #[test]
    fn html_bodies_are_not_json() {
        let doctype = FetchResponse::new(StatusCode::OK, "  \n<!DOCTYPE html><html></html>");
        let html = FetchResponse::new(StatusCode::OK, "<HTML><body>login</body></HTML>");

        assert!(matches!(
            expect_json(&doctype),
            Err(ExtractError::MalformedResponse(_))
        ));
        assert!(matches!(
            expect_json(&html),
            Err(ExtractError::MalformedResponse(_))
        ));
    }

    #[test]
    fn login_marker_in_json_is_auth_required() {
        let response = FetchResponse::new(
            StatusCode::OK,
            r#"{"message":"login_required","status":"fail"}"#,
        );

        assert!(matches!(
            expect_json(&response),
            Err(ExtractError::AuthRequired(_))
        ));
    }

    #[test]
    fn statuses_map_to_errors() {
        let forbidden = FetchResponse::new(StatusCode::FORBIDDEN, "");
        let missing = FetchResponse::new(StatusCode::NOT_FOUND, "");
        let ok = FetchResponse::new(StatusCode::OK, "");

        assert!(matches!(
            check_status(&forbidden),
            Err(ExtractError::AuthRequired(_))
        ));
        assert!(matches!(
            check_status(&missing),
            Err(ExtractError::Http { status }) if status == StatusCode::NOT_FOUND
        ));
        assert!(check_status(&ok).is_ok());
    }

    #[test]
    fn chains_are_in_order() {
        let auth = authenticated_tiers().iter().map(|x| x.id()).collect::<Vec<_>>();
        let public = public_tiers().iter().map(|x| x.id()).collect::<Vec<_>>();

        assert_eq!(
            auth,
            [
                TierId::ApiMediaInfo,
                TierId::AuthenticatedPage,
                TierId::AuthenticatedGraphql
            ]
        );
        assert_eq!(
            public,
            [TierId::PublicGraphql, TierId::EmbedPage, TierId::PageScrape]
        );
    }
}
