use super::{expect_json, Tier, TierContext, TierId};
use crate::{
    common::{headers::authenticated_web_headers, request::FetchRequest},
    error::ExtractResult,
    media::Media,
    parsers::parse_response,
};

/// The post page asked for its JSON form, with the session cookies
#[derive(Debug, Default)]
pub struct AuthenticatedPage;

#[async_trait::async_trait]
impl Tier for AuthenticatedPage {
    fn id(&self) -> TierId {
        TierId::AuthenticatedPage
    }

    async fn attempt(&self, ctx: &TierContext<'_>) -> ExtractResult<Media> {
        let credentials = ctx.require_credentials()?;

        let request = FetchRequest::get(ctx.endpoints.post_info(ctx.shortcode))
            .with_headers(authenticated_web_headers(credentials));

        let response = ctx.fetch(request).await?;
        let doc = expect_json(&response)?;

        parse_response(&doc, ctx.shortcode)
    }
}
