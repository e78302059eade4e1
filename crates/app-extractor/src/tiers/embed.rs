use super::{Fallback, Tier, TierContext, TierId};
use crate::{
    common::{headers::browser_headers, request::FetchRequest},
    error::{ExtractError, ExtractResult},
    media::Media,
    parsers::parse_embed_html,
};

/// The embeddable version of the post page
#[derive(Debug, Default)]
pub struct EmbedPage;

#[async_trait::async_trait]
impl Tier for EmbedPage {
    fn id(&self) -> TierId {
        TierId::EmbedPage
    }

    async fn attempt(&self, ctx: &TierContext<'_>) -> ExtractResult<Media> {
        let request =
            FetchRequest::get(ctx.endpoints.embed_page(ctx.shortcode)).with_headers(browser_headers());

        let response = ctx.fetch(request).await?;

        parse_embed_html(&response.text(), ctx.shortcode)
    }

    fn fallback(&self, error: &ExtractError) -> Fallback {
        match error {
            ExtractError::EmbedDisabled => Fallback::SkipTo(TierId::PageScrape),
            _ => Fallback::Next,
        }
    }
}
