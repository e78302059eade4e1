use super::{Tier, TierContext, TierId};
use crate::{
    common::{headers::browser_headers, request::FetchRequest},
    error::ExtractResult,
    media::Media,
    parsers::parse_page_html,
};

/// The full post page, as a browser would load it
#[derive(Debug, Default)]
pub struct PageScrape;

#[async_trait::async_trait]
impl Tier for PageScrape {
    fn id(&self) -> TierId {
        TierId::PageScrape
    }

    async fn attempt(&self, ctx: &TierContext<'_>) -> ExtractResult<Media> {
        let request =
            FetchRequest::get(ctx.endpoints.post_page(ctx.shortcode)).with_headers(browser_headers());

        let response = ctx.fetch(request).await?;

        parse_page_html(&response.text(), ctx.shortcode)
    }
}
