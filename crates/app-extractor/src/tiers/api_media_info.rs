use app_helpers::encoding::shortcode_to_media_id;
use tracing::debug;

use super::{expect_json, Tier, TierContext, TierId};
use crate::{
    common::{headers::app_headers, request::FetchRequest},
    error::{ExtractError, ExtractResult},
    media::Media,
    parsers::parse_response,
};

/// Private app API, looked up by the numeric media id
#[derive(Debug, Default)]
pub struct ApiMediaInfo;

#[async_trait::async_trait]
impl Tier for ApiMediaInfo {
    fn id(&self) -> TierId {
        TierId::ApiMediaInfo
    }

    async fn attempt(&self, ctx: &TierContext<'_>) -> ExtractResult<Media> {
        let credentials = ctx.require_credentials()?;

        let media_id = shortcode_to_media_id(ctx.shortcode)
            .map_err(|e| ExtractError::malformed(format!("shortcode has no media id: {e}")))?;
        debug!(%media_id, "Converted shortcode to media id");

        let request = FetchRequest::get(ctx.endpoints.media_info(media_id))
            .with_headers(app_headers(credentials));

        let response = ctx.fetch(request).await?;
        let doc = expect_json(&response)?;

        parse_response(&doc, ctx.shortcode)
    }
}
