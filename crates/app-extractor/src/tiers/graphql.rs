use tracing::trace;

use super::{expect_json, Tier, TierContext, TierId};
use crate::{
    common::{
        headers::{authenticated_web_headers, web_api_headers},
        request::FetchRequest,
    },
    error::{ExtractError, ExtractResult},
    media::Media,
    parsers::parse_response,
};

const POST_QUERY_DOC_ID: &str = "25531498899829322";

/// The website's own GraphQL post query, with or without the session
#[derive(Debug)]
pub struct GraphqlQuery {
    authenticated: bool,
}

impl GraphqlQuery {
    #[must_use]
    pub const fn public() -> Self {
        Self {
            authenticated: false,
        }
    }

    #[must_use]
    pub const fn authenticated() -> Self {
        Self {
            authenticated: true,
        }
    }
}

fn query_form(shortcode: &str) -> ExtractResult<String> {
    let query_variables = serde_json::json!({
        "shortcode": shortcode,
        "fetch_comment_count": 0,
        "parent_comment_count": 0,
        "child_comment_count": 0,
        "fetch_like_count": 0,
        "fetch_tagged_user_count": null,
        "fetch_preview_comment_count": 2,
        "has_threaded_comments": true,
        "hoisted_comment_id": null,
        "hoisted_reply_id": null,
    });
    trace!("GraphQL Query Variables: {:?}", &query_variables);

    let query_variables_str = serde_json::to_string(&query_variables)
        .map_err(|e| ExtractError::malformed(format!("Failed to stringify json: {e}")))?;

    let mut q = form_urlencoded::Serializer::new(String::new());
    q.append_pair("variables", &query_variables_str);
    q.append_pair("server_timestamps", "true");
    q.append_pair("doc_id", POST_QUERY_DOC_ID);

    Ok(q.finish())
}

#[async_trait::async_trait]
impl Tier for GraphqlQuery {
    fn id(&self) -> TierId {
        if self.authenticated {
            TierId::AuthenticatedGraphql
        } else {
            TierId::PublicGraphql
        }
    }

    async fn attempt(&self, ctx: &TierContext<'_>) -> ExtractResult<Media> {
        let headers = if self.authenticated {
            authenticated_web_headers(ctx.require_credentials()?)
        } else {
            web_api_headers()
        };

        let request =
            FetchRequest::post_form(ctx.endpoints.graphql(), query_form(ctx.shortcode)?)
                .with_headers(headers);

        let response = ctx.fetch(request).await?;
        let doc = expect_json(&response)?;

        parse_response(&doc, ctx.shortcode)
    }
}
