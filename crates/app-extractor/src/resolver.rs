use std::{fmt::Debug, sync::Arc};

use tracing::{debug, info, warn};

use crate::{
    common::{
        credentials::{CredentialStore, Credentials},
        request::Transport,
    },
    error::{ExtractError, ExtractResult},
    media::{Media, MediaKind},
    tiers::{authenticated_tiers, public_tiers, Endpoints, Fallback, Tier, TierContext},
};

/// Anything that can turn a shortcode into a [`Media`]
#[async_trait::async_trait]
pub trait MediaSource: Debug + Send + Sync {
    async fn resolve(&self, shortcode: &str) -> ExtractResult<Media>;
}

/// Runs the resolution chain: the authenticated tiers when a valid session
/// is stored, then the public ones
#[derive(Debug)]
pub struct MediaResolver {
    transport: Arc<dyn Transport>,
    credentials: Arc<dyn CredentialStore>,
    endpoints: Endpoints,
    authenticated_tiers: Vec<Box<dyn Tier>>,
    public_tiers: Vec<Box<dyn Tier>>,
}

impl MediaResolver {
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        credentials: Arc<dyn CredentialStore>,
        endpoints: Endpoints,
    ) -> Self {
        Self::with_tiers(
            transport,
            credentials,
            endpoints,
            authenticated_tiers(),
            public_tiers(),
        )
    }

    #[must_use]
    pub fn with_tiers(
        transport: Arc<dyn Transport>,
        credentials: Arc<dyn CredentialStore>,
        endpoints: Endpoints,
        authenticated_tiers: Vec<Box<dyn Tier>>,
        public_tiers: Vec<Box<dyn Tier>>,
    ) -> Self {
        Self {
            transport,
            credentials,
            endpoints,
            authenticated_tiers,
            public_tiers,
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn resolve(&self, shortcode: &str) -> ExtractResult<Media> {
        if shortcode.is_empty() {
            return Err(ExtractError::malformed("empty shortcode"));
        }

        let credentials = self.credentials.valid();
        let mut last_error = None;

        if let Some(credentials) = &credentials {
            debug!("Valid session found, trying authenticated tiers");

            let ctx = self.context(shortcode, Some(credentials));
            match run_chain(&self.authenticated_tiers, &ctx).await {
                Ok(media) => return Ok(media),
                Err(e) => {
                    warn!(error = ?e, "Authenticated tiers exhausted, falling back to public access");
                    last_error = e;
                }
            }
        }

        let ctx = self.context(shortcode, None);
        match run_chain(&self.public_tiers, &ctx).await {
            Ok(media) => return Ok(media),
            Err(e) => last_error = e.or(last_error),
        }

        let source = last_error.unwrap_or_else(|| ExtractError::malformed("no tiers to try"));
        warn!(error = %source, "Every tier failed");

        Err(ExtractError::ResolutionExhausted {
            shortcode: shortcode.to_string(),
            source: Box::new(source),
        })
    }

    fn context<'a>(
        &'a self,
        shortcode: &'a str,
        credentials: Option<&'a Credentials>,
    ) -> TierContext<'a> {
        TierContext {
            shortcode,
            credentials,
            transport: self.transport.as_ref(),
            endpoints: &self.endpoints,
        }
    }
}

#[async_trait::async_trait]
impl MediaSource for MediaResolver {
    async fn resolve(&self, shortcode: &str) -> ExtractResult<Media> {
        Self::resolve(self, shortcode).await
    }
}

/// Reject results a caller could not download
fn ensure_resolved(media: Media) -> ExtractResult<Media> {
    match media.kind {
        MediaKind::Video if media.video_url.is_none() => Err(ExtractError::NoPlayableSource),
        MediaKind::Carousel if media.items.is_empty() => {
            Err(ExtractError::malformed("carousel without items"))
        }
        MediaKind::Image if !media.has_display_url() => {
            Err(ExtractError::malformed("no display url found"))
        }
        _ => Ok(media),
    }
}

/// Try the tiers in order until one produces media. Errors carry the last
/// tier failure, if any tier ran.
async fn run_chain(
    tiers: &[Box<dyn Tier>],
    ctx: &TierContext<'_>,
) -> Result<Media, Option<ExtractError>> {
    let mut last_error = None;
    let mut i = 0;

    while let Some(tier) = tiers.get(i) {
        debug!(tier = %tier.id(), "Attempting tier");

        let err = match tier.attempt(ctx).await.and_then(ensure_resolved) {
            Ok(media) => {
                info!(tier = %tier.id(), kind = ?media.kind, items = media.item_count(), "Resolved media");
                return Ok(media);
            }
            Err(e) => e,
        };

        warn!(tier = %tier.id(), error = %err, "Tier failed");

        i = match tier.fallback(&err) {
            Fallback::Next => i + 1,
            Fallback::SkipTo(target) => tiers
                .iter()
                .skip(i + 1)
                .position(|x| x.id() == target)
                .map_or(i + 1, |pos| i + 1 + pos),
        };

        last_error = Some(err);
    }

    Err(last_error)
}
