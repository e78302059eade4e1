use std::{path::PathBuf, sync::Arc, time::Duration};

use app_extractor::{
    common::headers::browser_headers, FetchRequest, ItemKind, Media, MediaKind, Transport,
};
use tracing::{debug, info, trace, warn};

use crate::{
    error::DownloadError,
    naming::{extension_for, file_name, media_file_stem},
    storage::Storage,
};

/// Result of downloading one item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success(PathBuf),
    Error(String),
}

impl Outcome {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Per-item outcomes of downloading all of a post's files
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadSummary {
    pub outcomes: Vec<Outcome>,
}

impl DownloadSummary {
    #[must_use]
    pub fn saved(&self) -> usize {
        self.outcomes.iter().filter(|x| x.is_success()).count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.saved()
    }

    /// Succeeds as long as at least one item was saved
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.saved() > 0
    }

    #[must_use]
    pub fn saved_paths(&self) -> Vec<PathBuf> {
        self.outcomes
            .iter()
            .filter_map(|x| match x {
                Outcome::Success(path) => Some(path.clone()),
                Outcome::Error(_) => None,
            })
            .collect()
    }

    #[must_use]
    pub fn message(&self) -> String {
        let saved = self.saved();
        let failed = self.failed();

        if failed == 0 {
            return format!("All {saved} saved");
        }

        if saved == 0 {
            let first_error = self.outcomes.iter().find_map(|x| match x {
                Outcome::Error(e) => Some(e.as_str()),
                Outcome::Success(_) => None,
            });

            return match first_error {
                Some(e) if failed == 1 => e.to_string(),
                _ => format!("All {failed} failed"),
            };
        }

        format!("{saved} saved, {failed} failed")
    }
}

/// One file to fetch for a post
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadItem {
    pub url: String,
    pub kind: ItemKind,
    pub stem: String,
}

/// Every file a download of `media` has to fetch, in order
#[must_use]
pub fn download_items(media: &Media) -> Vec<DownloadItem> {
    match media.kind {
        MediaKind::Carousel => media
            .items
            .iter()
            .enumerate()
            .map(|(i, item)| DownloadItem {
                url: item.download_url().to_string(),
                kind: item.kind,
                stem: media_file_stem(media, Some(i)),
            })
            .collect(),
        MediaKind::Video => vec![DownloadItem {
            url: media.video_url.clone().unwrap_or_default(),
            kind: ItemKind::Video,
            stem: media_file_stem(media, None),
        }],
        MediaKind::Image => vec![DownloadItem {
            url: media.display_url.clone(),
            kind: ItemKind::Image,
            stem: media_file_stem(media, None),
        }],
    }
}

/// Fetches media files and hands them to the storage
#[derive(Debug, Clone)]
pub struct DownloadExecutor {
    transport: Arc<dyn Transport>,
    storage: Arc<dyn Storage>,
    item_delay: Duration,
}

impl DownloadExecutor {
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        storage: Arc<dyn Storage>,
        item_delay: Duration,
    ) -> Self {
        Self {
            transport,
            storage,
            item_delay,
        }
    }

    pub async fn download_image(&self, url: &str, name: &str) -> Outcome {
        self.download_outcome(url, ItemKind::Image, name).await
    }

    pub async fn download_video(&self, url: &str, name: &str) -> Outcome {
        self.download_outcome(url, ItemKind::Video, name).await
    }

    async fn download_outcome(&self, url: &str, kind: ItemKind, name: &str) -> Outcome {
        match self.download(url, kind, name).await {
            Ok(path) => Outcome::Success(path),
            Err(e) => {
                warn!(error = %e, ?url, "Download failed");
                Outcome::Error(e.user_message())
            }
        }
    }

    /// Fetch one file and store it as `<stem>.<sniffed extension>`
    pub async fn download(
        &self,
        url: &str,
        kind: ItemKind,
        stem: &str,
    ) -> Result<PathBuf, DownloadError> {
        trace!(?url, %kind, "Fetching file");

        let request = FetchRequest::get(url).with_headers(browser_headers());
        let response = self.transport.fetch(request).await?;

        if !response.is_success() {
            return Err(DownloadError::Http {
                status: response.status,
            });
        }

        if response.body.is_empty() {
            return Err(DownloadError::EmptyPayload);
        }

        if kind == ItemKind::Image && !infer::is_image(&response.body) {
            warn!(
                ?url,
                content_type = ?response.content_type,
                "Payload is not a known image format, saving it as is"
            );
        }

        let extension = extension_for(&response.body, response.content_type.as_deref(), url, kind);
        let name = file_name(stem, &extension);

        let entry = self.storage.create(kind, &name).await?;

        if let Err(e) = self.storage.write(&entry, &response.body).await {
            self.storage.rollback(entry).await;
            return Err(e.into());
        }

        match self.storage.commit(entry.clone()).await {
            Ok(path) => Ok(path),
            Err(e) => {
                self.storage.rollback(entry).await;
                Err(e.into())
            }
        }
    }

    /// Download every file of a post in order, waiting the configured delay
    /// between items. `progress` gets `(finished, total)` after every item.
    #[tracing::instrument(skip(self, media, progress), fields(shortcode = %media.shortcode))]
    pub async fn download_media(
        &self,
        media: &Media,
        progress: &(dyn Fn(usize, usize) + Send + Sync),
    ) -> DownloadSummary {
        let items = download_items(media);
        let total = items.len();
        let mut summary = DownloadSummary::default();

        debug!(total, "Downloading media items");

        for (i, item) in items.into_iter().enumerate() {
            if i > 0 && !self.item_delay.is_zero() {
                trace!(delay = ?self.item_delay, "Waiting before next item");
                tokio::time::sleep(self.item_delay).await;
            }

            let outcome = if item.url.is_empty() {
                Outcome::Error("Missing download link".to_string())
            } else {
                self.download_outcome(&item.url, item.kind, &item.stem).await
            };

            summary.outcomes.push(outcome);
            progress(i + 1, total);
        }

        info!(message = %summary.message(), "Finished downloading media");

        summary
    }
}
