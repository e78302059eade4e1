use std::{fmt::Display, sync::Arc};

use app_extractor::{MediaSource, UrlRecognizer};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{broadcast, watch, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::executor::DownloadExecutor;

const EVENT_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStatus {
    Queued,
    Fetching,
    Downloading,
    Completed,
    Failed,
    Cancelled,
}

impl DownloadStatus {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    const fn rank(self) -> u8 {
        match self {
            Self::Queued => 0,
            Self::Fetching => 1,
            Self::Downloading => 2,
            Self::Completed | Self::Failed | Self::Cancelled => 3,
        }
    }

    /// Terminal states never change and non-terminal ones only move forward
    #[must_use]
    pub const fn can_become(self, next: Self) -> bool {
        !self.is_terminal() && next.rank() > self.rank()
    }
}

impl Display for DownloadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Queued => "queued",
            Self::Fetching => "fetching",
            Self::Downloading => "downloading",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };

        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadTask {
    pub id: String,
    pub source_url: String,
    pub shortcode: Option<String>,
    pub status: DownloadStatus,
    pub progress_percent: u8,
    pub status_message: String,
}

impl DownloadTask {
    fn new(source_url: String) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            shortcode: UrlRecognizer::shortcode_of(&source_url),
            source_url,
            status: DownloadStatus::Queued,
            progress_percent: 0,
            status_message: "Waiting".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchState {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: bool,
}

impl BatchState {
    #[must_use]
    pub const fn is_done(&self) -> bool {
        self.cancelled || (self.total > 0 && self.completed + self.failed >= self.total)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchEvent {
    TaskUpdated(DownloadTask),
    Finished(BatchState),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchSnapshot {
    pub state: BatchState,
    pub tasks: Vec<DownloadTask>,
}

#[derive(Debug)]
struct Batch {
    state: BatchState,
    tasks: Vec<DownloadTask>,
    finished: bool,
    cancel: CancellationToken,
}

impl Default for Batch {
    fn default() -> Self {
        Self {
            state: BatchState::default(),
            tasks: Vec::new(),
            finished: false,
            cancel: CancellationToken::new(),
        }
    }
}

#[derive(Debug)]
struct Shared {
    source: Arc<dyn MediaSource>,
    executor: DownloadExecutor,
    limiter: Option<Arc<Semaphore>>,
    batch: Mutex<Batch>,
    events: broadcast::Sender<BatchEvent>,
    done: watch::Sender<Option<BatchState>>,
}

impl Shared {
    fn emit(&self, event: BatchEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    /// Fire the finish signal once per batch. Must be called with the batch
    /// lock held.
    fn finish_if_done(&self, batch: &mut Batch) {
        if batch.finished || !batch.state.is_done() {
            return;
        }

        batch.finished = true;
        info!(state = ?batch.state, "Batch finished");

        self.emit(BatchEvent::Finished(batch.state));
        self.done.send_replace(Some(batch.state));
    }

    /// Apply a status change to a task. Returns `false` if the task is gone
    /// or already in a terminal state.
    fn update(&self, id: &str, status: DownloadStatus, progress: u8, message: String) -> bool {
        let mut batch = self.batch.lock();
        let batch = &mut *batch;

        let Some(task) = batch.tasks.iter_mut().find(|x| x.id == id) else {
            return false;
        };

        if task.status.is_terminal() || (task.status != status && !task.status.can_become(status)) {
            trace!(task_id = id, from = %task.status, to = %status, "Ignoring status change");
            return false;
        }

        task.status = status;
        task.progress_percent = progress.min(100);
        task.status_message = message;
        let task = task.clone();

        match status {
            DownloadStatus::Completed => batch.state.completed += 1,
            DownloadStatus::Failed => batch.state.failed += 1,
            _ => {}
        }

        self.emit(BatchEvent::TaskUpdated(task));
        self.finish_if_done(batch);

        true
    }

    fn progress(&self, id: &str, done: usize, total: usize) {
        let percent = if total == 0 { 100 } else { done * 100 / total };

        self.update(
            id,
            DownloadStatus::Downloading,
            u8::try_from(percent).unwrap_or(100),
            format!("Downloaded {done} of {total}"),
        );
    }

    #[tracing::instrument(skip(self, id, cancel), fields(task_id = %id))]
    async fn run_task(self: Arc<Self>, id: String, shortcode: String, cancel: CancellationToken) {
        let _permit = match &self.limiter {
            Some(limiter) => tokio::select! {
                () = cancel.cancelled() => return,
                permit = limiter.clone().acquire_owned() => permit.ok(),
            },
            None => None,
        };

        let work = async {
            self.update(&id, DownloadStatus::Fetching, 0, "Resolving post".to_string());

            let media = match self.source.resolve(&shortcode).await {
                Ok(x) => x,
                Err(e) => {
                    error!(error = %e, "Failed to resolve post");
                    return (DownloadStatus::Failed, e.user_message());
                }
            };

            let total = media.item_count();
            self.update(
                &id,
                DownloadStatus::Downloading,
                0,
                format!("Downloading {total} item(s)"),
            );

            let summary = self
                .executor
                .download_media(&media, &|done, total| self.progress(&id, done, total))
                .await;

            if summary.is_success() {
                (DownloadStatus::Completed, summary.message())
            } else {
                error!(message = %summary.message(), "Every download failed");
                (DownloadStatus::Failed, summary.message())
            }
        };

        let (status, message) = tokio::select! {
            biased;
            () = cancel.cancelled() => (DownloadStatus::Cancelled, "Cancelled".to_string()),
            x = work => x,
        };

        debug!(%status, ?message, "Task finished");
        self.update(&id, status, 100, message);
    }
}

/// Runs resolve-then-download pipelines for a batch of post links, tracking
/// the state of each and of the batch as a whole
#[derive(Debug, Clone)]
pub struct BatchCoordinator {
    shared: Arc<Shared>,
}

impl BatchCoordinator {
    #[must_use]
    pub fn new(source: Arc<dyn MediaSource>, executor: DownloadExecutor) -> Self {
        Self::build(source, executor, None)
    }

    /// Like [`BatchCoordinator::new`], keeping at most `max_concurrent` tasks
    /// running at once
    #[must_use]
    pub fn with_max_concurrent(
        source: Arc<dyn MediaSource>,
        executor: DownloadExecutor,
        max_concurrent: usize,
    ) -> Self {
        Self::build(
            source,
            executor,
            Some(Arc::new(Semaphore::new(max_concurrent.max(1)))),
        )
    }

    fn build(
        source: Arc<dyn MediaSource>,
        executor: DownloadExecutor,
        limiter: Option<Arc<Semaphore>>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (done, _) = watch::channel(None);

        Self {
            shared: Arc::new(Shared {
                source,
                executor,
                limiter,
                batch: Mutex::new(Batch::default()),
                events,
                done,
            }),
        }
    }

    /// Queue one task per URL and start them. Returns the new task ids.
    ///
    /// Joins the running batch, or starts a new one if the last batch has
    /// finished.
    pub fn submit_urls<I, S>(&self, urls: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut to_start = Vec::new();
        let mut ids = Vec::new();

        let cancel = {
            let mut batch = self.shared.batch.lock();

            if batch.finished {
                debug!("Previous batch finished, starting a new one");
                *batch = Batch::default();
                self.shared.done.send_replace(None);
            }

            for url in urls {
                let mut task = DownloadTask::new(url.into());
                batch.state.total += 1;

                match &task.shortcode {
                    Some(shortcode) => to_start.push((task.id.clone(), shortcode.clone())),
                    None => {
                        warn!(url = ?task.source_url, "Not a post link");
                        task.status = DownloadStatus::Failed;
                        task.status_message = "Not an Instagram post link".to_string();
                        batch.state.failed += 1;
                    }
                }

                info!(task_id = %task.id, url = ?task.source_url, "Queued task");
                ids.push(task.id.clone());
                self.shared.emit(BatchEvent::TaskUpdated(task.clone()));
                batch.tasks.push(task);
            }

            self.shared.finish_if_done(&mut batch);

            batch.cancel.clone()
        };

        for (id, shortcode) in to_start {
            tokio::spawn(self.shared.clone().run_task(id, shortcode, cancel.clone()));
        }

        ids
    }

    /// Queue every post link found in `text`
    pub fn submit_text(&self, text: &str) -> Vec<String> {
        let urls = UrlRecognizer::find_all(text);
        debug!(count = urls.len(), "Found post links in text");

        self.submit_urls(urls)
    }

    /// Stop every running task and end the batch right away
    pub fn cancel_all(&self) {
        let mut batch = self.shared.batch.lock();

        if batch.finished {
            return;
        }

        info!("Cancelling batch");
        batch.cancel.cancel();
        batch.state.cancelled = true;

        for task in &mut batch.tasks {
            if task.status.is_terminal() {
                continue;
            }

            task.status = DownloadStatus::Cancelled;
            task.status_message = "Cancelled".to_string();
            self.shared.emit(BatchEvent::TaskUpdated(task.clone()));
        }

        self.shared.finish_if_done(&mut batch);
    }

    #[must_use]
    pub fn snapshot(&self) -> BatchSnapshot {
        let batch = self.shared.batch.lock();

        BatchSnapshot {
            state: batch.state,
            tasks: batch.tasks.clone(),
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<BatchEvent> {
        self.shared.events.subscribe()
    }

    /// Wait for the current batch to finish. Returns right away when nothing
    /// was ever submitted.
    pub async fn wait_until_done(&self) -> BatchState {
        let mut done = self.shared.done.subscribe();

        loop {
            {
                let batch = self.shared.batch.lock();
                if batch.state.total == 0 && !batch.state.cancelled {
                    return batch.state;
                }
            }

            if let Some(state) = *done.borrow_and_update() {
                return state;
            }

            if done.changed().await.is_err() {
                return self.snapshot().state;
            }
        }
    }
}
