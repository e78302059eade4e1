use app_downloader::{BatchEvent, DownloadStatus};
use tokio::{
    sync::broadcast::{self, error::RecvError},
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};

/// Log task progress until the batch finishes
pub async fn log_events(mut events: broadcast::Receiver<BatchEvent>) {
    loop {
        let event = match events.recv().await {
            Ok(x) => x,
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Missed some task updates");
                continue;
            }
            Err(RecvError::Closed) => return,
        };

        match event {
            BatchEvent::TaskUpdated(task) => match task.status {
                DownloadStatus::Completed => {
                    info!(url = ?task.source_url, "{}", task.status_message);
                }
                DownloadStatus::Failed => {
                    error!(url = ?task.source_url, "{}", task.status_message);
                }
                DownloadStatus::Cancelled => {
                    warn!(url = ?task.source_url, "Cancelled");
                }
                status => {
                    debug!(
                        url = ?task.source_url,
                        %status,
                        progress = task.progress_percent,
                        "{}",
                        task.status_message
                    );
                }
            },
            BatchEvent::Finished(_) => return,
        }
    }
}

/// Wait for the reporter task. Returns whether it ended on its own.
pub async fn join(reporter: JoinHandle<()>) -> bool {
    match reporter.await {
        Ok(()) => true,
        Err(e) => {
            warn!(?e, "Event reporter stopped abnormally");
            false
        }
    }
}
