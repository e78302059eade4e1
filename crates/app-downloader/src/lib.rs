pub mod batch;
pub mod error;
pub mod executor;
pub mod naming;
pub mod storage;

pub use batch::{BatchCoordinator, BatchEvent, BatchSnapshot, BatchState, DownloadStatus, DownloadTask};
pub use error::{DownloadError, StorageError};
pub use executor::{DownloadExecutor, DownloadSummary, Outcome};
pub use storage::{FsStorage, PendingEntry, Storage};
