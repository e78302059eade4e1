use std::{
    fmt::Debug,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use app_extractor::ItemKind;
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, trace, warn};

use crate::error::StorageError;

const PARTIAL_SUFFIX: &str = "part";
const MAX_NAME_ATTEMPTS: usize = 1000;

/// An entry that was started but is not visible yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEntry {
    pub kind: ItemKind,
    pub file_name: String,
    /// Where the storage keeps the bytes until the entry is committed
    pub staging_path: PathBuf,
}

/// Where downloaded bytes end up.
///
/// An entry only becomes visible on [`Storage::commit`]. Whoever created an
/// entry must [`Storage::rollback`] it if anything goes wrong before that.
#[async_trait::async_trait]
pub trait Storage: Debug + Send + Sync {
    async fn create(&self, kind: ItemKind, file_name: &str) -> Result<PendingEntry, StorageError>;

    async fn write(&self, entry: &PendingEntry, bytes: &[u8]) -> Result<(), StorageError>;

    async fn commit(&self, entry: PendingEntry) -> Result<PathBuf, StorageError>;

    async fn rollback(&self, entry: PendingEntry);

    /// Store a whole file in one go
    async fn save(
        &self,
        bytes: &[u8],
        kind: ItemKind,
        file_name: &str,
    ) -> Result<PathBuf, StorageError> {
        let entry = self.create(kind, file_name).await?;

        if let Err(e) = self.write(&entry, bytes).await {
            self.rollback(entry).await;
            return Err(e);
        }

        match self.commit(entry.clone()).await {
            Ok(x) => Ok(x),
            Err(e) => {
                self.rollback(entry).await;
                Err(e)
            }
        }
    }
}

/// Saves into a directory, optionally splitting images and videos into
/// sub-directories
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
    image_dir: Option<PathBuf>,
    video_dir: Option<PathBuf>,
}

impl FsStorage {
    #[must_use]
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            root: root.into(),
            image_dir: None,
            video_dir: None,
        }
    }

    #[must_use]
    pub fn with_subdirectories<P: Into<PathBuf>>(mut self, images: P, videos: P) -> Self {
        self.image_dir = Some(images.into());
        self.video_dir = Some(videos.into());
        self
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn dir_for(&self, kind: ItemKind) -> PathBuf {
        let sub = match kind {
            ItemKind::Image => self.image_dir.as_ref(),
            ItemKind::Video => self.video_dir.as_ref(),
        };

        match sub {
            Some(sub) => self.root.join(sub),
            None => self.root.clone(),
        }
    }

    /// `name` for the first attempt, `stem_<n>.ext` after that
    fn candidate_name(file_name: &str, n: usize) -> String {
        let (stem, ext) = match file_name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
            _ => (file_name, None),
        };

        match (n, ext) {
            (0, _) => file_name.to_string(),
            (n, Some(ext)) => format!("{stem}_{n}.{ext}"),
            (n, None) => format!("{stem}_{n}"),
        }
    }

    /// Link the finished partial file under the first free name.
    ///
    /// Creating a link fails when the name exists, so two commits can never
    /// claim the same path.
    async fn claim_free_path(dir: &Path, entry: &PendingEntry) -> Result<PathBuf, StorageError> {
        for n in 0..MAX_NAME_ATTEMPTS {
            let path = dir.join(Self::candidate_name(&entry.file_name, n));

            match fs::hard_link(&entry.staging_path, &path).await {
                Ok(()) => return Ok(path),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    trace!(?path, "Name taken, trying the next one");
                }
                Err(e) => return Err(StorageError::io("link", &path, e)),
            }
        }

        Err(StorageError::Other(format!(
            "no free name for {:?} in {dir:?}",
            entry.file_name
        )))
    }
}

#[async_trait::async_trait]
impl Storage for FsStorage {
    async fn create(&self, kind: ItemKind, file_name: &str) -> Result<PendingEntry, StorageError> {
        if file_name.is_empty() || file_name.contains(['/', '\\']) {
            return Err(StorageError::InvalidName(file_name.to_string()));
        }

        let dir = self.dir_for(kind);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| StorageError::io("create directory", &dir, e))?;

        let staging_path = dir.join(format!(
            ".{}.{}.{}",
            file_name,
            ulid::Ulid::new(),
            PARTIAL_SUFFIX
        ));
        trace!(?staging_path, "Creating partial file");

        fs::File::create(&staging_path)
            .await
            .map_err(|e| StorageError::io("create", &staging_path, e))?;

        Ok(PendingEntry {
            kind,
            file_name: file_name.to_string(),
            staging_path,
        })
    }

    async fn write(&self, entry: &PendingEntry, bytes: &[u8]) -> Result<(), StorageError> {
        let path = &entry.staging_path;

        let mut file = fs::OpenOptions::new()
            .append(true)
            .open(path)
            .await
            .map_err(|e| StorageError::io("open", path, e))?;

        file.write_all(bytes)
            .await
            .map_err(|e| StorageError::io("write", path, e))?;
        file.flush()
            .await
            .map_err(|e| StorageError::io("flush", path, e))?;

        Ok(())
    }

    async fn commit(&self, entry: PendingEntry) -> Result<PathBuf, StorageError> {
        let dir = self.dir_for(entry.kind);
        let target = Self::claim_free_path(&dir, &entry).await?;

        if let Err(e) = fs::remove_file(&entry.staging_path).await {
            warn!(?e, path = ?entry.staging_path, "Failed to remove partial file after commit");
        }
        debug!(?target, "Saved file");

        Ok(target)
    }

    async fn rollback(&self, entry: PendingEntry) {
        match fs::remove_file(&entry.staging_path).await {
            Ok(()) => trace!(path = ?entry.staging_path, "Removed partial file"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(?e, path = ?entry.staging_path, "Failed to remove partial file"),
        }
    }
}
