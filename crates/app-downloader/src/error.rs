use std::{io, path::PathBuf};

use app_extractor::TransportError;
use http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to {action} {path:?}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid file name: {0:?}")]
    InvalidName(String),

    #[error("{0}")]
    Other(String),
}

impl StorageError {
    pub fn io<P: Into<PathBuf>>(action: &'static str, path: P, source: io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }
}

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("request failed: {0}")]
    Transport(#[from] TransportError),

    #[error("unexpected HTTP status {status}")]
    Http { status: StatusCode },

    /// Usually an expired signed URL
    #[error("server sent an empty file")]
    EmptyPayload,

    #[error("could not save the file: {0}")]
    Storage(#[from] StorageError),
}

impl DownloadError {
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Transport(_) => "Network error".to_string(),
            Self::Http { status } => format!("Download failed with {status}"),
            Self::EmptyPayload => "The link returned an empty file".to_string(),
            Self::Storage(_) => "Could not save the file".to_string(),
        }
    }
}
