use thiserror::Error;
use std::path::PathBuf;

#[derive(Debug, Error)]
pub enum WatchSyncError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Path {path:?} is not inside watch root {root:?}")]
    PathOutsideRoot { path: PathBuf, root: PathBuf },

    #[error("Invalid remote file name: {0:?}")]
    InvalidRemoteName(String),

    #[error("{operation} failed with status: {status}")]
    Status { operation: &'static str, status: u16 },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Walk error: {0}")]
    Walk(#[from] ignore::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WatchSyncError {
    /// Errors that a later cycle may not hit again (I/O races with writers,
    /// network hiccups, non-200 replies). Everything else points at bad input.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::Walk(_) | Self::Http(_) | Self::Status { .. } | Self::Protocol(_)
        )
    }
}
