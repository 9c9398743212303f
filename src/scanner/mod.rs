use std::path::{Path, PathBuf};
use std::time::SystemTime;
use crate::Result;

pub mod local;

pub use local::LocalScanner;

/// BLAKE3 digest of a file's contents
pub type ContentHash = [u8; 32];

/// A regular file observed during a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Absolute path
    pub path: PathBuf,
    /// Modification time
    pub mtime: SystemTime,
    /// File size (bytes)
    pub size: u64,
    /// Content digest, only computed in checksum mode
    pub digest: Option<ContentHash>,
}

/// One item produced by a walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scanned {
    File(FileEntry),
    /// A file or directory that exists but could not be read this time
    Unreadable(PathBuf),
}

/// Result of one scan
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    /// Root the entries were collected under
    pub root_path: PathBuf,
    /// Regular files, in traversal order
    pub entries: Vec<FileEntry>,
    /// Paths that failed to read; whatever lies at or below them keeps its
    /// last synced state
    pub skipped: Vec<PathBuf>,
}

/// Scanner trait
pub trait Scanner {
    /// Scan directory and return manifest
    fn scan(&mut self, path: &Path) -> Result<Manifest>;
}
