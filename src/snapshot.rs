//! Remembered view of the watch tree and the per-cycle diff against it.

use crate::scanner::{ContentHash, FileEntry};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// What decides that a file has changed since it was last synced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChangePolicy {
    /// Any modification time that differs from the recorded one.
    #[default]
    ModTime,
    /// Modification time, size or content digest differs.
    Checksum,
}

/// Last confirmed state of one file on the remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub mtime: SystemTime,
    pub size: u64,
    pub digest: Option<ContentHash>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum SyncAction {
    Upload(FileEntry),
    Delete(PathBuf),
}

/// Absolute path -> last confirmed record.
///
/// Every key is a file that was uploaded successfully and has not been
/// confirmed deleted since. Nothing is persisted across restarts.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    files: HashMap<PathBuf, FileRecord>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn get(&self, path: &Path) -> Option<&FileRecord> {
        self.files.get(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    /// Remember `entry` as present on the remote.
    pub fn record(&mut self, entry: &FileEntry) {
        self.files.insert(
            entry.path.clone(),
            FileRecord {
                mtime: entry.mtime,
                size: entry.size,
                digest: entry.digest,
            },
        );
    }

    /// Drop `path` once its remote copy is gone.
    pub fn forget(&mut self, path: &Path) -> Option<FileRecord> {
        self.files.remove(path)
    }

    /// Compare one scan against the snapshot.
    ///
    /// Uploads come first in scan order, followed by deletes for every known
    /// path the scan did not produce. Known paths at or below `skipped` were
    /// there but unreadable, so they are neither uploaded nor deleted. The
    /// snapshot itself is not touched.
    pub fn diff<I>(&self, entries: I, skipped: &[PathBuf], policy: ChangePolicy) -> Vec<SyncAction>
    where
        I: IntoIterator<Item = FileEntry>,
    {
        let mut actions = Vec::new();
        let mut seen = HashSet::new();

        for entry in entries {
            let needs_upload = match self.files.get(&entry.path) {
                None => true,
                // Inequality rather than "newer than": a clock that moved
                // backwards (restored backup, skew) is still a change.
                Some(record) if record.mtime != entry.mtime => true,
                Some(record) => {
                    policy == ChangePolicy::Checksum
                        && (record.size != entry.size || record.digest != entry.digest)
                }
            };

            seen.insert(entry.path.clone());
            if needs_upload {
                actions.push(SyncAction::Upload(entry));
            }
        }

        let mut deleted: Vec<&PathBuf> = self
            .files
            .keys()
            .filter(|path| !seen.contains(*path))
            .filter(|path| !skipped.iter().any(|s| path.starts_with(s)))
            .collect();
        deleted.sort();
        actions.extend(deleted.into_iter().cloned().map(SyncAction::Delete));

        actions
    }
}
