use crate::scanner::{ContentHash, FileEntry, Manifest, Scanned, Scanner};
use crate::stage::STAGING_SUFFIX;
use crate::{Result, WatchSyncError};
use ignore::overrides::OverrideBuilder;
use ignore::WalkBuilder;
use std::fs::File;
use std::io;
use std::path::Path;
use tracing::warn;

pub struct LocalScanner {
    excludes: Vec<String>,
    checksum: bool,
    max_depth: Option<usize>,
}

impl LocalScanner {
    pub fn new(excludes: Vec<String>) -> Self {
        Self {
            excludes,
            checksum: false,
            max_depth: None,
        }
    }

    /// Attach a BLAKE3 digest to every entry.
    pub fn with_checksum(mut self, checksum: bool) -> Self {
        self.checksum = checksum;
        self
    }

    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Lazily walk `root`, yielding every regular file below it.
    ///
    /// A file or directory that exists but cannot be read is yielded as
    /// [`Scanned::Unreadable`] instead of being left out, so one permission
    /// problem or busy file is never mistaken for a deletion. Entries that
    /// disappear mid-walk are simply gone.
    pub fn walk(&self, root: &Path) -> Result<impl Iterator<Item = Scanned>> {
        let mut builder = WalkBuilder::new(root);
        builder
            .hidden(false)
            .ignore(false)
            .parents(false)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .follow_links(false) // symlink cycles cannot trap the walk
            .max_depth(self.max_depth);

        let mut overrides = OverrideBuilder::new(root);
        // Staging copies live next to their originals for the duration of an upload.
        overrides.add(&format!("!*{}", STAGING_SUFFIX))?;
        for pattern in &self.excludes {
            // To ignore a pattern, we add it prefixed with "!" in OverrideBuilder
            overrides
                .add(&format!("!{}", pattern))
                .map_err(|e| WatchSyncError::Config(format!("bad exclude {:?}: {}", pattern, e)))?;
        }
        builder.overrides(overrides.build()?);

        let checksum = self.checksum;
        Ok(builder.build().filter_map(move |result| {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) if is_not_found(err.io_error()) => return None,
                Err(err) => {
                    warn!("Scan error: {}", err);
                    return error_path(&err).map(|p| Scanned::Unreadable(p.to_path_buf()));
                }
            };
            if !entry.file_type().map_or(false, |t| t.is_file()) {
                return None;
            }

            let path = entry.path();
            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(e) if is_not_found(e.io_error()) => return None,
                Err(e) => {
                    warn!("Failed to get metadata for {:?}: {}", path, e);
                    return Some(Scanned::Unreadable(path.to_path_buf()));
                }
            };
            let mtime = match metadata.modified() {
                Ok(t) => t,
                Err(e) => {
                    warn!("No modification time for {:?}: {}", path, e);
                    return Some(Scanned::Unreadable(path.to_path_buf()));
                }
            };
            let digest = if checksum {
                match hash_file(path) {
                    Ok(digest) => Some(digest),
                    Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
                    Err(e) => {
                        warn!("Failed to hash {:?}: {}", path, e);
                        return Some(Scanned::Unreadable(path.to_path_buf()));
                    }
                }
            } else {
                None
            };

            Some(Scanned::File(FileEntry {
                path: path.to_path_buf(),
                mtime,
                size: metadata.len(),
                digest,
            }))
        }))
    }
}

/// Path an `ignore` error is about, if it names one.
fn error_path(err: &ignore::Error) -> Option<&Path> {
    match err {
        ignore::Error::WithPath { path, .. } => Some(path.as_path()),
        ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => {
            error_path(err)
        }
        _ => None,
    }
}

fn is_not_found(err: Option<&io::Error>) -> bool {
    err.map_or(false, |e| e.kind() == io::ErrorKind::NotFound)
}

impl Scanner for LocalScanner {
    fn scan(&mut self, path: &Path) -> Result<Manifest> {
        // An unmounted or deleted root must fail the scan rather than look like
        // an empty tree, which would turn every known file into a delete.
        if !std::fs::metadata(path)?.is_dir() {
            return Err(WatchSyncError::Config(format!("{:?} is not a directory", path)));
        }

        let mut manifest = Manifest {
            root_path: path.to_path_buf(),
            ..Default::default()
        };
        for item in self.walk(path)? {
            match item {
                Scanned::File(entry) => manifest.entries.push(entry),
                Scanned::Unreadable(skipped) => manifest.skipped.push(skipped),
            }
        }
        Ok(manifest)
    }
}

fn hash_file(path: &Path) -> io::Result<ContentHash> {
    let mut hasher = blake3::Hasher::new();
    hasher.update_reader(File::open(path)?)?;
    Ok(*hasher.finalize().as_bytes())
}
