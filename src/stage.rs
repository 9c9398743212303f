//! Safe, compressed snapshots of files that may still be open for writing.
//!
//! A changed file is first copied to a sibling temporary so the compressor
//! never holds the original open while a writer appends to it. The copy is
//! gzipped into memory and removed before the payload goes anywhere; the
//! original file is never renamed, truncated or otherwise modified.

use crate::path;
use crate::transport::Transport;
use crate::Result;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::ffi::OsString;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Marker appended to staging copies. The scanner never reports these.
pub const STAGING_SUFFIX: &str = ".watchsync-tmp";

/// Compressed contents of one file at one instant, ready for a single upload.
#[derive(Debug, Clone)]
pub struct StagedPayload {
    /// Path relative to the watch root, `/`-separated
    pub relative_path: String,
    /// gzip stream of the file contents
    pub bytes: Vec<u8>,
}

impl StagedPayload {
    /// Name the payload is stored under remotely.
    pub fn remote_name(&self) -> String {
        path::remote_object_name(&self.relative_path)
    }
}

/// Unique sibling copy of `original`, removed when dropped.
///
/// The name is `.<file name>.<random>.watchsync-tmp`, so an existing file that
/// happens to end in the staging suffix is never reused or overwritten.
fn staging_copy(original: &Path) -> io::Result<NamedTempFile> {
    let name = original
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    let parent = match original.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut prefix = OsString::from(".");
    prefix.push(name);
    prefix.push(".");

    let mut temp = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(STAGING_SUFFIX)
        .tempfile_in(parent)?;
    io::copy(&mut File::open(original)?, temp.as_file_mut())?;
    Ok(temp)
}

pub struct Stager {
    root: PathBuf,
    level: Compression,
}

impl Stager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            level: Compression::default(),
        }
    }

    /// Copy, compress and describe `file` without touching the original.
    pub fn stage(&self, file: &Path) -> Result<StagedPayload> {
        let relative_path = path::relative_path(&self.root, file)?;

        let temp = staging_copy(file)?;
        let mut encoder = GzEncoder::new(Vec::new(), self.level);
        io::copy(&mut temp.reopen()?, &mut encoder)?;
        let bytes = encoder.finish()?;
        if let Err(e) = temp.close() {
            warn!("Failed to remove staging copy of {:?}: {}", file, e);
        }

        debug!("Staged {} ({} compressed bytes)", relative_path, bytes.len());
        Ok(StagedPayload {
            relative_path,
            bytes,
        })
    }

    /// Stage `file` and hand the payload to `transport`, returning the
    /// relative path that was uploaded.
    pub fn upload(&self, file: &Path, transport: &dyn Transport) -> Result<String> {
        let payload = self.stage(file)?;
        let relative_path = payload.relative_path.clone();
        transport.upload(payload)?;
        Ok(relative_path)
    }
}
