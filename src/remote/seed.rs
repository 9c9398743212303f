//! Startup pull of the remote store into the receive directory.

use crate::path::{self, COMPRESSED_SUFFIX};
use crate::stage::STAGING_SUFFIX;
use crate::transport::Transport;
use crate::Result;
use flate2::read::GzDecoder;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use tracing::{error, info, warn};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub fetched: usize,
    pub failed: usize,
    /// True when the receive directory already had content.
    pub skipped: bool,
}

/// Populate `dest` from the remote store if it is missing or empty.
///
/// Listing failures are returned. Failures for individual files are logged
/// and counted; the remaining files are still fetched.
pub fn seed(transport: &dyn Transport, dest: &Path, progress: bool) -> Result<SeedReport> {
    if has_content(dest)? {
        info!("Receive directory {:?} is not empty, skipping initial sync", dest);
        return Ok(SeedReport { skipped: true, ..Default::default() });
    }
    fs::create_dir_all(dest)?;

    let names = transport.list()?;
    if names.is_empty() {
        info!("Remote store is empty, nothing to sync.");
        return Ok(SeedReport::default());
    }
    info!("Fetching {} remote files into {:?}", names.len(), dest);

    let pb = if progress {
        let pb = ProgressBar::new(names.len() as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
        {
            pb.set_style(style);
        }
        Some(pb)
    } else {
        None
    };

    let mut report = SeedReport::default();
    for name in &names {
        if let Some(pb) = &pb {
            pb.set_message(format!("Fetching {}", name));
        }
        match fetch_one(transport, dest, name) {
            Ok(()) => report.fetched += 1,
            Err(e) => {
                error!("Failed to fetch {}: {}", name, e);
                report.failed += 1;
            }
        }
        if let Some(pb) = &pb {
            pb.inc(1);
        }
    }
    if let Some(pb) = &pb {
        pb.finish_with_message("Done");
    }

    if report.failed > 0 {
        warn!("Initial sync fetched {} files, {} failed.", report.fetched, report.failed);
    } else {
        info!("Initial sync fetched {} files.", report.fetched);
    }
    Ok(report)
}

fn has_content(dir: &Path) -> Result<bool> {
    match fs::read_dir(dir) {
        Ok(mut entries) => Ok(entries.next().is_some()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

fn fetch_one(transport: &dyn Transport, dest: &Path, name: &str) -> Result<()> {
    // Objects we uploaded ourselves are gzip streams named `<path>.gz`.
    let (local_name, compressed) = match name.strip_suffix(COMPRESSED_SUFFIX) {
        Some(stripped) if !stripped.is_empty() && !stripped.ends_with('/') => (stripped, true),
        _ => (name, false),
    };
    let target = path::from_wire(dest, local_name)?;

    let raw = transport.fetch(name)?;
    let contents = if compressed {
        let mut out = Vec::new();
        GzDecoder::new(raw.as_slice()).read_to_end(&mut out)?;
        out
    } else {
        raw
    };

    let parent = target.parent().unwrap_or(dest);
    fs::create_dir_all(parent)?;

    // Written under a unique name and renamed into place, so a partial
    // download never shows up under the real name.
    let mut builder = tempfile::Builder::new();
    builder.prefix(".").suffix(STAGING_SUFFIX);
    #[cfg(unix)]
    {
        // Still masked by the umask, like a plain fs::write.
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(0o666));
    }
    let mut temp = builder.tempfile_in(parent)?;
    temp.write_all(&contents)?;
    temp.persist(&target).map_err(|e| e.error)?;
    Ok(())
}
