use crate::config::Config;
use crate::path;
use crate::scanner::{LocalScanner, Scanner};
use crate::shutdown::Shutdown;
use crate::snapshot::{ChangePolicy, SnapshotStore, SyncAction};
use crate::stage::Stager;
use crate::transport::Transport;
use crate::Result;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Scanning,
    Diffing,
    Syncing,
}

/// Outcome of one scan-diff-sync pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub uploaded: usize,
    pub deleted: usize,
    pub failed: usize,
    pub unchanged: usize,
    /// Present but unreadable this cycle, left as last synced
    pub skipped: usize,
}

impl CycleReport {
    pub fn is_quiet(&self) -> bool {
        self.uploaded == 0 && self.deleted == 0 && self.failed == 0
    }
}

/// Polls a directory tree and mirrors what changed to a [`Transport`].
///
/// The engine owns the snapshot outright. A path is recorded only after its
/// upload was confirmed and forgotten only after its delete was confirmed, so
/// anything that failed is simply picked up again by the next cycle.
pub struct SyncEngine<T: Transport> {
    root: PathBuf,
    scanner: Box<dyn Scanner>,
    snapshot: SnapshotStore,
    stager: Stager,
    transport: T,
    policy: ChangePolicy,
    interval: Duration,
    shutdown: Shutdown,
    phase: Phase,
}

impl<T: Transport> SyncEngine<T> {
    pub fn new(root: impl AsRef<Path>, transport: T) -> Result<Self> {
        let root = root.as_ref().canonicalize()?;
        Ok(Self {
            stager: Stager::new(&root),
            root,
            scanner: Box::new(LocalScanner::new(vec![])),
            snapshot: SnapshotStore::new(),
            transport,
            policy: ChangePolicy::default(),
            interval: crate::config::DEFAULT_INTERVAL,
            shutdown: Shutdown::new(),
            phase: Phase::Idle,
        })
    }

    pub fn from_config(config: &Config, transport: T) -> Result<Self> {
        let scanner = LocalScanner::new(config.excludes.clone())
            .with_checksum(config.policy == ChangePolicy::Checksum)
            .with_max_depth(config.max_depth);

        Ok(Self::new(&config.watch_root, transport)?
            .with_scanner(scanner)
            .with_policy(config.policy)
            .with_interval(config.interval))
    }

    pub fn with_scanner(mut self, scanner: impl Scanner + 'static) -> Self {
        self.scanner = Box::new(scanner);
        self
    }

    pub fn with_policy(mut self, policy: ChangePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn snapshot(&self) -> &SnapshotStore {
        &self.snapshot
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Run one cycle.
    ///
    /// Only a failed scan is returned as an error, and it leaves the snapshot
    /// untouched. Per-file failures are logged and counted in the report.
    pub fn run_cycle(&mut self) -> Result<CycleReport> {
        let result = self.sync_once();
        self.phase = Phase::Idle;
        result
    }

    fn sync_once(&mut self) -> Result<CycleReport> {
        self.phase = Phase::Scanning;
        let manifest = self.scanner.scan(&self.root)?;
        let scanned = manifest.entries.len();

        self.phase = Phase::Diffing;
        let actions = self
            .snapshot
            .diff(manifest.entries, &manifest.skipped, self.policy);
        let changed = actions
            .iter()
            .filter(|a| matches!(a, SyncAction::Upload(_)))
            .count();
        debug!(
            "Scanned {} files: {} changed, {} deleted, {} unreadable",
            scanned,
            changed,
            actions.len() - changed,
            manifest.skipped.len()
        );

        self.phase = Phase::Syncing;
        let mut report = CycleReport {
            unchanged: scanned - changed,
            skipped: manifest.skipped.len(),
            ..Default::default()
        };
        for action in actions {
            if self.shutdown.is_requested() {
                warn!("Shutdown requested, leaving the rest of this cycle for next start");
                break;
            }
            match action {
                SyncAction::Upload(entry) => match self.stager.upload(&entry.path, &self.transport) {
                    Ok(relative) => {
                        info!("Uploaded {}", relative);
                        self.snapshot.record(&entry);
                        report.uploaded += 1;
                    }
                    Err(e) => {
                        error!("Failed to upload file {:?}: {}", entry.path, e);
                        report.failed += 1;
                    }
                },
                SyncAction::Delete(file) => {
                    let relative = match path::relative_path(&self.root, &file) {
                        Ok(relative) => relative,
                        Err(e) => {
                            // Cannot be addressed remotely, so it can never be deleted either.
                            error!("Dropping {:?} from snapshot: {}", file, e);
                            self.snapshot.forget(&file);
                            report.failed += 1;
                            continue;
                        }
                    };
                    match self.transport.delete(&relative) {
                        Ok(()) => {
                            info!("Deleted {}", relative);
                            self.snapshot.forget(&file);
                            report.deleted += 1;
                        }
                        Err(e) => {
                            error!("Failed to delete file {} on server: {}", relative, e);
                            report.failed += 1;
                        }
                    }
                }
            }
        }

        Ok(report)
    }

    /// Poll until shutdown is requested.
    pub fn run(&mut self) {
        info!("Watching {:?} every {:?}", self.root, self.interval);
        loop {
            match self.run_cycle() {
                Ok(report) if report.is_quiet() => debug!("No changes ({} files).", report.unchanged),
                Ok(report) => info!(
                    "Cycle done: {} uploaded, {} deleted, {} failed.",
                    report.uploaded, report.deleted, report.failed
                ),
                Err(e) => error!("Scan of {:?} failed, skipping cycle: {}", self.root, e),
            }

            if self.shutdown.wait(self.interval) {
                info!("Shutdown requested, stopping.");
                return;
            }
        }
    }
}
