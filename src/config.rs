use crate::snapshot::ChangePolicy;
use crate::transport::http::DEFAULT_TIMEOUT;
use crate::{Result, WatchSyncError};
use clap::Parser;
use reqwest::Url;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "config.json";
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// JSON config file [default: config.json, if present]
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Base URL of the remote store
    #[arg(long, value_name = "URL")]
    pub url: Option<String>,

    /// Directory to watch
    #[arg(short, long, value_name = "DIR")]
    pub watch: Option<PathBuf>,

    /// Directory to populate from the remote store on startup
    #[arg(short, long, value_name = "DIR")]
    pub receive: Option<PathBuf>,

    /// Seconds between scans
    #[arg(long, value_name = "SECS")]
    pub interval: Option<u64>,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Exclude patterns (gitignore style)
    #[arg(short, long)]
    pub exclude: Vec<String>,

    /// Do not descend more than N directories below the watch root
    #[arg(long, value_name = "N")]
    pub max_depth: Option<usize>,

    /// Also compare size and content hash, not just mod-time
    #[arg(short = 'c', long, default_value_t = false)]
    pub checksum: bool,

    /// Run a single cycle and exit
    #[arg(long, default_value_t = false)]
    pub once: bool,

    /// Skip the initial pull into the receive directory
    #[arg(long, default_value_t = false)]
    pub no_seed: bool,

    /// Show progress during the initial pull
    #[arg(short = 'P', long, default_value_t = false)]
    pub progress: bool,

    /// Suppress non-error messages
    #[arg(short, long, default_value_t = false, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Increase verbosity
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

/// On-disk configuration. Every field can be overridden from the command line.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub url: Option<String>,
    pub folder_to_watch: Option<PathBuf>,
    pub receive_folder: Option<PathBuf>,
    pub interval_secs: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub exclude: Vec<String>,
    pub checksum: bool,
    pub max_depth: Option<usize>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| WatchSyncError::Config(format!("Cannot read {:?}: {}", path, e)))?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Validated settings, fixed for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct Config {
    pub url: Url,
    /// Canonical absolute path
    pub watch_root: PathBuf,
    pub receive_dir: Option<PathBuf>,
    pub interval: Duration,
    pub timeout: Duration,
    pub excludes: Vec<String>,
    pub policy: ChangePolicy,
    pub max_depth: Option<usize>,
}

impl Config {
    /// Load the config file named by `args` (or `config.json` if it exists)
    /// and apply command-line overrides.
    pub fn resolve(args: &Args) -> Result<Self> {
        let file = match &args.config {
            Some(path) => ConfigFile::load(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                ConfigFile::load(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => ConfigFile::default(),
        };
        Self::merge(file, args)
    }

    pub fn merge(file: ConfigFile, args: &Args) -> Result<Self> {
        let url = args
            .url
            .clone()
            .or(file.url)
            .ok_or_else(|| WatchSyncError::Config("No remote URL configured".into()))?;
        let url = Url::parse(&url)
            .map_err(|e| WatchSyncError::Config(format!("Invalid URL {:?}: {}", url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(WatchSyncError::Config(format!("Unsupported URL scheme: {}", url.scheme())));
        }

        let watch = args
            .watch
            .clone()
            .or(file.folder_to_watch)
            .ok_or_else(|| WatchSyncError::Config("No folder to watch configured".into()))?;
        let watch_root = watch
            .canonicalize()
            .map_err(|e| WatchSyncError::Config(format!("Watch folder {:?}: {}", watch, e)))?;
        if !watch_root.is_dir() {
            return Err(WatchSyncError::Config(format!("Watch folder {:?} is not a directory", watch)));
        }

        let interval = seconds("interval", args.interval.or(file.interval_secs), DEFAULT_INTERVAL)?;
        let timeout = seconds("timeout", args.timeout.or(file.timeout_secs), DEFAULT_TIMEOUT)?;

        let mut excludes = file.exclude;
        excludes.extend(args.exclude.iter().cloned());

        let policy = if args.checksum || file.checksum {
            ChangePolicy::Checksum
        } else {
            ChangePolicy::ModTime
        };

        Ok(Self {
            url,
            watch_root,
            receive_dir: args.receive.clone().or(file.receive_folder),
            interval,
            timeout,
            excludes,
            policy,
            max_depth: args.max_depth.or(file.max_depth),
        })
    }
}

fn seconds(name: &str, value: Option<u64>, default: Duration) -> Result<Duration> {
    match value {
        None => Ok(default),
        Some(0) => Err(WatchSyncError::Config(format!("{} must be at least one second", name))),
        Some(secs) => Ok(Duration::from_secs(secs)),
    }
}
