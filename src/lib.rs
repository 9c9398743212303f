pub mod config;
pub mod engine;
pub mod error;
pub mod path;
pub mod remote;
pub mod scanner;
pub mod shutdown;
pub mod snapshot;
pub mod stage;
pub mod transport;

pub use error::WatchSyncError;
pub type Result<T> = std::result::Result<T, WatchSyncError>;
