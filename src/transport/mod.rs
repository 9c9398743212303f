use crate::Result;
use crate::stage::StagedPayload;

pub mod http;

pub use http::HttpTransport;

/// Remote blob store addressed by `/`-separated relative paths.
///
/// Every operation either succeeds or reports why; callers decide whether a
/// failure is worth retrying.
pub trait Transport {
    /// Create or replace the remote copy of `payload.relative_path`.
    /// The payload is consumed; a failed upload is restaged next cycle.
    fn upload(&self, payload: StagedPayload) -> Result<()>;
    /// Remove the remote copy of the file at `relative_path`.
    fn delete(&self, relative_path: &str) -> Result<()>;
    /// Names of every object the store holds.
    fn list(&self) -> Result<Vec<String>>;
    /// Raw bytes of one object, by a name returned from `list`.
    fn fetch(&self, name: &str) -> Result<Vec<u8>>;
    /// Check that the store answers at all.
    fn probe(&self) -> Result<()>;
}
