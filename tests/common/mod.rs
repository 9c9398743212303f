#![allow(dead_code)]

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::collections::{BTreeMap, HashSet};
use std::io::{Read, Write};
use std::sync::Mutex;
use watchsync::stage::StagedPayload;
use watchsync::transport::Transport;
use watchsync::{Result, WatchSyncError};

/// Records every call and plays back scripted failures.
#[derive(Default)]
pub struct MockTransport {
    uploads: Mutex<Vec<(String, Vec<u8>)>>,
    deletes: Mutex<Vec<String>>,
    upload_status: Mutex<Option<u16>>,
    delete_status: Mutex<Option<u16>>,
    remote_files: Mutex<BTreeMap<String, Vec<u8>>>,
    missing: Mutex<HashSet<String>>,
    list_calls: Mutex<usize>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every upload fail with `status` until `recover` is called.
    pub fn fail_uploads(&self, status: u16) {
        *self.upload_status.lock().unwrap() = Some(status);
    }

    pub fn fail_deletes(&self, status: u16) {
        *self.delete_status.lock().unwrap() = Some(status);
    }

    pub fn recover(&self) {
        *self.upload_status.lock().unwrap() = None;
        *self.delete_status.lock().unwrap() = None;
    }

    pub fn add_remote_file(&self, name: &str, bytes: Vec<u8>) {
        self.remote_files.lock().unwrap().insert(name.to_string(), bytes);
    }

    /// Listed but not fetchable.
    pub fn add_missing_file(&self, name: &str) {
        self.missing.lock().unwrap().insert(name.to_string());
    }

    /// Uploaded (relative path, decompressed contents), oldest first.
    pub fn uploads(&self) -> Vec<(String, Vec<u8>)> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn uploaded_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.uploads().into_iter().map(|(p, _)| p).collect();
        paths.sort();
        paths
    }

    pub fn deletes(&self) -> Vec<String> {
        self.deletes.lock().unwrap().clone()
    }

    pub fn list_calls(&self) -> usize {
        *self.list_calls.lock().unwrap()
    }

    pub fn clear(&self) {
        self.uploads.lock().unwrap().clear();
        self.deletes.lock().unwrap().clear();
    }
}

impl Transport for MockTransport {
    fn upload(&self, payload: StagedPayload) -> Result<()> {
        if let Some(status) = *self.upload_status.lock().unwrap() {
            return Err(WatchSyncError::Status { operation: "upload", status });
        }
        assert_eq!(payload.remote_name(), format!("{}.gz", payload.relative_path));
        self.uploads
            .lock()
            .unwrap()
            .push((payload.relative_path, gunzip(&payload.bytes)));
        Ok(())
    }

    fn delete(&self, relative_path: &str) -> Result<()> {
        if let Some(status) = *self.delete_status.lock().unwrap() {
            return Err(WatchSyncError::Status { operation: "delete", status });
        }
        self.deletes.lock().unwrap().push(relative_path.to_string());
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>> {
        *self.list_calls.lock().unwrap() += 1;
        let mut names: Vec<String> = self.remote_files.lock().unwrap().keys().cloned().collect();
        names.extend(self.missing.lock().unwrap().iter().cloned());
        Ok(names)
    }

    fn fetch(&self, name: &str) -> Result<Vec<u8>> {
        self.remote_files
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or(WatchSyncError::Status { operation: "fetch", status: 404 })
    }

    fn probe(&self) -> Result<()> {
        Ok(())
    }
}

pub fn gzip(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).unwrap();
    encoder.finish().unwrap()
}

pub fn gunzip(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    GzDecoder::new(bytes).read_to_end(&mut out).unwrap();
    out
}
