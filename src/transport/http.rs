use crate::stage::StagedPayload;
use crate::transport::Transport;
use crate::{path, Result, WatchSyncError};
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, Response};
use reqwest::header::HeaderValue;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Header carrying the remote object name on uploads and deletes.
pub const FILENAME_HEADER: &str = "filename";

/// Multipart field holding the gzip payload.
pub const FILE_FIELD: &str = "file";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct ListResponse {
    files: Vec<String>,
}

/// Blob store reached over HTTP:
///
/// - `POST   {base}/uploadfile/`
/// - `DELETE {base}/deletefile/`
/// - `GET    {base}/download/` and `{base}/download/{name}`
pub struct HttpTransport {
    client: Client,
    base: Url,
}

impl HttpTransport {
    pub fn new(base: Url, timeout: Duration) -> Result<Self> {
        if base.cannot_be_a_base() {
            return Err(WatchSyncError::Config(format!("{} cannot be used as a base URL", base)));
        }

        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;

        Ok(Self { client, base })
    }

    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Url {
        let mut url = self.base.clone();
        // cannot_be_a_base was rejected in new()
        if let Ok(mut segs) = url.path_segments_mut() {
            segs.pop_if_empty().extend(segments);
        }
        url
    }
}

fn expect_ok(operation: &'static str, response: Response) -> Result<Response> {
    match response.status() {
        StatusCode::OK => Ok(response),
        status => Err(WatchSyncError::Status {
            operation,
            status: status.as_u16(),
        }),
    }
}

fn name_header(name: &str) -> Result<HeaderValue> {
    HeaderValue::from_bytes(name.as_bytes())
        .map_err(|_| WatchSyncError::InvalidRemoteName(name.to_string()))
}

impl Transport for HttpTransport {
    fn upload(&self, payload: StagedPayload) -> Result<()> {
        let name = payload.remote_name();
        let part = Part::bytes(payload.bytes)
            .file_name(name.clone())
            .mime_str("application/gzip")?;

        let response = self
            .client
            .post(self.endpoint(["uploadfile", ""]))
            .header(FILENAME_HEADER, name_header(&name)?)
            .multipart(Form::new().part(FILE_FIELD, part))
            .send()?;
        expect_ok("upload", response)?;

        debug!("Uploaded {}", name);
        Ok(())
    }

    fn delete(&self, relative_path: &str) -> Result<()> {
        let name = path::remote_object_name(relative_path);
        let response = self
            .client
            .delete(self.endpoint(["deletefile", ""]))
            .header(FILENAME_HEADER, name_header(&name)?)
            .send()?;
        expect_ok("delete", response)?;

        debug!("Deleted {}", name);
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>> {
        let response = self.client.get(self.endpoint(["download", ""])).send()?;
        let listing: ListResponse = expect_ok("list", response)?
            .json()
            .map_err(|e| WatchSyncError::Protocol(format!("Bad file listing: {}", e)))?;
        Ok(listing.files)
    }

    fn fetch(&self, name: &str) -> Result<Vec<u8>> {
        let url = self.endpoint(std::iter::once("download").chain(name.split('/')));
        let response = self.client.get(url).send()?;
        let body = expect_ok("fetch", response)?.bytes()?;
        Ok(body.to_vec())
    }

    fn probe(&self) -> Result<()> {
        // Any HTTP answer proves the store is reachable; only transport
        // failures (refused, DNS, timeout) count against it.
        let response = self.client.get(self.base.clone()).send()?;
        debug!("Probe of {} answered {}", self.base, response.status());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(base: &str) -> HttpTransport {
        HttpTransport::new(Url::parse(base).unwrap(), DEFAULT_TIMEOUT).unwrap()
    }

    #[test]
    fn test_endpoints() {
        let t = transport("http://store:7888");
        assert_eq!(t.endpoint(["uploadfile", ""]).as_str(), "http://store:7888/uploadfile/");

        let t = transport("http://store:7888/api/");
        assert_eq!(t.endpoint(["deletefile", ""]).as_str(), "http://store:7888/api/deletefile/");
    }

    #[test]
    fn test_fetch_url_escapes_segments() {
        let t = transport("http://store");
        let url = t.endpoint(std::iter::once("download").chain("sub dir/a#1.gz".split('/')));
        assert_eq!(url.as_str(), "http://store/download/sub%20dir/a%231.gz");
    }

    #[test]
    fn test_rejects_non_base_url() {
        let err = HttpTransport::new(Url::parse("mailto:someone@example.com").unwrap(), DEFAULT_TIMEOUT);
        assert!(matches!(err, Err(WatchSyncError::Config(_))));
    }
}
