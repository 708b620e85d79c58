// SPDX-License-Identifier: GPL-3.0-only

//! Snapshot transport

use super::encoding::EncodedImage;
use crate::constants::upload::PATH;
use crate::errors::UploadError;
use async_trait::async_trait;
use tracing::debug;

/// Sends one encoded snapshot to the server
///
/// The response body is never consumed and the status code carries no
/// meaning for the caller: `Ok` means the request went out and a response
/// came back.
#[async_trait]
pub trait UploadTransport: Send + Sync {
    async fn send(&self, image: EncodedImage) -> Result<(), UploadError>;
}

/// POSTs snapshots to `{server}/upload`
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpTransport {
    /// Build a transport for the given server base URL
    pub fn new(server_url: &str) -> Result<Self, UploadError> {
        let url = upload_url(server_url)?;
        Ok(Self {
            client: reqwest::Client::new(),
            url,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl UploadTransport for HttpTransport {
    async fn send(&self, image: EncodedImage) -> Result<(), UploadError> {
        let size = image.data.len();
        let response = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, image.format.mime_type())
            .body(image.data)
            .send()
            .await?;

        debug!(url = %self.url, size, status = %response.status(), "Snapshot sent");
        Ok(())
    }
}

/// Join a server base URL and the upload path
pub fn upload_url(server_url: &str) -> Result<String, UploadError> {
    let base = server_url.trim().trim_end_matches('/');
    let host = base
        .strip_prefix("http://")
        .or_else(|| base.strip_prefix("https://"))
        .ok_or_else(|| {
            UploadError::InvalidUrl(format!("{} (expected http:// or https://)", server_url))
        })?;
    if host.is_empty() {
        return Err(UploadError::InvalidUrl(format!("{} (missing host)", server_url)));
    }
    Ok(format!("{}{}", base, PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_url_joins_path() {
        assert_eq!(
            upload_url("http://127.0.0.1:5000").unwrap(),
            "http://127.0.0.1:5000/upload"
        );
        assert_eq!(
            upload_url("https://example.org/cam/").unwrap(),
            "https://example.org/cam/upload"
        );
    }

    #[test]
    fn test_upload_url_rejects_other_schemes() {
        assert!(matches!(
            upload_url("ftp://example.org"),
            Err(UploadError::InvalidUrl(_))
        ));
        assert!(upload_url("example.org").is_err());
        assert!(upload_url("http://").is_err());
    }

    #[test]
    fn test_transport_keeps_url() {
        let transport = HttpTransport::new("http://localhost:8080/").unwrap();
        assert_eq!(transport.url(), "http://localhost:8080/upload");
    }
}
