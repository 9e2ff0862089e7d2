//! Kernel file download
//!
//! Horizons hands out a one-shot locator for the generated kernel. Its URL
//! scheme picks the transfer: anonymous passive FTP, HTTP(S), or a plain
//! local copy for `file://` mirrors.

mod ftp;
mod http;

use async_trait::async_trait;
use reqwest::Url;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Download errors
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("unsupported URL scheme {0}")]
    UnsupportedScheme(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("{url} responded with status {status}")]
    Status { url: String, status: u16 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("FTP error: {0}")]
    Ftp(#[from] suppaftp::FtpError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Bytes received so far and, when the server told us, the total size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadProgress {
    pub received: u64,
    pub total: Option<u64>,
}

impl DownloadProgress {
    /// Completion percentage, capped at 100
    pub fn percent(&self) -> Option<u8> {
        match self.total {
            Some(0) => Some(100),
            Some(total) => Some((self.received.saturating_mul(100) / total).min(100) as u8),
            None => None,
        }
    }
}

pub type ProgressFn = dyn Fn(DownloadProgress) + Send + Sync;

pub(crate) fn report(progress: Option<&ProgressFn>, received: u64, total: Option<u64>) {
    if let Some(callback) = progress {
        callback(DownloadProgress { received, total });
    }
}

/// Closing report of a finished transfer whose size was not announced
pub(crate) fn report_done(progress: Option<&ProgressFn>, received: u64, total: Option<u64>) {
    if total.is_none() {
        report(progress, received, Some(received));
    }
}

/// Fetches a URL into a local file.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Download `url` to `destination`, overwriting it, and return the written path.
    async fn fetch(
        &self,
        url: &str,
        destination: &Path,
        progress: Option<&ProgressFn>,
    ) -> Result<PathBuf, FetchError>;
}

/// Fetcher dispatching on the URL scheme
#[derive(Debug, Clone)]
pub struct UrlFetcher {
    client: reqwest::Client,
    ftp_user: String,
    ftp_password: String,
}

impl UrlFetcher {
    /// Anonymous FTP uses `email` as password, as is customary.
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            ftp_user: "anonymous".to_string(),
            ftp_password: email.into(),
        }
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    async fn copy_file(
        url: &Url,
        destination: &Path,
        progress: Option<&ProgressFn>,
    ) -> Result<u64, FetchError> {
        let source = url.to_file_path().map_err(|_| FetchError::InvalidUrl {
            url: url.to_string(),
            reason: "not a local file path".to_string(),
        })?;
        if !source.is_file() {
            return Err(FetchError::NotFound(url.to_string()));
        }

        let total = tokio::fs::metadata(&source).await?.len();
        report(progress, 0, Some(total));
        let len = tokio::fs::copy(&source, destination).await?;
        report(progress, len, Some(total));
        Ok(len)
    }
}

#[async_trait]
impl Fetcher for UrlFetcher {
    async fn fetch(
        &self,
        url: &str,
        destination: &Path,
        progress: Option<&ProgressFn>,
    ) -> Result<PathBuf, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let len = match parsed.scheme() {
            "ftp" => {
                ftp::download(&parsed, &self.ftp_user, &self.ftp_password, destination, progress)
                    .await?
            }
            "http" | "https" => http::download(&self.client, &parsed, destination, progress).await?,
            "file" => Self::copy_file(&parsed, destination, progress).await?,
            other => return Err(FetchError::UnsupportedScheme(other.to_string())),
        };

        log::debug!("{} -> {} ({} bytes)", url, destination.display(), len);
        Ok(destination.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_percent() {
        let p = |received, total| DownloadProgress { received, total };
        assert_eq!(p(50, Some(200)).percent(), Some(25));
        assert_eq!(p(300, Some(200)).percent(), Some(100));
        assert_eq!(p(0, Some(0)).percent(), Some(100));
        assert_eq!(p(10, None).percent(), None);
    }

    #[tokio::test]
    async fn test_file_url_copy_overwrites() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("wld24862.15");
        std::fs::write(&source, b"DAF/SPK kernel bytes").unwrap();
        let destination = dir.path().join("3054374_2000_SG344.bsp");
        std::fs::write(&destination, b"stale").unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let callback = move |p: DownloadProgress| sink.lock().push(p);

        let url = Url::from_file_path(&source).unwrap();
        let path = UrlFetcher::new("someone@example.org")
            .fetch(url.as_str(), &destination, Some(&callback))
            .await
            .unwrap();

        assert_eq!(path, destination);
        assert_eq!(std::fs::read(&destination).unwrap(), b"DAF/SPK kernel bytes");
        assert_eq!(seen.lock().last().and_then(|p| p.percent()), Some(100));
    }

    #[tokio::test]
    async fn test_rejects_unknown_scheme() {
        let dir = TempDir::new().unwrap();
        let err = UrlFetcher::new("x")
            .fetch("gopher://example.org/kernel", &dir.path().join("k.bsp"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::UnsupportedScheme(s) if s == "gopher"));
    }

    #[tokio::test]
    async fn test_missing_local_file() {
        let dir = TempDir::new().unwrap();
        let url = Url::from_file_path(dir.path().join("absent.15")).unwrap();
        let err = UrlFetcher::new("x")
            .fetch(url.as_str(), &dir.path().join("k.bsp"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::NotFound(_)));
    }
}
