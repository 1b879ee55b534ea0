//! Archive source resolution
//!
//! A target's rootfs archive is referenced either by a local path
//! (optionally `file://`-prefixed) or by a URL. Local references are used in
//! place; URLs are downloaded into the operation's working directory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use super::{ArchiveFetcher, FetchedArchive};
use crate::config::NetworkConfig;
use crate::error::{Result, SdkError};

/// Smallest plausible rootfs archive. Anything below this is an HTML error
/// page or a truncated transfer, not an archive.
pub const MIN_ARCHIVE_SIZE: u64 = 10_000;

/// Fetcher backed by reqwest
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a fetcher from the network configuration
    pub fn new(network: &NetworkConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(format!("{}/{}", crate::NAME, crate::VERSION))
            .timeout(Duration::from_secs(network.timeout.max(1) * 60))
            .connect_timeout(Duration::from_secs(network.timeout));

        if let Some(ref proxy) = network.proxy {
            builder = builder.proxy(
                reqwest::Proxy::all(proxy)
                    .map_err(|e| SdkError::Config(format!("Invalid proxy: {}", e)))?,
            );
        }

        Ok(Self {
            client: builder.build()?,
        })
    }
}

impl ArchiveFetcher for HttpFetcher {
    async fn fetch(&self, source: &str, work_dir: &Path) -> Result<FetchedArchive> {
        if let Some(path) = local_reference(source) {
            if !path.exists() {
                return Err(SdkError::file_not_found(path));
            }
            debug!("using local archive {}", path.display());
            return Ok(FetchedArchive {
                path,
                downloaded: false,
            });
        }

        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner:.green} {msg}")
                .unwrap()
                .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "),
        );
        pb.enable_steady_tick(Duration::from_millis(120));
        pb.set_message(format!("Downloading {}", source));

        let result = self.download(source, work_dir).await;

        match &result {
            Ok(archive) => pb.finish_with_message(format!("Downloaded {}", archive.path.display())),
            Err(_) => pb.finish_with_message("Download failed"),
        }

        result
    }
}

impl HttpFetcher {
    async fn download(&self, source: &str, work_dir: &Path) -> Result<FetchedArchive> {
        let response = self
            .client
            .get(source)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| SdkError::DownloadFailed(e.to_string()))?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SdkError::DownloadFailed(e.to_string()))?;

        check_archive_size(bytes.len() as u64, source)?;

        let path = work_dir.join(archive_file_name(source));
        std::fs::write(&path, &bytes)?;

        Ok(FetchedArchive {
            path,
            downloaded: true,
        })
    }
}

/// Interpret `source` as a local filesystem reference, if it is one
fn local_reference(source: &str) -> Option<PathBuf> {
    if let Some(rest) = source.strip_prefix("file://") {
        Some(PathBuf::from(rest))
    } else if !source.contains("://") {
        Some(PathBuf::from(source))
    } else {
        None
    }
}

/// Reject transfers too small to be a real rootfs archive
fn check_archive_size(size: u64, source: &str) -> Result<()> {
    if size < MIN_ARCHIVE_SIZE {
        Err(SdkError::DownloadFailed(format!(
            "{} is only {} bytes (expected at least {}); refusing to treat it as an archive",
            source, size, MIN_ARCHIVE_SIZE
        )))
    } else {
        Ok(())
    }
}

/// File name to store a downloaded archive under
fn archive_file_name(source: &str) -> String {
    source
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("rootfs.tar")
        .split('?')
        .next()
        .unwrap_or("rootfs.tar")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_reference_variants() {
        assert_eq!(
            local_reference("file:///tmp/rootfs.tar.bz2"),
            Some(PathBuf::from("/tmp/rootfs.tar.bz2"))
        );
        assert_eq!(
            local_reference("/tmp/rootfs.tar.bz2"),
            Some(PathBuf::from("/tmp/rootfs.tar.bz2"))
        );
        assert_eq!(local_reference("https://example.org/rootfs.tar.bz2"), None);
    }

    #[test]
    fn test_small_transfer_is_download_failure() {
        let err = check_archive_size(9_999, "https://example.org/x").unwrap_err();
        assert_eq!(err.exit_code(), 3);
        assert!(check_archive_size(MIN_ARCHIVE_SIZE, "x").is_ok());
    }

    #[test]
    fn test_archive_file_name() {
        assert_eq!(
            archive_file_name("https://example.org/images/rootfs.tar.bz2"),
            "rootfs.tar.bz2"
        );
        assert_eq!(
            archive_file_name("https://example.org/dl/rootfs.tar.xz?token=abc"),
            "rootfs.tar.xz"
        );
        assert_eq!(archive_file_name("https://example.org/"), "rootfs.tar");
    }

    #[tokio::test]
    async fn test_missing_local_archive() {
        let fetcher = HttpFetcher::new(&NetworkConfig::default()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let err = fetcher
            .fetch("/nonexistent/rootfs.tar.bz2", dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, SdkError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn test_local_archive_is_not_marked_downloaded() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("rootfs.tar.bz2");
        std::fs::write(&archive, b"stub").unwrap();

        let fetcher = HttpFetcher::new(&NetworkConfig::default()).unwrap();
        let fetched = fetcher
            .fetch(archive.to_str().unwrap(), dir.path())
            .await
            .unwrap();
        assert!(!fetched.downloaded);
        assert_eq!(fetched.path, archive);
    }
}
