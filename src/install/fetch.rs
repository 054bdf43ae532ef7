//! Checksum-verified artifact downloads.
//!
//! The payload is streamed into a private temporary file while a SHA-256
//! digest is computed over the received bytes. Only a verified file is moved
//! onto the destination, and the move is a rename, so the destination is
//! never observed half-written.

use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

const LOG_TARGET: &str = "pkl_lsp_launcher::fetch";

/// Error types for artifact downloads.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Request could not be sent, returned a non-success status, or the body
    /// stream broke off.
    #[error("Failed to download {url}: {message}")]
    Network { url: String, message: String },

    /// The received bytes do not hash to the published checksum.
    #[error("Failed to download {url}: expected checksum {expected}, but got {actual}")]
    ChecksumMismatch {
        url: String,
        expected: String,
        actual: String,
    },

    /// File system operation failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl FetchError {
    fn network(url: &str, err: impl std::fmt::Display) -> Self {
        Self::Network {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}

/// Normalise a published checksum for comparison.
///
/// Checksum files are either a bare hex digest or `<digest>  <filename>`;
/// comparison is case-insensitive.
pub fn normalize_checksum(published: &str) -> String {
    published
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase()
}

/// Lowercase hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Downloads artifacts, staging them in a temporary directory until verified.
#[derive(Debug, Clone)]
pub struct ArtifactFetcher {
    http: reqwest::Client,
    /// Where in-flight downloads are written. `None` means the system temp dir.
    staging_dir: Option<PathBuf>,
}

impl ArtifactFetcher {
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            staging_dir: None,
        }
    }

    /// Stage in-flight downloads in `dir` instead of the system temp dir.
    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(dir.into());
        self
    }

    /// Download `url` to `destination`, verifying it against `expected_checksum`.
    ///
    /// On any error the destination is left exactly as it was and the staged
    /// temporary file is removed.
    pub async fn download(
        &self,
        url: &str,
        destination: &Path,
        expected_checksum: &str,
    ) -> Result<(), FetchError> {
        let expected = normalize_checksum(expected_checksum);
        let staged = self.staging_file()?;

        log::debug!(
            target: LOG_TARGET,
            "Downloading {} via {}",
            url,
            staged.path().display()
        );

        let actual = self.stream_to(url, &staged).await?;

        if actual != expected {
            log::warn!(
                target: LOG_TARGET,
                "Checksum mismatch for {}: expected {}, got {}",
                url,
                expected,
                actual
            );
            return Err(FetchError::ChecksumMismatch {
                url: url.to_string(),
                expected,
                actual,
            });
        }

        let destination = destination.to_path_buf();
        tokio::task::spawn_blocking(move || commit(staged, &destination))
            .await
            .map_err(|e| FetchError::Io(io::Error::other(e)))??;

        log::info!(target: LOG_TARGET, "Downloaded and verified {}", url);
        Ok(())
    }

    fn staging_file(&self) -> io::Result<NamedTempFile> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("pkl-lsp-").suffix(".download");
        match &self.staging_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
    }

    /// Stream the body into `staged`, returning the hex digest of what was written.
    async fn stream_to(&self, url: &str, staged: &NamedTempFile) -> Result<String, FetchError> {
        let mut response = self
            .http
            .get(url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| FetchError::network(url, e))?;

        let mut file = tokio::fs::File::from_std(staged.as_file().try_clone()?);
        let mut hasher = Sha256::new();

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| FetchError::network(url, e))?
        {
            hasher.update(&chunk);
            file.write_all(&chunk).await?;
        }

        // Everything must be on disk before the file can be renamed into place.
        file.flush().await?;
        file.sync_all().await?;

        Ok(format!("{:x}", hasher.finalize()))
    }
}

/// Move a verified staged file onto `destination`.
fn commit(staged: NamedTempFile, destination: &Path) -> Result<(), FetchError> {
    let parent = destination
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    std::fs::create_dir_all(parent)?;

    let staged = match staged.persist(destination) {
        Ok(_) => return Ok(()),
        Err(err) => {
            log::debug!(
                target: LOG_TARGET,
                "Rename onto {} failed ({}), staging beside destination",
                destination.display(),
                err.error
            );
            err.file
        }
    };

    // Renames cannot cross filesystems; copy next to the destination first
    // so the final step is still a rename.
    let mut sibling = tempfile::Builder::new()
        .prefix(".pkl-lsp-")
        .suffix(".download")
        .tempfile_in(parent)?;
    let mut source = staged.reopen()?;
    io::copy(&mut source, sibling.as_file_mut())?;
    sibling.as_file().sync_all()?;
    sibling
        .persist(destination)
        .map_err(|e| FetchError::Io(e.error))?;
    Ok(())
}
