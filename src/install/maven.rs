//! Maven registry client.
//!
//! Looks up the latest published version of an artifact from its
//! `maven-metadata.xml` and downloads artifact jars together with their
//! published `.sha256` checksums.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use url::Url;

use super::cache::MetadataCache;
use super::fetch::{ArtifactFetcher, FetchError};
use crate::semver::Semver;

/// Maven Central.
pub const DEFAULT_REGISTRY_URL: &str = "https://repo1.maven.org/maven2/";

const LOG_TARGET: &str = "pkl_lsp_launcher::registry";

static LATEST_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<latest>\s*([^<\s]+)\s*</latest>").expect("valid regex for <latest>")
});

static RELEASE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<release>\s*([^<\s]+)\s*</release>").expect("valid regex for <release>")
});

/// Error types for registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// HTTP request failed.
    #[error("HTTP error for {url}: {message}")]
    Http { url: String, message: String },

    /// The registry advertised something that is not a semantic version.
    #[error("Got an artifact from Maven that is not valid semver: {0}")]
    InvalidRemoteVersion(String),

    /// Registry URL could not be built.
    #[error("Invalid registry URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Artifact download failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// A `group:artifact` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Coordinate {
    pub group: String,
    pub artifact: String,
}

impl Coordinate {
    pub fn new(group: impl Into<String>, artifact: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            artifact: artifact.into(),
        }
    }

    /// The pkl-lsp server artifact.
    pub fn pkl_lsp() -> Self {
        Self::new("org.pkl-lang", "pkl-lsp")
    }

    /// Repository path of the artifact directory, e.g. `org/pkl-lang/pkl-lsp`.
    pub fn directory_path(&self) -> String {
        format!("{}/{}", self.group.replace('.', "/"), self.artifact)
    }

    /// Repository path of the artifact jar for `version`.
    pub fn jar_path(&self, version: &Semver) -> String {
        format!(
            "{}/{version}/{}-{version}.jar",
            self.directory_path(),
            self.artifact
        )
    }

    /// File name of the artifact jar for `version`.
    pub fn jar_file_name(&self, version: &Semver) -> String {
        format!("{}-{}.jar", self.artifact, version)
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.group, self.artifact)
    }
}

/// Options for metadata fetching.
#[derive(Debug, Clone, Copy)]
pub struct FetchOptions {
    /// Whether a fresh cached `maven-metadata.xml` may be used instead of a request.
    pub use_cache: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self { use_cache: true }
    }
}

/// Extract the advertised latest version from `maven-metadata.xml`.
///
/// `<latest>` is preferred; `<release>` is accepted when a repository only
/// publishes that.
pub fn extract_latest_version(xml: &str) -> Option<&str> {
    LATEST_PATTERN
        .captures(xml)
        .or_else(|| RELEASE_PATTERN.captures(xml))
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str())
}

fn parse_latest_version(xml: &str) -> Result<Semver, RegistryError> {
    let version_str = extract_latest_version(xml)
        .ok_or_else(|| RegistryError::InvalidRemoteVersion("<missing>".to_string()))?;
    Semver::parse(version_str)
        .ok_or_else(|| RegistryError::InvalidRemoteVersion(version_str.to_string()))
}

/// Client for a Maven layout repository.
#[derive(Debug, Clone)]
pub struct MavenClient {
    base_url: Url,
    http: reqwest::Client,
    fetcher: ArtifactFetcher,
    metadata_cache: Option<MetadataCache>,
}

impl MavenClient {
    /// Create a client for the repository rooted at `base_url`.
    pub fn new(base_url: &str, http: reqwest::Client) -> Result<Self, RegistryError> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            base_url,
            fetcher: ArtifactFetcher::new(http.clone()),
            http,
            metadata_cache: None,
        })
    }

    /// Cache `maven-metadata.xml` responses.
    pub fn with_metadata_cache(mut self, cache: MetadataCache) -> Self {
        self.metadata_cache = Some(cache);
        self
    }

    /// Use a custom fetcher (e.g. with its own staging directory).
    pub fn with_fetcher(mut self, fetcher: ArtifactFetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Latest published version of `coordinate` with default fetch options.
    pub async fn latest_version(&self, coordinate: &Coordinate) -> Result<Semver, RegistryError> {
        self.latest_version_with_options(coordinate, FetchOptions::default())
            .await
    }

    /// Latest published version of `coordinate`.
    ///
    /// A registry is expected to only publish valid releases, so an
    /// unparsable answer is an error rather than "no update". Only answers
    /// that yield a version are written to the metadata cache.
    pub async fn latest_version_with_options(
        &self,
        coordinate: &Coordinate,
        options: FetchOptions,
    ) -> Result<Semver, RegistryError> {
        if options.use_cache
            && let Some(cache) = &self.metadata_cache
            && let Some(cached) = cache.read(coordinate)
        {
            match parse_latest_version(&cached) {
                Ok(version) => {
                    log::debug!(target: LOG_TARGET, "Using cached metadata for {}", coordinate);
                    return Ok(version);
                }
                Err(e) => log::debug!(
                    target: LOG_TARGET,
                    "Ignoring cached metadata for {}: {}",
                    coordinate,
                    e
                ),
            }
        }

        let url = self
            .base_url
            .join(&format!("{}/maven-metadata.xml", coordinate.directory_path()))?;
        let xml = self.get_text(&url).await?;
        let version = parse_latest_version(&xml)?;

        if let Some(cache) = &self.metadata_cache
            && let Err(e) = cache.write(coordinate, &xml)
        {
            log::warn!(
                target: LOG_TARGET,
                "Failed to cache metadata for {}: {}",
                coordinate,
                e
            );
        }
        Ok(version)
    }

    /// Download the jar of `coordinate` at `version` to `destination`,
    /// verified against the registry's `.sha256` companion file.
    pub async fn download_artifact(
        &self,
        coordinate: &Coordinate,
        version: &Semver,
        destination: &Path,
    ) -> Result<(), RegistryError> {
        let jar_url = self.base_url.join(&coordinate.jar_path(version))?;
        let checksum_url = self
            .base_url
            .join(&format!("{}.sha256", coordinate.jar_path(version)))?;

        log::info!(
            target: LOG_TARGET,
            "Downloading {} {} to {}",
            coordinate,
            version,
            destination.display()
        );

        let checksum = self.get_text(&checksum_url).await?;
        self.fetcher
            .download(jar_url.as_str(), destination, &checksum)
            .await?;
        Ok(())
    }

    async fn get_text(&self, url: &Url) -> Result<String, RegistryError> {
        let http_error = |e: reqwest::Error| RegistryError::Http {
            url: url.to_string(),
            message: e.to_string(),
        };
        self.http
            .get(url.clone())
            .header(reqwest::header::ACCEPT, "*/*")
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(http_error)?
            .text()
            .await
            .map_err(http_error)
    }
}
