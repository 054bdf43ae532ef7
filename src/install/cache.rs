//! Cache management for registry metadata.
//!
//! The update check runs on every launch; this cache keeps it from hitting
//! the registry more than once per TTL window.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use super::maven::Coordinate;

/// Default cache TTL: 1 hour
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Cache for `maven-metadata.xml` documents, one file per coordinate.
#[derive(Debug, Clone)]
pub struct MetadataCache {
    /// Directory where cache files are stored.
    cache_dir: PathBuf,
    /// Time-to-live for cached content.
    ttl: Duration,
}

impl MetadataCache {
    /// Create a new cache with the given data directory and TTL.
    pub fn new(data_dir: &Path, ttl: Duration) -> Self {
        Self {
            cache_dir: data_dir.join("cache"),
            ttl,
        }
    }

    /// Create a new cache with default TTL (1 hour).
    pub fn with_default_ttl(data_dir: &Path) -> Self {
        Self::new(data_dir, DEFAULT_CACHE_TTL)
    }

    /// Path to the cached metadata for `coordinate`.
    fn cache_path(&self, coordinate: &Coordinate) -> PathBuf {
        self.cache_dir
            .join(&coordinate.group)
            .join(&coordinate.artifact)
            .join("maven-metadata.xml")
    }

    /// Read cached content if it exists and is fresh.
    ///
    /// Returns `None` if cache doesn't exist or is stale.
    pub fn read(&self, coordinate: &Coordinate) -> Option<String> {
        let cache_path = self.cache_path(coordinate);

        let metadata = fs::metadata(&cache_path).ok()?;
        let modified = metadata.modified().ok()?;
        let age = SystemTime::now().duration_since(modified).ok()?;

        if age > self.ttl {
            return None;
        }

        fs::read_to_string(&cache_path).ok()
    }

    /// Write content to cache.
    pub fn write(&self, coordinate: &Coordinate, content: &str) -> io::Result<()> {
        let cache_path = self.cache_path(coordinate);
        if let Some(parent) = cache_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(cache_path, content)
    }
}
