//! Downloaded server jars.
//!
//! Layout: `<root>/<version>/pkl-lsp-<version>.jar`. Directories whose name
//! is not a version are ignored.

use std::path::{Path, PathBuf};

use super::{DistributionSource, LOG_TARGET, ServerDistribution};
use crate::semver::Semver;

#[derive(Debug, Clone)]
pub struct DistributionCache {
    root: PathBuf,
}

impl DistributionCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the jar for `version` lives (whether or not it exists).
    pub fn jar_path(&self, version: &Semver) -> PathBuf {
        self.root
            .join(version.to_string())
            .join(format!("pkl-lsp-{}.jar", version))
    }

    /// Whether the jar for `version` exists as a regular file.
    pub fn contains(&self, version: &Semver) -> bool {
        self.jar_path(version).is_file()
    }

    /// Versions present in the cache, in directory order.
    pub fn scan(&self) -> Vec<Semver> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                log::debug!(
                    target: LOG_TARGET,
                    "Cannot read {}: {}",
                    self.root.display(),
                    e
                );
                return Vec::new();
            }
        };

        entries
            .filter_map(Result::ok)
            .filter_map(|entry| entry.file_name().to_str().and_then(Semver::parse))
            .collect()
    }

    /// Newest cached distribution compatible with `reference` whose jar exists.
    pub fn best_compatible(&self, reference: &Semver) -> Option<ServerDistribution> {
        let mut versions: Vec<Semver> = self
            .scan()
            .into_iter()
            .filter(|version| version.is_compatible_with(reference))
            .collect();
        versions.sort_by(|a, b| b.cmp(a));

        versions.into_iter().find_map(|version| {
            let path = self.jar_path(&version);
            path.is_file().then_some(ServerDistribution {
                path,
                version,
                source: DistributionSource::Downloaded,
            })
        })
    }
}
